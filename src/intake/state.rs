//! Intake state machine — tracks which step of the form the user is on.

use serde::{Deserialize, Serialize};

/// The steps of the intake form.
///
/// Progresses linearly: Idle → AgeSex → Chronic → Goal → Habits →
/// Complaints → Meds → Done. `Idle` and `Done` are never stored in a
/// session; they correspond to the absence of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntakeStep {
    #[default]
    Idle,
    AgeSex,
    Chronic,
    Goal,
    Habits,
    Complaints,
    Meds,
    Done,
}

impl IntakeStep {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: IntakeStep) -> bool {
        use IntakeStep::*;
        matches!(
            (self, target),
            (Idle, AgeSex)
                | (AgeSex, Chronic)
                | (Chronic, Goal)
                | (Goal, Habits)
                | (Habits, Complaints)
                | (Complaints, Meds)
                | (Meds, Done)
        )
    }

    /// Whether this step is terminal (the profile is finalized).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Get the next step in the linear progression, if any.
    pub fn next(&self) -> Option<IntakeStep> {
        use IntakeStep::*;
        match self {
            Idle => Some(AgeSex),
            AgeSex => Some(Chronic),
            Chronic => Some(Goal),
            Goal => Some(Habits),
            Habits => Some(Complaints),
            Complaints => Some(Meds),
            Meds => Some(Done),
            Done => None,
        }
    }

    /// The free-text field this step waits for, if it is a text step.
    pub fn expected_input(&self) -> Option<ExpectedInput> {
        match self {
            Self::AgeSex => Some(ExpectedInput::AgeSex),
            Self::Meds => Some(ExpectedInput::Meds),
            _ => None,
        }
    }

    /// Tag used for this step in button actions (`form:<tag>:...`).
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Idle => "start",
            Self::AgeSex => "age_sex",
            Self::Chronic => "chronic",
            Self::Goal => "goal",
            Self::Habits => "habits",
            Self::Complaints => "complaints",
            Self::Meds => "meds",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for IntakeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::AgeSex => "age_sex",
            Self::Chronic => "chronic",
            Self::Goal => "goal",
            Self::Habits => "habits",
            Self::Complaints => "complaints",
            Self::Meds => "meds",
            Self::Done => "done",
        };
        write!(f, "{s}")
    }
}

/// Which free-text answer the controller is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedInput {
    AgeSex,
    Meds,
}
