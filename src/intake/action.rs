//! Button action tags.
//!
//! Grammar: `form:<step>:<sub_action>[:<option>]`. Tags are decoded once at
//! the transport boundary; anything that doesn't decode is dropped.

use super::model::{ChronicCondition, Complaint, Goal, HabitChoice, HabitGroup, OptionKey};
use super::state::IntakeStep;

/// Namespace prefix of every intake button.
pub const NAMESPACE: &str = "form";

/// Placeholder option for actions that carry none.
const NO_OPTION: &str = "_";

/// A decoded button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    Start,
    ToggleChronic(ChronicCondition),
    ChronicDone,
    ChooseGoal(Goal),
    SetHabit(HabitChoice),
    /// Decorative group header; accepted and ignored.
    HabitHeader(HabitGroup),
    HabitsDone,
    ToggleComplaint(Complaint),
    ComplaintsDone,
    MedsNone,
}

impl FormAction {
    /// Decode an action tag. Returns `None` for anything outside the grammar.
    pub fn parse(tag: &str) -> Option<Self> {
        let mut parts = tag.split(':');
        if parts.next()? != NAMESPACE {
            return None;
        }
        let step = parts.next()?;
        let sub = parts.next()?;
        let option = parts.next();
        if parts.next().is_some() {
            return None;
        }

        let action = match (step, sub, option) {
            ("start", "go", _) => Self::Start,
            ("chronic", "toggle", Some(key)) => Self::ToggleChronic(ChronicCondition::from_key(key)?),
            ("chronic", "done", _) => Self::ChronicDone,
            ("goal", key, None) => Self::ChooseGoal(Goal::from_key(key)?),
            ("habits", "header", Some(group)) => Self::HabitHeader(HabitGroup::from_key(group)?),
            ("habits", "done", _) => Self::HabitsDone,
            ("habits", group, Some(key)) => Self::SetHabit(HabitChoice::from_keys(group, key)?),
            ("complaints", "toggle", Some(key)) => Self::ToggleComplaint(Complaint::from_key(key)?),
            ("complaints", "done", _) => Self::ComplaintsDone,
            ("meds", "none", _) => Self::MedsNone,
            _ => return None,
        };
        Some(action)
    }

    /// The step this action belongs to. `Start` belongs to `Idle`.
    pub fn step(&self) -> IntakeStep {
        match self {
            Self::Start => IntakeStep::Idle,
            Self::ToggleChronic(_) | Self::ChronicDone => IntakeStep::Chronic,
            Self::ChooseGoal(_) => IntakeStep::Goal,
            Self::SetHabit(_) | Self::HabitHeader(_) | Self::HabitsDone => IntakeStep::Habits,
            Self::ToggleComplaint(_) | Self::ComplaintsDone => IntakeStep::Complaints,
            Self::MedsNone => IntakeStep::Meds,
        }
    }
}

impl std::fmt::Display for FormAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let step = self.step().tag();
        match self {
            Self::Start => write!(f, "{NAMESPACE}:{step}:go"),
            Self::ToggleChronic(c) => write!(f, "{NAMESPACE}:{step}:toggle:{}", c.key()),
            Self::ChooseGoal(g) => write!(f, "{NAMESPACE}:{step}:{}", g.key()),
            Self::SetHabit(h) => write!(f, "{NAMESPACE}:{step}:{}:{}", h.group().key(), h.option_key()),
            Self::HabitHeader(g) => write!(f, "{NAMESPACE}:{step}:header:{}", g.key()),
            Self::ToggleComplaint(c) => write!(f, "{NAMESPACE}:{step}:toggle:{}", c.key()),
            Self::ChronicDone | Self::HabitsDone | Self::ComplaintsDone => {
                write!(f, "{NAMESPACE}:{step}:done:{NO_OPTION}")
            }
            Self::MedsNone => write!(f, "{NAMESPACE}:{step}:none:{NO_OPTION}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::model::{Alcohol, Smoking};

    #[test]
    fn parses_documented_examples() {
        assert_eq!(
            FormAction::parse("form:chronic:toggle:cvd"),
            Some(FormAction::ToggleChronic(ChronicCondition::Cvd))
        );
        assert_eq!(FormAction::parse("form:goal:weight"), Some(FormAction::ChooseGoal(Goal::Weight)));
        assert_eq!(FormAction::parse("form:habits:done:_"), Some(FormAction::HabitsDone));
    }

    #[test]
    fn parses_habit_selections_and_headers() {
        assert_eq!(
            FormAction::parse("form:habits:alcohol:weekly"),
            Some(FormAction::SetHabit(HabitChoice::Alcohol(Alcohol::Weekly)))
        );
        assert_eq!(
            FormAction::parse("form:habits:header:smoke"),
            Some(FormAction::HabitHeader(HabitGroup::Smoke))
        );
    }

    #[test]
    fn rejects_unknown_tags() {
        for tag in [
            "",
            "form",
            "other:goal:weight",
            "form:goal:fame",
            "form:goal:weight:extra",
            "form:chronic:toggle",
            "form:chronic:toggle:cancer",
            "form:habits:coffee:daily",
            "form:unknown:done:_",
            "form:chronic:toggle:cvd:x",
        ] {
            assert_eq!(FormAction::parse(tag), None, "{tag:?} should not decode");
        }
    }

    #[test]
    fn display_decodes_back() {
        let actions = [
            FormAction::Start,
            FormAction::ToggleChronic(ChronicCondition::None),
            FormAction::ChronicDone,
            FormAction::ChooseGoal(Goal::Longevity),
            FormAction::SetHabit(HabitChoice::Smoke(Smoking::Daily)),
            FormAction::HabitHeader(HabitGroup::Sleep),
            FormAction::HabitsDone,
            FormAction::ToggleComplaint(Complaint::JointPain),
            FormAction::ComplaintsDone,
            FormAction::MedsNone,
        ];
        for action in actions {
            let tag = action.to_string();
            assert!(tag.len() <= 64, "{tag} exceeds Telegram callback_data limit");
            assert_eq!(FormAction::parse(&tag), Some(action), "{tag}");
        }
    }
}
