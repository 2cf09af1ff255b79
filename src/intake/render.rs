//! Step renderer — builds the prompt text and keyboard for a step.
//!
//! Pure: the same `(step, language, draft)` always renders the same prompt,
//! so re-rendering after a toggle never shows stale markers.

use serde::Serialize;

use super::action::FormAction;
use super::i18n::{Language, Localized, Msg, text};
use super::model::{ChronicCondition, Complaint, Goal, HabitChoice, HabitGroup, OptionKey, ProfileDraft};
use super::state::IntakeStep;

/// Marker on a selected option.
pub const SELECTED: &str = "✅";
/// Marker on an unselected option of a multi/single-select group.
pub const UNSELECTED: &str = "▫️";

/// Options per row on multi-select steps.
const ROW_WIDTH: usize = 2;

/// A keyboard button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineButton {
    pub label: String,
    pub action: String,
}

impl InlineButton {
    fn new(label: impl Into<String>, action: FormAction) -> Self {
        Self {
            label: label.into(),
            action: action.to_string(),
        }
    }

    fn marked(selected: bool, label: &str, action: FormAction) -> Self {
        let marker = if selected { SELECTED } else { UNSELECTED };
        Self::new(format!("{marker} {label}"), action)
    }
}

/// Rows of buttons.
pub type Keyboard = Vec<Vec<InlineButton>>;

/// Text plus optional keyboard, ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl Prompt {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }

    /// Every action tag on the keyboard, row-major.
    pub fn actions(&self) -> Vec<&str> {
        self.keyboard
            .iter()
            .flatten()
            .flatten()
            .map(|b| b.action.as_str())
            .collect()
    }
}

/// Render the prompt for `step`.
pub fn render_step(step: IntakeStep, lang: Language, draft: &ProfileDraft) -> Prompt {
    match step {
        IntakeStep::Idle => Prompt::with_keyboard(
            text(lang, Msg::Welcome),
            vec![vec![InlineButton::new(text(lang, Msg::StartButton), FormAction::Start)]],
        ),
        IntakeStep::AgeSex => Prompt::text(text(lang, Msg::AskAgeSex)),
        IntakeStep::Chronic => {
            let options = ChronicCondition::ALL.iter().map(|c| {
                InlineButton::marked(
                    draft.chronic_conditions.contains(c),
                    c.label(lang),
                    FormAction::ToggleChronic(*c),
                )
            });
            Prompt::with_keyboard(
                text(lang, Msg::AskChronic),
                grid_with_done(options, lang, FormAction::ChronicDone),
            )
        }
        IntakeStep::Goal => {
            let rows = Goal::ALL
                .iter()
                .map(|g| vec![InlineButton::new(g.label(lang), FormAction::ChooseGoal(*g))])
                .collect();
            Prompt::with_keyboard(text(lang, Msg::AskGoal), rows)
        }
        IntakeStep::Habits => Prompt::with_keyboard(text(lang, Msg::AskHabits), habits_keyboard(lang, draft)),
        IntakeStep::Complaints => {
            let options = Complaint::ALL.iter().map(|c| {
                InlineButton::marked(
                    draft.complaints.contains(c),
                    c.label(lang),
                    FormAction::ToggleComplaint(*c),
                )
            });
            Prompt::with_keyboard(
                text(lang, Msg::AskComplaints),
                grid_with_done(options, lang, FormAction::ComplaintsDone),
            )
        }
        IntakeStep::Meds => Prompt::with_keyboard(
            text(lang, Msg::AskMeds),
            vec![vec![InlineButton::new(text(lang, Msg::MedsNoneButton), FormAction::MedsNone)]],
        ),
        IntakeStep::Done => Prompt::text(text(lang, Msg::Completed)),
    }
}

/// Header row plus option row per habit group, then "Done".
fn habits_keyboard(lang: Language, draft: &ProfileDraft) -> Keyboard {
    let mut rows: Keyboard = Vec::with_capacity(HabitGroup::ALL.len() * 2 + 1);
    for group in HabitGroup::ALL {
        rows.push(vec![InlineButton::new(group.label(lang), FormAction::HabitHeader(*group))]);
        let current = draft.habit(*group);
        rows.push(
            HabitChoice::options(*group)
                .into_iter()
                .map(|choice| {
                    InlineButton::marked(current == Some(choice), choice.label(lang), FormAction::SetHabit(choice))
                })
                .collect(),
        );
    }
    rows.push(vec![InlineButton::new(text(lang, Msg::DoneButton), FormAction::HabitsDone)]);
    rows
}

fn grid_with_done(
    options: impl Iterator<Item = InlineButton>,
    lang: Language,
    done: FormAction,
) -> Keyboard {
    let buttons: Vec<InlineButton> = options.collect();
    let mut rows: Keyboard = buttons.chunks(ROW_WIDTH).map(<[InlineButton]>::to_vec).collect();
    rows.push(vec![InlineButton::new(text(lang, Msg::DoneButton), done)]);
    rows
}
