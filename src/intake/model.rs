//! Profile draft and option data models.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channels::UserId;

use super::i18n::Language;

/// A fixed set of options selectable from a keyboard.
///
/// `key()` is the stable tag used in button actions and sink records.
pub trait OptionKey: Sized + Copy + 'static {
    /// All options, in display order.
    const ALL: &'static [Self];

    fn key(&self) -> &'static str;

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|o| o.key() == key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
    #[default]
    Unspecified,
}

impl OptionKey for Sex {
    const ALL: &'static [Self] = &[Self::Male, Self::Female, Self::Unspecified];

    fn key(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Unspecified => "unspecified",
        }
    }
}

/// Chronic condition tags. `None` excludes every other tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChronicCondition {
    Cvd,
    Diabetes,
    Thyroid,
    Gi,
    Respiratory,
    Joints,
    None,
}

impl OptionKey for ChronicCondition {
    const ALL: &'static [Self] = &[
        Self::Cvd,
        Self::Diabetes,
        Self::Thyroid,
        Self::Gi,
        Self::Respiratory,
        Self::Joints,
        Self::None,
    ];

    fn key(&self) -> &'static str {
        match self {
            Self::Cvd => "cvd",
            Self::Diabetes => "diabetes",
            Self::Thyroid => "thyroid",
            Self::Gi => "gi",
            Self::Respiratory => "respiratory",
            Self::Joints => "joints",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Weight,
    Energy,
    Longevity,
    Stress,
    Prevention,
}

impl OptionKey for Goal {
    const ALL: &'static [Self] = &[
        Self::Weight,
        Self::Energy,
        Self::Longevity,
        Self::Stress,
        Self::Prevention,
    ];

    fn key(&self) -> &'static str {
        match self {
            Self::Weight => "weight",
            Self::Energy => "energy",
            Self::Longevity => "longevity",
            Self::Stress => "stress",
            Self::Prevention => "prevention",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Smoking {
    None,
    Occasional,
    Daily,
}

impl OptionKey for Smoking {
    const ALL: &'static [Self] = &[Self::None, Self::Occasional, Self::Daily];

    fn key(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Occasional => "occasional",
            Self::Daily => "daily",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alcohol {
    None,
    Monthly,
    Weekly,
    Daily,
}

impl OptionKey for Alcohol {
    const ALL: &'static [Self] = &[Self::None, Self::Monthly, Self::Weekly, Self::Daily];

    fn key(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Monthly => "monthly",
            Self::Weekly => "weekly",
            Self::Daily => "daily",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Low,
    Moderate,
    High,
}

impl OptionKey for Activity {
    const ALL: &'static [Self] = &[Self::Low, Self::Moderate, Self::High];

    fn key(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
        }
    }
}

/// Typical night sleep: under 6h, 6–8h, over 8h.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepDuration {
    Short,
    Normal,
    Long,
}

impl OptionKey for SleepDuration {
    const ALL: &'static [Self] = &[Self::Short, Self::Normal, Self::Long];

    fn key(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Normal => "normal",
            Self::Long => "long",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complaint {
    Fatigue,
    Insomnia,
    Digestion,
    JointPain,
    Anxiety,
    Headache,
    Skin,
}

impl OptionKey for Complaint {
    const ALL: &'static [Self] = &[
        Self::Fatigue,
        Self::Insomnia,
        Self::Digestion,
        Self::JointPain,
        Self::Anxiety,
        Self::Headache,
        Self::Skin,
    ];

    fn key(&self) -> &'static str {
        match self {
            Self::Fatigue => "fatigue",
            Self::Insomnia => "insomnia",
            Self::Digestion => "digestion",
            Self::JointPain => "joint_pain",
            Self::Anxiety => "anxiety",
            Self::Headache => "headache",
            Self::Skin => "skin",
        }
    }
}

/// The four independent single-select habit groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitGroup {
    Smoke,
    Alcohol,
    Activity,
    Sleep,
}

impl OptionKey for HabitGroup {
    const ALL: &'static [Self] = &[Self::Smoke, Self::Alcohol, Self::Activity, Self::Sleep];

    fn key(&self) -> &'static str {
        match self {
            Self::Smoke => "smoke",
            Self::Alcohol => "alcohol",
            Self::Activity => "activity",
            Self::Sleep => "sleep",
        }
    }
}

/// A selection within one habit group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HabitChoice {
    Smoke(Smoking),
    Alcohol(Alcohol),
    Activity(Activity),
    Sleep(SleepDuration),
}

impl HabitChoice {
    pub fn group(&self) -> HabitGroup {
        match self {
            Self::Smoke(_) => HabitGroup::Smoke,
            Self::Alcohol(_) => HabitGroup::Alcohol,
            Self::Activity(_) => HabitGroup::Activity,
            Self::Sleep(_) => HabitGroup::Sleep,
        }
    }

    pub fn option_key(&self) -> &'static str {
        match self {
            Self::Smoke(v) => v.key(),
            Self::Alcohol(v) => v.key(),
            Self::Activity(v) => v.key(),
            Self::Sleep(v) => v.key(),
        }
    }

    /// Decode `(group, option)` keys into a choice.
    pub fn from_keys(group: &str, option: &str) -> Option<Self> {
        match HabitGroup::from_key(group)? {
            HabitGroup::Smoke => Smoking::from_key(option).map(Self::Smoke),
            HabitGroup::Alcohol => Alcohol::from_key(option).map(Self::Alcohol),
            HabitGroup::Activity => Activity::from_key(option).map(Self::Activity),
            HabitGroup::Sleep => SleepDuration::from_key(option).map(Self::Sleep),
        }
    }

    /// Every choice of a group, in display order.
    pub fn options(group: HabitGroup) -> Vec<HabitChoice> {
        match group {
            HabitGroup::Smoke => Smoking::ALL.iter().copied().map(Self::Smoke).collect(),
            HabitGroup::Alcohol => Alcohol::ALL.iter().copied().map(Self::Alcohol).collect(),
            HabitGroup::Activity => Activity::ALL.iter().copied().map(Self::Activity).collect(),
            HabitGroup::Sleep => SleepDuration::ALL.iter().copied().map(Self::Sleep).collect(),
        }
    }
}

/// The medications answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Medications {
    /// The user pressed "I take nothing".
    NoneReported,
    /// Raw trimmed text, stored verbatim.
    Reported(String),
}

/// Answers accumulated during one intake session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDraft {
    pub age: Option<u16>,
    pub sex: Sex,
    pub chronic_conditions: BTreeSet<ChronicCondition>,
    pub goal: Option<Goal>,
    pub habit_smoke: Option<Smoking>,
    pub habit_alcohol: Option<Alcohol>,
    pub habit_activity: Option<Activity>,
    pub habit_sleep: Option<SleepDuration>,
    pub complaints: BTreeSet<Complaint>,
    pub medications: Option<Medications>,
}

impl ProfileDraft {
    /// Flip a chronic condition. `None` and the other tags exclude each other:
    /// selecting `None` clears the rest, selecting anything else clears `None`.
    pub fn toggle_chronic(&mut self, condition: ChronicCondition) {
        if self.chronic_conditions.remove(&condition) {
            return;
        }
        if condition == ChronicCondition::None {
            self.chronic_conditions.clear();
        } else {
            self.chronic_conditions.remove(&ChronicCondition::None);
        }
        self.chronic_conditions.insert(condition);
    }

    /// Flip a complaint. No exclusivity.
    pub fn toggle_complaint(&mut self, complaint: Complaint) {
        if !self.complaints.remove(&complaint) {
            self.complaints.insert(complaint);
        }
    }

    /// Set one habit group, leaving the others untouched.
    pub fn set_habit(&mut self, choice: HabitChoice) {
        match choice {
            HabitChoice::Smoke(v) => self.habit_smoke = Some(v),
            HabitChoice::Alcohol(v) => self.habit_alcohol = Some(v),
            HabitChoice::Activity(v) => self.habit_activity = Some(v),
            HabitChoice::Sleep(v) => self.habit_sleep = Some(v),
        }
    }

    /// Current selection of a habit group.
    pub fn habit(&self, group: HabitGroup) -> Option<HabitChoice> {
        match group {
            HabitGroup::Smoke => self.habit_smoke.map(HabitChoice::Smoke),
            HabitGroup::Alcohol => self.habit_alcohol.map(HabitChoice::Alcohol),
            HabitGroup::Activity => self.habit_activity.map(HabitChoice::Activity),
            HabitGroup::Sleep => self.habit_sleep.map(HabitChoice::Sleep),
        }
    }

    /// The medications step is last, so an answer there means the form is done.
    pub fn is_complete(&self) -> bool {
        self.medications.is_some()
    }
}

/// Immutable snapshot of a finished intake, handed to sinks and the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishedProfile {
    pub user_id: UserId,
    pub language: Language,
    pub completed_at: DateTime<Utc>,
    pub draft: ProfileDraft,
}

impl FinishedProfile {
    pub fn new(user_id: UserId, language: Language, draft: ProfileDraft) -> Self {
        Self {
            user_id,
            language,
            completed_at: Utc::now(),
            draft,
        }
    }

    /// Flatten into the key-value record consumed by sinks (one spreadsheet row).
    pub fn to_record(&self) -> serde_json::Map<String, serde_json::Value> {
        use serde_json::Value;

        fn single<T: OptionKey>(value: Option<T>) -> Value {
            value.map_or(Value::Null, |v| Value::String(v.key().to_string()))
        }

        fn joined<'a, T: OptionKey + 'a>(values: impl IntoIterator<Item = &'a T>) -> Value {
            Value::String(
                values
                    .into_iter()
                    .map(|v| v.key())
                    .collect::<Vec<_>>()
                    .join(","),
            )
        }

        let d = &self.draft;
        let mut record = serde_json::Map::new();
        record.insert("user_id".into(), self.user_id.into());
        record.insert("language".into(), self.language.tag().into());
        record.insert("completed_at".into(), self.completed_at.to_rfc3339().into());
        record.insert("age".into(), d.age.map_or(Value::Null, Value::from));
        record.insert("sex".into(), d.sex.key().into());
        record.insert("chronic".into(), joined(&d.chronic_conditions));
        record.insert("goal".into(), single(d.goal));
        record.insert("habit_smoke".into(), single(d.habit_smoke));
        record.insert("habit_alcohol".into(), single(d.habit_alcohol));
        record.insert("habit_activity".into(), single(d.habit_activity));
        record.insert("habit_sleep".into(), single(d.habit_sleep));
        record.insert("complaints".into(), joined(&d.complaints));
        record.insert(
            "medications".into(),
            match &d.medications {
                Some(Medications::Reported(text)) => Value::String(text.clone()),
                Some(Medications::NoneReported) | None => Value::Null,
            },
        );
        record
    }
}
