//! Localization table: prompt templates and option labels for `ru` and `en`.
//!
//! Every lookup is an exhaustive match, so a missing string is a compile
//! error rather than a runtime fallback.

use serde::{Deserialize, Serialize};

use super::model::{
    Activity, Alcohol, ChronicCondition, Complaint, Goal, HabitChoice, HabitGroup, Sex,
    SleepDuration, Smoking,
};

/// Supported languages. Unknown tags fall back to [`Language::Ru`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    Ru,
    En,
}

impl Language {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Ru => "ru",
            Self::En => "en",
        }
    }

    /// Parse a language tag, tolerant of case and region suffixes (`en-US`).
    pub fn parse(tag: &str) -> Option<Self> {
        let normalized = tag.trim().to_ascii_lowercase();
        match normalized.split(['-', '_']).next().unwrap_or("") {
            "ru" => Some(Self::Ru),
            "en" => Some(Self::En),
            _ => None,
        }
    }

    /// Resolve the transport-reported tag, falling back to `default`.
    pub fn resolve(tag: Option<&str>, default: Language) -> Self {
        tag.and_then(Self::parse).unwrap_or(default)
    }
}

/// Message keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Msg {
    Welcome,
    StartButton,
    AskAgeSex,
    AgeSexInvalid,
    AgeSexConfirmed,
    AskChronic,
    AskGoal,
    AskHabits,
    AskComplaints,
    AskMeds,
    MedsNoneButton,
    DoneButton,
    Completed,
    Cancelled,
    NothingToCancel,
    FeedbackThanks,
    FeedbackUsage,
    Help,
    FallbackHint,
}

/// Template for a message key.
pub fn text(lang: Language, key: Msg) -> &'static str {
    match lang {
        Language::Ru => ru(key),
        Language::En => en(key),
    }
}

fn ru(key: Msg) -> &'static str {
    match key {
        Msg::Welcome => "Привет! Я помогу составить ваш профиль здоровья. Это займёт пару минут.",
        Msg::StartButton => "🚀 Начать",
        Msg::AskAgeSex => "Сколько вам лет и какой у вас пол? Например: «42, мужчина».",
        Msg::AgeSexInvalid => "Не удалось распознать возраст. Напишите число и пол, например: «35 ж».",
        Msg::AgeSexConfirmed => "Записал: возраст {age}, пол {sex}.",
        Msg::AskChronic => "Есть ли у вас хронические заболевания? Отметьте все подходящие.",
        Msg::AskGoal => "Какая у вас главная цель?",
        Msg::AskHabits => "Расскажите о привычках: выберите по одному варианту в каждой группе.",
        Msg::AskComplaints => "Что вас беспокоит в последнее время? Отметьте все подходящие.",
        Msg::AskMeds => "Какие лекарства или добавки вы принимаете? Напишите списком.",
        Msg::MedsNoneButton => "Ничего не принимаю",
        Msg::DoneButton => "Готово ➡️",
        Msg::Completed => "Спасибо! Профиль сохранён ✅",
        Msg::Cancelled => "Анкета отменена. Начать заново: /intake",
        Msg::NothingToCancel => "Сейчас нет незаполненной анкеты.",
        Msg::FeedbackThanks => "Спасибо за отзыв!",
        Msg::FeedbackUsage => "Напишите отзыв после команды, например: /feedback всё понравилось",
        Msg::Help => "/intake — заполнить анкету\n/cancel — отменить анкету\n/feedback <текст> — оставить отзыв",
        Msg::FallbackHint => "Чтобы заполнить анкету, отправьте /intake.",
    }
}

fn en(key: Msg) -> &'static str {
    match key {
        Msg::Welcome => "Hi! I'll help you build your health profile. It takes a couple of minutes.",
        Msg::StartButton => "🚀 Start",
        Msg::AskAgeSex => "How old are you and what is your sex? For example: \"42, male\".",
        Msg::AgeSexInvalid => "I couldn't find your age. Please send a number and your sex, e.g. \"35 f\".",
        Msg::AgeSexConfirmed => "Got it: age {age}, sex {sex}.",
        Msg::AskChronic => "Do you have any chronic conditions? Select all that apply.",
        Msg::AskGoal => "What is your main goal?",
        Msg::AskHabits => "Tell me about your habits: pick one option in each group.",
        Msg::AskComplaints => "What has been bothering you lately? Select all that apply.",
        Msg::AskMeds => "Which medications or supplements do you take? Send them as a list.",
        Msg::MedsNoneButton => "I take nothing",
        Msg::DoneButton => "Done ➡️",
        Msg::Completed => "Thank you! Your profile is saved ✅",
        Msg::Cancelled => "Intake cancelled. Start again with /intake",
        Msg::NothingToCancel => "There is no intake in progress.",
        Msg::FeedbackThanks => "Thanks for the feedback!",
        Msg::FeedbackUsage => "Write your feedback after the command, e.g. /feedback works great",
        Msg::Help => "/intake — fill in the form\n/cancel — cancel the form\n/feedback <text> — leave feedback",
        Msg::FallbackHint => "To fill in the intake form, send /intake.",
    }
}

/// Fill `{name}` placeholders in a template.
pub fn fill(template: &str, args: &[(&str, &str)]) -> String {
    args.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{name}}}"), value)
    })
}

/// Display label of an option in a given language.
pub trait Localized {
    fn label(&self, lang: Language) -> &'static str;
}

impl Localized for Sex {
    fn label(&self, lang: Language) -> &'static str {
        match (self, lang) {
            (Self::Male, Language::Ru) => "мужской",
            (Self::Male, Language::En) => "male",
            (Self::Female, Language::Ru) => "женский",
            (Self::Female, Language::En) => "female",
            (Self::Unspecified, Language::Ru) => "не указан",
            (Self::Unspecified, Language::En) => "not specified",
        }
    }
}

impl Localized for ChronicCondition {
    fn label(&self, lang: Language) -> &'static str {
        match (self, lang) {
            (Self::Cvd, Language::Ru) => "Сердце и сосуды",
            (Self::Cvd, Language::En) => "Heart & vessels",
            (Self::Diabetes, Language::Ru) => "Диабет",
            (Self::Diabetes, Language::En) => "Diabetes",
            (Self::Thyroid, Language::Ru) => "Щитовидная железа",
            (Self::Thyroid, Language::En) => "Thyroid",
            (Self::Gi, Language::Ru) => "ЖКТ",
            (Self::Gi, Language::En) => "Digestive tract",
            (Self::Respiratory, Language::Ru) => "Органы дыхания",
            (Self::Respiratory, Language::En) => "Respiratory",
            (Self::Joints, Language::Ru) => "Суставы",
            (Self::Joints, Language::En) => "Joints",
            (Self::None, Language::Ru) => "Нет",
            (Self::None, Language::En) => "None",
        }
    }
}

impl Localized for Goal {
    fn label(&self, lang: Language) -> &'static str {
        match (self, lang) {
            (Self::Weight, Language::Ru) => "⚖️ Снизить вес",
            (Self::Weight, Language::En) => "⚖️ Lose weight",
            (Self::Energy, Language::Ru) => "⚡ Больше энергии",
            (Self::Energy, Language::En) => "⚡ More energy",
            (Self::Longevity, Language::Ru) => "🌱 Долголетие",
            (Self::Longevity, Language::En) => "🌱 Longevity",
            (Self::Stress, Language::Ru) => "🧘 Меньше стресса",
            (Self::Stress, Language::En) => "🧘 Less stress",
            (Self::Prevention, Language::Ru) => "🛡 Профилактика",
            (Self::Prevention, Language::En) => "🛡 Prevention",
        }
    }
}

impl Localized for HabitGroup {
    fn label(&self, lang: Language) -> &'static str {
        match (self, lang) {
            (Self::Smoke, Language::Ru) => "🚬 Курение",
            (Self::Smoke, Language::En) => "🚬 Smoking",
            (Self::Alcohol, Language::Ru) => "🍷 Алкоголь",
            (Self::Alcohol, Language::En) => "🍷 Alcohol",
            (Self::Activity, Language::Ru) => "🏃 Активность",
            (Self::Activity, Language::En) => "🏃 Activity",
            (Self::Sleep, Language::Ru) => "😴 Сон",
            (Self::Sleep, Language::En) => "😴 Sleep",
        }
    }
}

impl Localized for HabitChoice {
    fn label(&self, lang: Language) -> &'static str {
        match (self, lang) {
            (Self::Smoke(Smoking::None), Language::Ru) => "Не курю",
            (Self::Smoke(Smoking::None), Language::En) => "Never",
            (Self::Smoke(Smoking::Occasional), Language::Ru) => "Иногда",
            (Self::Smoke(Smoking::Occasional), Language::En) => "Sometimes",
            (Self::Smoke(Smoking::Daily), Language::Ru) => "Ежедневно",
            (Self::Smoke(Smoking::Daily), Language::En) => "Daily",
            (Self::Alcohol(Alcohol::None), Language::Ru) => "Не пью",
            (Self::Alcohol(Alcohol::None), Language::En) => "Never",
            (Self::Alcohol(Alcohol::Monthly), Language::Ru) => "Раз в месяц",
            (Self::Alcohol(Alcohol::Monthly), Language::En) => "Monthly",
            (Self::Alcohol(Alcohol::Weekly), Language::Ru) => "Раз в неделю",
            (Self::Alcohol(Alcohol::Weekly), Language::En) => "Weekly",
            (Self::Alcohol(Alcohol::Daily), Language::Ru) => "Ежедневно",
            (Self::Alcohol(Alcohol::Daily), Language::En) => "Daily",
            (Self::Activity(Activity::Low), Language::Ru) => "Низкая",
            (Self::Activity(Activity::Low), Language::En) => "Low",
            (Self::Activity(Activity::Moderate), Language::Ru) => "Средняя",
            (Self::Activity(Activity::Moderate), Language::En) => "Moderate",
            (Self::Activity(Activity::High), Language::Ru) => "Высокая",
            (Self::Activity(Activity::High), Language::En) => "High",
            (Self::Sleep(SleepDuration::Short), Language::Ru) => "< 6 ч",
            (Self::Sleep(SleepDuration::Short), Language::En) => "< 6 h",
            (Self::Sleep(SleepDuration::Normal), Language::Ru) => "6–8 ч",
            (Self::Sleep(SleepDuration::Normal), Language::En) => "6–8 h",
            (Self::Sleep(SleepDuration::Long), Language::Ru) => "> 8 ч",
            (Self::Sleep(SleepDuration::Long), Language::En) => "> 8 h",
        }
    }
}

impl Localized for Complaint {
    fn label(&self, lang: Language) -> &'static str {
        match (self, lang) {
            (Self::Fatigue, Language::Ru) => "Усталость",
            (Self::Fatigue, Language::En) => "Fatigue",
            (Self::Insomnia, Language::Ru) => "Плохой сон",
            (Self::Insomnia, Language::En) => "Poor sleep",
            (Self::Digestion, Language::Ru) => "Пищеварение",
            (Self::Digestion, Language::En) => "Digestion",
            (Self::JointPain, Language::Ru) => "Боль в суставах",
            (Self::JointPain, Language::En) => "Joint pain",
            (Self::Anxiety, Language::Ru) => "Тревожность",
            (Self::Anxiety, Language::En) => "Anxiety",
            (Self::Headache, Language::Ru) => "Головные боли",
            (Self::Headache, Language::En) => "Headaches",
            (Self::Skin, Language::Ru) => "Кожа",
            (Self::Skin, Language::En) => "Skin",
        }
    }
}
