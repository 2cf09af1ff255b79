//! Free-text parsing of the age/sex answer.

use std::sync::LazyLock;

use regex::Regex;

use super::model::Sex;

static AGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]{1,3}").unwrap());
static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").unwrap());

const MALE_TOKENS: &[&str] = &["м", "муж", "мужчина", "мужской", "парень", "m", "male", "man"];
const FEMALE_TOKENS: &[&str] = &[
    "ж", "жен", "женщина", "женский", "девушка", "f", "female", "woman",
];

/// Parsed age/sex answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeSex {
    pub age: u16,
    pub sex: Sex,
}

/// Parse an answer like `"42, мужчина"` or `"30 f"`.
///
/// The first run of 1–3 digits is the age; without one the answer is
/// rejected. Sex is the first word matching a known token, `Unspecified`
/// when none does.
pub fn parse_age_sex(input: &str) -> Option<AgeSex> {
    let age = AGE_RE.find(input)?.as_str().parse().ok()?;
    let lowered = input.to_lowercase();
    let sex = WORD_RE
        .find_iter(&lowered)
        .find_map(|word| sex_token(word.as_str()))
        .unwrap_or(Sex::Unspecified);
    Some(AgeSex { age, sex })
}

fn sex_token(word: &str) -> Option<Sex> {
    if MALE_TOKENS.contains(&word) {
        Some(Sex::Male)
    } else if FEMALE_TOKENS.contains(&word) {
        Some(Sex::Female)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(input: &str) -> Option<(u16, Sex)> {
        parse_age_sex(input).map(|a| (a.age, a.sex))
    }

    #[test]
    fn russian_word() {
        assert_eq!(parsed("42, мужчина"), Some((42, Sex::Male)));
        assert_eq!(parsed("Женщина 29"), Some((29, Sex::Female)));
    }

    #[test]
    fn single_letter_tokens() {
        assert_eq!(parsed("42 M"), Some((42, Sex::Male)));
        assert_eq!(parsed("30 f"), Some((30, Sex::Female)));
        assert_eq!(parsed("35 ж"), Some((35, Sex::Female)));
    }

    #[test]
    fn age_without_sex_is_unspecified() {
        assert_eq!(parsed("57"), Some((57, Sex::Unspecified)));
        assert_eq!(parsed("57 years old"), Some((57, Sex::Unspecified)));
    }

    #[test]
    fn no_digits_is_rejected() {
        assert_eq!(parsed("женщина"), None);
        assert_eq!(parsed("abc"), None);
        assert_eq!(parsed(""), None);
    }

    #[test]
    fn first_digit_run_wins() {
        assert_eq!(parsed("1234"), Some((123, Sex::Unspecified)));
        assert_eq!(parsed("age 40, born 1984, man"), Some((40, Sex::Male)));
    }

    #[test]
    fn tokens_match_whole_words_only() {
        // "mango" contains "m" but is not a sex token.
        assert_eq!(parsed("25 mango"), Some((25, Sex::Unspecified)));
        assert_eq!(parsed("25 female"), Some((25, Sex::Female)));
    }
}
