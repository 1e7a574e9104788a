use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// Date-like tokens in free text: ISO, day-first numeric and written months.
static DATE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:\d{4}[-/.]\d{1,2}[-/.]\d{1,2}|\d{1,2}[-/.]\d{1,2}[-/.]\d{2,4}|\d{1,2}(?:st|nd|rd|th)?\s+[a-z]{3,9},?\s+\d{4}|[a-z]{3,9}\s+\d{1,2}(?:st|nd|rd|th)?,?\s+\d{4})\b",
    )
    .unwrap()
});
static ORDINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d)(?:st|nd|rd|th)\b").unwrap());
static TWO_DIGIT_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}[-/.]\d{1,2}[-/.]\d{2}$").unwrap());

const FOUR_DIGIT_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d %B %Y",
    "%d %b %Y", "%B %d %Y", "%b %d %Y",
];
const TWO_DIGIT_FORMATS: &[&str] = &["%d/%m/%y", "%d-%m-%y", "%d.%m.%y"];

/// Turns a free-text date phrase into a calendar date.
pub trait DateNormalizer: Send + Sync {
    fn normalize(&self, phrase: &str) -> Option<NaiveDate>;
}

/// Day-first pattern parser for the formats claim forms use.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternDateNormalizer;

impl DateNormalizer for PatternDateNormalizer {
    fn normalize(&self, phrase: &str) -> Option<NaiveDate> {
        let cleaned = ORDINAL.replace_all(phrase.trim(), "$1");
        let cleaned = cleaned.replace(',', " ");
        let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        let cleaned = cleaned.trim_end_matches('.');

        let formats = if TWO_DIGIT_YEAR.is_match(cleaned) {
            TWO_DIGIT_FORMATS
        } else {
            FOUR_DIGIT_FORMATS
        };

        formats
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(cleaned, fmt).ok())
            .filter(|d| (1900..=2100).contains(&d.year()))
    }
}

/// Byte ranges of date-like tokens in `line`, in order.
pub fn date_tokens(line: &str) -> Vec<Range<usize>> {
    DATE_TOKEN.find_iter(line).map(|m| m.range()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_numeric_formats_are_day_first() {
        let dates = PatternDateNormalizer;

        assert_eq!(dates.normalize("2023-06-10"), ymd(2023, 6, 10));
        assert_eq!(dates.normalize("2023/06/10"), ymd(2023, 6, 10));
        assert_eq!(dates.normalize("10/06/2023"), ymd(2023, 6, 10));
        assert_eq!(dates.normalize("10-06-2023"), ymd(2023, 6, 10));
        assert_eq!(dates.normalize("10.06.2023"), ymd(2023, 6, 10));
        assert_eq!(dates.normalize("10/06/23"), ymd(2023, 6, 10));
    }

    #[test]
    fn test_written_months() {
        let dates = PatternDateNormalizer;

        assert_eq!(dates.normalize("10 June 2023"), ymd(2023, 6, 10));
        assert_eq!(dates.normalize("10th Jun 2023"), ymd(2023, 6, 10));
        assert_eq!(dates.normalize("June 10, 2023"), ymd(2023, 6, 10));
        assert_eq!(dates.normalize("1st March, 2024"), ymd(2024, 3, 1));
    }

    #[test]
    fn test_unparseable() {
        let dates = PatternDateNormalizer;

        assert_eq!(dates.normalize(""), None);
        assert_eq!(dates.normalize("yesterday"), None);
        assert_eq!(dates.normalize("31/02/2023"), None);
        assert_eq!(dates.normalize("10/06/0023"), None);
    }

    #[test]
    fn test_date_tokens_locate_dates() {
        let line = "Admitted 10/06/2023, discharged on June 12, 2023";
        let tokens: Vec<&str> = date_tokens(line).into_iter().map(|r| &line[r]).collect();

        assert_eq!(tokens, vec!["10/06/2023", "June 12, 2023"]);
    }
}
