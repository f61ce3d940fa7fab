//! Named checks that policies compose.
//!
//! Pure checks live here. Rules that consult the store ([`TextRule::Unique`]
//! and the uniqueness [`RecordRule`]s) and the title-case normalizer are
//! interpreted by the engine, which owns the store handle.

use std::fmt;

use bigdecimal::BigDecimal;
use chrono::{Datelike, Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use super::violation::Violation;

static TITLE_CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9\s\-:,\.]+$").expect("title charset pattern"));
static LETTERS_AND_SPACES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z\s]+$").expect("letters pattern"));
static ISBN10_GROUPING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]-[0-9]{3}-[0-9]{5}-[0-9]$").expect("isbn10 pattern"));
static ISBN13_GROUPING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{3}-[0-9]-[0-9]{3}-[0-9]{5}-[0-9]$").expect("isbn13 pattern")
});

/// Checks applied to text fields (title, author, ISBN).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextRule {
    /// At least this many whitespace-separated words.
    MinWords(usize),
    /// The first character is uppercase.
    FirstCharUppercase,
    /// The first character of every word is uppercase.
    EveryWordCapitalized,
    /// Letters, digits, whitespace and `- : , .` only.
    TitleCharset,
    /// ASCII letters and whitespace only.
    LettersAndSpaces,
    /// Not made of digits alone, ignoring spaces.
    NotDigitsOnly,
    /// 10 or 13 digits once `-` and spaces are stripped.
    IsbnDigits,
    /// Hyphenated values follow the canonical ISBN grouping.
    IsbnGrouping,
    /// No other book holds the same value.
    Unique,
    /// Replace the value with its title-cased form.
    TitleCase,
}

impl TextRule {
    /// Evaluate a pure rule. Store-backed rules and normalizers pass here.
    pub fn check(&self, value: &str) -> Result<(), Violation> {
        match self {
            TextRule::MinWords(min) => {
                if value.split_whitespace().count() < *min {
                    return Err(Violation::TooFewWords { min: *min });
                }
            }
            TextRule::FirstCharUppercase => {
                if !value.chars().next().is_some_and(char::is_uppercase) {
                    return Err(Violation::NotCapitalized);
                }
            }
            TextRule::EveryWordCapitalized => {
                let all_capitalized = value
                    .split_whitespace()
                    .all(|word| word.chars().next().is_some_and(char::is_uppercase));
                if !all_capitalized {
                    return Err(Violation::WordNotCapitalized);
                }
            }
            TextRule::TitleCharset => {
                if !TITLE_CHARSET.is_match(value) {
                    return Err(Violation::DisallowedCharacters);
                }
            }
            TextRule::LettersAndSpaces => {
                if !LETTERS_AND_SPACES.is_match(value) {
                    return Err(Violation::NotLettersOnly);
                }
            }
            TextRule::NotDigitsOnly => {
                let compact: String = value.chars().filter(|c| *c != ' ').collect();
                if !compact.is_empty() && compact.chars().all(|c| c.is_ascii_digit()) {
                    return Err(Violation::DigitsOnly);
                }
            }
            TextRule::IsbnDigits => {
                let digits = strip_isbn(value);
                if !matches!(digits.chars().count(), 10 | 13) {
                    return Err(Violation::IsbnLength);
                }
                if !digits.chars().all(|c| c.is_ascii_digit()) {
                    return Err(Violation::IsbnNotDigits);
                }
            }
            TextRule::IsbnGrouping => {
                if value.contains('-') {
                    let pattern = if strip_isbn(value).chars().count() == 10 {
                        &ISBN10_GROUPING
                    } else {
                        &ISBN13_GROUPING
                    };
                    if !pattern.is_match(value) {
                        return Err(Violation::IsbnGrouping);
                    }
                }
            }
            TextRule::Unique | TextRule::TitleCase => {}
        }
        Ok(())
    }
}

impl fmt::Display for TextRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextRule::MinWords(min) => write!(f, "at least {min} words"),
            TextRule::FirstCharUppercase => f.write_str("starts with an uppercase letter"),
            TextRule::EveryWordCapitalized => f.write_str("every word capitalized"),
            TextRule::TitleCharset => f.write_str("letters, digits, spaces and - : , . only"),
            TextRule::LettersAndSpaces => f.write_str("letters and spaces only"),
            TextRule::NotDigitsOnly => f.write_str("not digits only"),
            TextRule::IsbnDigits => f.write_str("10 or 13 digits ignoring - and spaces"),
            TextRule::IsbnGrouping => f.write_str("canonical grouping when hyphenated"),
            TextRule::Unique => f.write_str("unique"),
            TextRule::TitleCase => f.write_str("normalized to title case"),
        }
    }
}

/// Digits of an ISBN with `-` and spaces removed.
pub fn strip_isbn(value: &str) -> String {
    value.chars().filter(|c| *c != '-' && *c != ' ').collect()
}

/// Checks applied to the price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceRule {
    Positive,
    /// Inclusive bounds in whole currency units.
    Range { min: u64, max: u64 },
    /// At most this many digits after the decimal point in the submitted text.
    MaxFractionDigits(usize),
}

impl PriceRule {
    /// `text` is the price exactly as submitted; the digit-count rule reads it
    /// instead of `amount`, so `19.90` passes and `19.900` does not.
    pub fn check(&self, amount: &BigDecimal, text: &str) -> Result<(), Violation> {
        match self {
            PriceRule::Positive => {
                if *amount <= BigDecimal::from(0u64) {
                    return Err(Violation::NotPositive);
                }
            }
            PriceRule::Range { min, max } => {
                if *amount < BigDecimal::from(*min) || *amount > BigDecimal::from(*max) {
                    return Err(Violation::PriceOutOfRange {
                        min: *min,
                        max: *max,
                    });
                }
            }
            PriceRule::MaxFractionDigits(max) => {
                if fraction_digits(text) > *max {
                    return Err(Violation::TooManyFractionDigits { max: *max });
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for PriceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceRule::Positive => f.write_str("positive"),
            PriceRule::Range { min, max } => write!(f, "between {min} and {max}"),
            PriceRule::MaxFractionDigits(max) => write!(f, "at most {max} decimal places"),
        }
    }
}

/// Digits following the decimal point in a textual number.
fn fraction_digits(text: &str) -> usize {
    text.split_once('.')
        .map(|(_, fraction)| fraction.chars().take_while(char::is_ascii_digit).count())
        .unwrap_or(0)
}

/// Checks applied to the publication date, relative to `today`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateRule {
    NotInFuture,
    /// Year is at least this value.
    MinYear(i32),
    /// Year is between this value and the current year.
    YearUpToCurrent(i32),
    /// Not further in the past than this many days.
    MaxAgeDays(i64),
}

impl DateRule {
    pub fn check(&self, date: NaiveDate, today: NaiveDate) -> Result<(), Violation> {
        match self {
            DateRule::NotInFuture => {
                if date > today {
                    return Err(Violation::FutureDate);
                }
            }
            DateRule::MinYear(min) => {
                if date.year() < *min {
                    return Err(Violation::TooEarly { min: *min });
                }
            }
            DateRule::YearUpToCurrent(min) => {
                let max = today.year();
                if date.year() < *min || date.year() > max {
                    return Err(Violation::YearOutOfRange { min: *min, max });
                }
            }
            DateRule::MaxAgeDays(days) => {
                // A window reaching past the calendar's start excludes nothing.
                if days_before(today, *days).is_some_and(|oldest| date < oldest) {
                    return Err(Violation::TooOld { days: *days });
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for DateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateRule::NotInFuture => f.write_str("not in the future"),
            DateRule::MinYear(min) => write!(f, "year {min} or later"),
            DateRule::YearUpToCurrent(min) => write!(f, "year between {min} and the current year"),
            DateRule::MaxAgeDays(days) => write!(f, "at most {days} days old"),
        }
    }
}

/// `today` minus `days`, or `None` when that falls outside the calendar.
fn days_before(today: NaiveDate, days: i64) -> Option<NaiveDate> {
    Duration::try_days(days).and_then(|window| today.checked_sub_signed(window))
}

/// Whole-record checks, run after every field passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordRule {
    /// No other book has the same title and author.
    UniqueTitleAuthor,
    /// Subtitle is not longer than the title.
    SubtitleNotLongerThanTitle,
    /// No other book uses the same cover image.
    UniqueCoverImage,
    /// Books published within `window_days` cost at least `floor`.
    RecentPriceFloor { window_days: i64, floor: u64 },
}

impl RecordRule {
    /// Pure cross-field check. Uniqueness rules pass here.
    pub fn check(
        &self,
        record: &crate::modules::books::models::BookRecord,
        today: NaiveDate,
    ) -> Result<(), Violation> {
        match self {
            RecordRule::SubtitleNotLongerThanTitle => {
                if let Some(subtitle) = &record.subtitle {
                    if subtitle.chars().count() > record.title.chars().count() {
                        return Err(Violation::SubtitleTooLong);
                    }
                }
            }
            RecordRule::RecentPriceFloor { window_days, floor } => {
                let recent = days_before(today, *window_days)
                    .map_or(true, |window_start| record.published_date > window_start);
                if recent && record.price < BigDecimal::from(*floor) {
                    return Err(Violation::RecentBookUnderpriced {
                        days: *window_days,
                        floor: *floor,
                    });
                }
            }
            RecordRule::UniqueTitleAuthor | RecordRule::UniqueCoverImage => {}
        }
        Ok(())
    }
}

impl fmt::Display for RecordRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordRule::UniqueTitleAuthor => f.write_str("title and author pair unique"),
            RecordRule::SubtitleNotLongerThanTitle => f.write_str("subtitle not longer than title"),
            RecordRule::UniqueCoverImage => f.write_str("cover image unique"),
            RecordRule::RecentPriceFloor { window_days, floor } => write!(
                f,
                "books from the last {window_days} days cost at least {floor}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn price(text: &str) -> BigDecimal {
        BigDecimal::from_str(text).unwrap()
    }

    #[test]
    fn test_word_rules() {
        assert_eq!(
            TextRule::MinWords(2).check("Dune"),
            Err(Violation::TooFewWords { min: 2 })
        );
        assert!(TextRule::MinWords(2).check("Dune  Messiah").is_ok());
        assert_eq!(
            TextRule::FirstCharUppercase.check("dune messiah"),
            Err(Violation::NotCapitalized)
        );
        assert_eq!(
            TextRule::EveryWordCapitalized.check("Frank herbert"),
            Err(Violation::WordNotCapitalized)
        );
        assert!(TextRule::EveryWordCapitalized.check("Frank Herbert").is_ok());
    }

    #[test]
    fn test_charset_rules() {
        assert!(TextRule::TitleCharset
            .check("Dune: Part 2, Vol. 1-A")
            .is_ok());
        assert_eq!(
            TextRule::TitleCharset.check("Dune!"),
            Err(Violation::DisallowedCharacters)
        );
        assert_eq!(
            TextRule::LettersAndSpaces.check("J. R. R. Tolkien"),
            Err(Violation::NotLettersOnly)
        );
        assert_eq!(
            TextRule::NotDigitsOnly.check("1984 2000"),
            Err(Violation::DigitsOnly)
        );
        assert!(TextRule::NotDigitsOnly.check("Nineteen 84").is_ok());
    }

    #[test]
    fn test_isbn_digits_and_grouping_stack() {
        assert!(TextRule::IsbnDigits.check("9780441013593").is_ok());
        assert!(TextRule::IsbnDigits.check("123-4-567-89012-3").is_ok());
        assert!(TextRule::IsbnGrouping.check("123-4-567-89012-3").is_ok());
        assert!(TextRule::IsbnGrouping.check("0-441-01359-7").is_ok());

        // Right digit count, wrong grouping.
        assert!(TextRule::IsbnDigits.check("12-34-567-89012-3").is_ok());
        assert_eq!(
            TextRule::IsbnGrouping.check("12-34-567-89012-3"),
            Err(Violation::IsbnGrouping)
        );

        assert_eq!(
            TextRule::IsbnDigits.check("1-2-3-4-5"),
            Err(Violation::IsbnLength)
        );
        assert_eq!(
            TextRule::IsbnDigits.check("978044101359X"),
            Err(Violation::IsbnNotDigits)
        );
        // Spaces are stripped but not subject to the grouping pattern.
        assert!(TextRule::IsbnGrouping.check("978 0441 013593").is_ok());
    }

    #[test]
    fn test_price_rules() {
        assert_eq!(
            PriceRule::Positive.check(&price("0"), "0"),
            Err(Violation::NotPositive)
        );
        let range = PriceRule::Range { min: 5, max: 1000 };
        assert!(range.check(&price("5"), "5").is_ok());
        assert!(range.check(&price("1000"), "1000").is_ok());
        assert_eq!(
            range.check(&price("1000.01"), "1000.01"),
            Err(Violation::PriceOutOfRange { min: 5, max: 1000 })
        );
    }

    #[test]
    fn test_fraction_digits_follow_the_submitted_text() {
        let rule = PriceRule::MaxFractionDigits(2);
        assert!(rule.check(&price("19.99"), "19.99").is_ok());
        assert!(rule.check(&price("19.9"), "19.90").is_ok());
        assert!(rule.check(&price("19"), "19").is_ok());
        assert_eq!(
            rule.check(&price("19.999"), "19.999"),
            Err(Violation::TooManyFractionDigits { max: 2 })
        );
        assert_eq!(
            rule.check(&price("19.9"), "19.900"),
            Err(Violation::TooManyFractionDigits { max: 2 })
        );
    }

    #[test]
    fn test_date_rules_are_relative_to_today() {
        let today = date(2026, 10, 19);
        assert!(DateRule::NotInFuture.check(today, today).is_ok());
        assert_eq!(
            DateRule::NotInFuture.check(date(2026, 10, 20), today),
            Err(Violation::FutureDate)
        );
        assert!(DateRule::MinYear(1450).check(date(1450, 1, 1), today).is_ok());
        assert_eq!(
            DateRule::MinYear(1450).check(date(1449, 12, 31), today),
            Err(Violation::TooEarly { min: 1450 })
        );
        assert_eq!(
            DateRule::YearUpToCurrent(1450).check(date(2027, 1, 1), today),
            Err(Violation::YearOutOfRange {
                min: 1450,
                max: 2026
            })
        );

        let max_age = DateRule::MaxAgeDays(36500);
        let oldest = today - Duration::days(36500);
        assert!(max_age.check(oldest, today).is_ok());
        assert_eq!(
            max_age.check(oldest - Duration::days(1), today),
            Err(Violation::TooOld { days: 36500 })
        );
    }

    #[test]
    fn test_windows_past_the_calendar_do_not_panic() {
        let today = date(2026, 10, 19);
        let max_age = DateRule::MaxAgeDays(1_000_000_000);
        assert!(max_age.check(date(1450, 1, 1), today).is_ok());
        assert!(DateRule::MaxAgeDays(i64::MAX).check(today, today).is_ok());

        let record = crate::modules::books::models::BookRecord {
            title: "Gutenberg Bible".to_string(),
            subtitle: None,
            author: "Johannes Gutenberg".to_string(),
            published_date: date(1455, 1, 1),
            isbn_number: "9780441013593".to_string(),
            pages: 1282,
            cover_image: None,
            language: "Latin".to_string(),
            price: price("10"),
            published: false,
        };
        let floor = RecordRule::RecentPriceFloor {
            window_days: i64::MAX,
            floor: 20,
        };
        assert_eq!(
            floor.check(&record, today),
            Err(Violation::RecentBookUnderpriced {
                days: i64::MAX,
                floor: 20
            })
        );
    }

    #[test]
    fn test_record_rules() {
        use crate::modules::books::models::BookRecord;

        let today = date(2026, 10, 19);
        let mut record = BookRecord {
            title: "Short Title".to_string(),
            subtitle: Some("A much longer subtitle".to_string()),
            author: "Frank Herbert".to_string(),
            published_date: date(2026, 6, 1),
            isbn_number: "9780441013593".to_string(),
            pages: 100,
            cover_image: None,
            language: "English".to_string(),
            price: price("10"),
            published: false,
        };

        assert_eq!(
            RecordRule::SubtitleNotLongerThanTitle.check(&record, today),
            Err(Violation::SubtitleTooLong)
        );

        let floor = RecordRule::RecentPriceFloor {
            window_days: 365,
            floor: 20,
        };
        assert_eq!(
            floor.check(&record, today),
            Err(Violation::RecentBookUnderpriced {
                days: 365,
                floor: 20
            })
        );

        // Exactly 365 days old is outside the window.
        record.published_date = today - Duration::days(365);
        assert!(floor.check(&record, today).is_ok());

        record.published_date = today;
        record.price = price("20");
        assert!(floor.check(&record, today).is_ok());
    }
}
