//! Raw candidates and their decoding into typed, not-yet-validated values.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde_json::{Map, Value};

use super::models::{BookRecord, Field};
use super::validation::{report::ValidationReport, violation::Violation};

const TITLE_MAX: usize = 200;
const SUBTITLE_MAX: usize = 200;
const AUTHOR_MAX: usize = 100;
const ISBN_MAX: usize = 17;
const LANGUAGE_MAX: usize = 30;
const URL_MAX: usize = 200;
const PRICE_MAX_WHOLE_DIGITS: u64 = 8;
const PRICE_MAX_DECIMAL_PLACES: i64 = 2;

/// Field values submitted for create or update, keyed by wire name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    values: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected a JSON object, got {0}")]
pub struct NotAnObject(&'static str);

impl Candidate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Result<Self, NotAnObject> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            Value::Null => Err(NotAnObject("null")),
            Value::Bool(_) => Err(NotAnObject("a boolean")),
            Value::Number(_) => Err(NotAnObject("a number")),
            Value::String(_) => Err(NotAnObject("a string")),
            Value::Array(_) => Err(NotAnObject("an array")),
        }
    }

    /// Candidate holding every field of an existing record.
    pub fn from_record(record: &BookRecord) -> Self {
        let mut candidate = Self::new();
        candidate
            .set(Field::Title, record.title.clone())
            .set(Field::Subtitle, record.subtitle.clone())
            .set(Field::Author, record.author.clone())
            .set(Field::PublishedDate, record.published_date.to_string())
            .set(Field::IsbnNumber, record.isbn_number.clone())
            .set(Field::Pages, record.pages)
            .set(Field::CoverImage, record.cover_image.clone())
            .set(Field::Language, record.language.clone())
            .set(Field::Price, record.price.to_string())
            .set(Field::Published, record.published);
        candidate
    }

    pub fn set(&mut self, field: Field, value: impl Into<Value>) -> &mut Self {
        self.values.insert(field.as_str().to_string(), value.into());
        self
    }

    pub fn get(&self, field: Field) -> Option<&Value> {
        self.values.get(field.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A price together with the text it was submitted as.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceInput {
    pub amount: BigDecimal,
    pub text: String,
}

/// Decoded candidate. `None` means the field was not submitted (or failed
/// to decode); for nullable fields `Some(None)` means explicitly cleared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    pub title: Option<String>,
    pub subtitle: Option<Option<String>>,
    pub author: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub isbn_number: Option<String>,
    pub pages: Option<i32>,
    pub cover_image: Option<Option<String>>,
    pub language: Option<String>,
    pub price: Option<PriceInput>,
    pub published: Option<bool>,
}

impl Draft {
    /// Decode every submitted field, recording type and size problems in
    /// `report`. Unknown keys are ignored.
    pub fn decode(candidate: &Candidate, report: &mut ValidationReport) -> Self {
        let mut draft = Draft::default();
        let text = |field: Field, max: usize| {
            candidate
                .get(field)
                .map(|value| required_text(value, max))
        };
        let optional_text = |field: Field, check: fn(&str) -> Result<(), Violation>| {
            candidate.get(field).map(|value| nullable_text(value, check))
        };

        draft.title = take(report, Field::Title, text(Field::Title, TITLE_MAX));
        draft.subtitle = take(
            report,
            Field::Subtitle,
            optional_text(Field::Subtitle, |s| max_chars(s, SUBTITLE_MAX)),
        );
        draft.author = take(report, Field::Author, text(Field::Author, AUTHOR_MAX));
        draft.published_date = take(
            report,
            Field::PublishedDate,
            candidate.get(Field::PublishedDate).map(decode_date),
        );
        draft.isbn_number = take(report, Field::IsbnNumber, text(Field::IsbnNumber, ISBN_MAX));
        draft.pages = take(report, Field::Pages, candidate.get(Field::Pages).map(decode_pages));
        draft.cover_image = take(
            report,
            Field::CoverImage,
            optional_text(Field::CoverImage, check_url),
        );
        draft.language = take(report, Field::Language, text(Field::Language, LANGUAGE_MAX));
        draft.price = take(report, Field::Price, candidate.get(Field::Price).map(decode_price));
        draft.published = take(
            report,
            Field::Published,
            candidate.get(Field::Published).map(decode_bool),
        );

        draft
    }
}

fn take<T>(
    report: &mut ValidationReport,
    field: Field,
    decoded: Option<Result<T, Violation>>,
) -> Option<T> {
    match decoded {
        Some(Ok(value)) => Some(value),
        Some(Err(violation)) => {
            report.field(field, violation);
            None
        }
        None => None,
    }
}

fn max_chars(value: &str, max: usize) -> Result<(), Violation> {
    if value.chars().count() > max {
        return Err(Violation::TooLong { max });
    }
    Ok(())
}

fn required_text(value: &Value, max: usize) -> Result<String, Violation> {
    let Value::String(text) = value else {
        return Err(match value {
            Value::Null => Violation::Required,
            _ => Violation::NotAString,
        });
    };
    if text.trim().is_empty() {
        return Err(Violation::Blank);
    }
    max_chars(text, max)?;
    Ok(text.clone())
}

/// `null` and `""` both mean "not set".
fn nullable_text(
    value: &Value,
    check: fn(&str) -> Result<(), Violation>,
) -> Result<Option<String>, Violation> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) if text.is_empty() => Ok(None),
        Value::String(text) => {
            check(text)?;
            Ok(Some(text.clone()))
        }
        _ => Err(Violation::NotAString),
    }
}

fn check_url(value: &str) -> Result<(), Violation> {
    max_chars(value, URL_MAX)?;
    let parsed = url::Url::parse(value).map_err(|_| Violation::InvalidUrl)?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(Violation::InvalidUrl);
    }
    Ok(())
}

fn decode_date(value: &Value) -> Result<NaiveDate, Violation> {
    match value {
        Value::String(text) => {
            NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| Violation::InvalidDate)
        }
        Value::Null => Err(Violation::Required),
        _ => Err(Violation::InvalidDate),
    }
}

fn decode_pages(value: &Value) -> Result<i32, Violation> {
    let whole = match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        Value::Null => return Err(Violation::Required),
        _ => None,
    };
    whole
        .and_then(|pages| i32::try_from(pages).ok())
        .ok_or(Violation::NotAnInteger)
}

fn decode_price(value: &Value) -> Result<PriceInput, Violation> {
    let text = match value {
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.trim().to_string(),
        Value::Null => return Err(Violation::Required),
        _ => return Err(Violation::NotANumber),
    };
    let amount = BigDecimal::from_str(&text).map_err(|_| Violation::NotANumber)?;

    // Storage precision: ten digits, two of them after the point. Digits are
    // counted on the normalized mantissa so exponent notation is never expanded.
    let normalized = amount.normalized();
    let (_, scale) = normalized.as_bigint_and_exponent();
    if scale > PRICE_MAX_DECIMAL_PLACES {
        return Err(Violation::TooManyDecimalPlaces {
            max: PRICE_MAX_DECIMAL_PLACES,
        });
    }
    let whole_digits = i64::try_from(normalized.digits())
        .unwrap_or(i64::MAX)
        .saturating_sub(scale);
    if whole_digits > PRICE_MAX_WHOLE_DIGITS as i64 {
        return Err(Violation::TooManyWholeDigits {
            max: PRICE_MAX_WHOLE_DIGITS,
        });
    }

    Ok(PriceInput { amount, text })
}

fn decode_bool(value: &Value) -> Result<bool, Violation> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::String(text) => match text.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(Violation::NotABoolean),
        },
        Value::Number(number) => match number.as_u64() {
            Some(1) => Ok(true),
            Some(0) => Ok(false),
            _ => Err(Violation::NotABoolean),
        },
        Value::Null => Err(Violation::NotABoolean),
        Value::Array(_) | Value::Object(_) => Err(Violation::NotABoolean),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> (Draft, ValidationReport) {
        let candidate = Candidate::from_value(value).unwrap();
        let mut report = ValidationReport::new();
        let draft = Draft::decode(&candidate, &mut report);
        (draft, report)
    }

    #[test]
    fn test_rejects_non_object_payloads() {
        assert_eq!(
            Candidate::from_value(json!([1, 2])),
            Err(NotAnObject("an array"))
        );
    }

    #[test]
    fn test_decodes_a_full_candidate() {
        let (draft, report) = decode(json!({
            "title": "Dune Messiah",
            "subtitle": "",
            "author": "Frank Herbert",
            "published_date": "1969-10-15",
            "isbn_number": "9780441013593",
            "pages": "256",
            "cover_image": "https://covers.example.com/dune.jpg",
            "language": "English",
            "price": 19.9,
            "published": "true",
            "id": 99,
        }));
        assert!(report.is_empty(), "{report:?}");
        assert_eq!(draft.subtitle, Some(None));
        assert_eq!(draft.pages, Some(256));
        assert_eq!(draft.published, Some(true));
        assert_eq!(draft.price.unwrap().text, "19.9");
        assert_eq!(
            draft.published_date,
            NaiveDate::from_ymd_opt(1969, 10, 15)
        );
    }

    #[test]
    fn test_absent_fields_stay_unset() {
        let (draft, report) = decode(json!({"language": "Uzbek"}));
        assert!(report.is_empty());
        assert_eq!(draft.title, None);
        assert_eq!(draft.subtitle, None);
        assert_eq!(draft.language.as_deref(), Some("Uzbek"));
    }

    #[test]
    fn test_type_errors_are_tagged_by_field() {
        let (draft, report) = decode(json!({
            "title": 42,
            "pages": 3_000_000_000u64,
            "published_date": "15/10/1969",
            "price": "cheap",
            "cover_image": "ftp://covers.example.com/dune.jpg",
            "published": "maybe",
            "author": "   ",
        }));
        assert_eq!(draft, Draft::default());
        assert_eq!(report.messages_for(Field::Title), vec!["Not a valid string."]);
        assert_eq!(
            report.messages_for(Field::Pages),
            vec!["A valid integer is required."]
        );
        assert!(report.has_field(Field::PublishedDate));
        assert!(report.has_field(Field::Price));
        assert_eq!(report.messages_for(Field::CoverImage), vec!["Enter a valid URL."]);
        assert!(report.has_field(Field::Published));
        assert_eq!(
            report.messages_for(Field::Author),
            vec!["This field may not be blank."]
        );
    }

    #[test]
    fn test_enforces_max_lengths() {
        let (_, report) = decode(json!({
            "language": "x".repeat(31),
            "isbn_number": "978-0-441-01359-3-11",
        }));
        assert_eq!(
            report.messages_for(Field::Language),
            vec!["Ensure this field has no more than 30 characters."]
        );
        assert!(report.has_field(Field::IsbnNumber));
    }

    #[test]
    fn test_price_storage_precision() {
        let (draft, report) = decode(json!({"price": "19.90"}));
        assert!(report.is_empty());
        assert_eq!(draft.price.unwrap().text, "19.90");

        let (_, report) = decode(json!({"price": "19.999"}));
        assert_eq!(
            report.messages_for(Field::Price),
            vec!["Ensure that there are no more than 2 decimal places."]
        );

        let (_, report) = decode(json!({"price": 123456789}));
        assert_eq!(
            report.messages_for(Field::Price),
            vec!["Ensure that there are no more than 8 digits before the decimal point."]
        );

        let (_, report) = decode(json!({"price": "12345678.99"}));
        assert!(report.is_empty());
    }

    #[test]
    fn test_price_exponent_notation_is_not_expanded() {
        let started = std::time::Instant::now();
        for huge in ["1e10000000", "1e100000000", "-9E999999999"] {
            let (_, report) = decode(json!({ "price": huge }));
            assert_eq!(
                report.messages_for(Field::Price),
                vec!["Ensure that there are no more than 8 digits before the decimal point."],
                "{huge}"
            );
        }
        assert!(started.elapsed() < std::time::Duration::from_secs(1));

        let (_, report) = decode(json!({"price": "1e-10000000"}));
        assert_eq!(
            report.messages_for(Field::Price),
            vec!["Ensure that there are no more than 2 decimal places."]
        );

        let (draft, report) = decode(json!({"price": "1.5e3"}));
        assert!(report.is_empty());
        assert_eq!(draft.price.unwrap().amount, BigDecimal::from(1500));

        let (_, report) = decode(json!({"price": "9.9999999e7"}));
        assert!(report.is_empty());
        let (_, report) = decode(json!({"price": "1e8"}));
        assert!(report.has_field(Field::Price));
    }

    #[test]
    fn test_record_round_trips_through_candidate() {
        let record = BookRecord {
            title: "Dune Messiah".to_string(),
            subtitle: None,
            author: "Frank Herbert".to_string(),
            published_date: NaiveDate::from_ymd_opt(1969, 10, 15).unwrap(),
            isbn_number: "9780441013593".to_string(),
            pages: 256,
            cover_image: Some("https://covers.example.com/dune.jpg".to_string()),
            language: "English".to_string(),
            price: BigDecimal::from_str("16000.00").unwrap(),
            published: true,
        };
        let (draft, report) = decode(Value::Object(Candidate::from_record(&record).values));
        assert!(report.is_empty(), "{report:?}");
        assert_eq!(draft.title.as_deref(), Some("Dune Messiah"));
        assert_eq!(draft.cover_image, Some(record.cover_image.clone()));
        assert_eq!(draft.price.unwrap().amount, record.price);
    }
}
