use thiserror::Error;

use crate::modules::books::models::Field;

/// Which class of problem an issue belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A single value fails a syntactic or semantic rule for its field.
    FieldFormat,
    /// A value collides with another book on a unique field or field pair.
    UniquenessConflict,
    /// Individually valid fields that are inconsistent together.
    CrossFieldConsistency,
}

/// Every reason a candidate can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("This field is required.")]
    Required,
    #[error("This field may not be blank.")]
    Blank,
    #[error("Not a valid string.")]
    NotAString,
    #[error("A valid integer is required.")]
    NotAnInteger,
    #[error("A valid number is required.")]
    NotANumber,
    #[error("Must be a valid boolean.")]
    NotABoolean,
    #[error("Date has wrong format. Use YYYY-MM-DD.")]
    InvalidDate,
    #[error("Enter a valid URL.")]
    InvalidUrl,
    #[error("Ensure this field has no more than {max} characters.")]
    TooLong { max: usize },
    #[error("Ensure that there are no more than {max} digits before the decimal point.")]
    TooManyWholeDigits { max: u64 },
    #[error("Ensure that there are no more than {max} decimal places.")]
    TooManyDecimalPlaces { max: i64 },

    #[error("Must contain at least {min} words.")]
    TooFewWords { min: usize },
    #[error("Must start with an uppercase letter.")]
    NotCapitalized,
    #[error("Every word must start with an uppercase letter.")]
    WordNotCapitalized,
    #[error("Only letters, digits, spaces and the characters - : , . are allowed.")]
    DisallowedCharacters,
    #[error("Only letters and spaces are allowed.")]
    NotLettersOnly,
    #[error("Must not consist of digits only.")]
    DigitsOnly,
    #[error("ISBN must consist of 10 or 13 characters.")]
    IsbnLength,
    #[error("ISBN must contain digits only.")]
    IsbnNotDigits,
    #[error("ISBN grouping is invalid. Use X-XXX-XXXXX-X or XXX-X-XXX-XXXXX-X.")]
    IsbnGrouping,
    #[error("Price must be a positive number.")]
    NotPositive,
    #[error("Price must be between {min} and {max}.")]
    PriceOutOfRange { min: u64, max: u64 },
    #[error("Price may have at most {max} decimal places.")]
    TooManyFractionDigits { max: usize },
    #[error("Published date cannot be in the future.")]
    FutureDate,
    #[error("Published date must be in {min} or later.")]
    TooEarly { min: i32 },
    #[error("Year must be between {min} and {max}.")]
    YearOutOfRange { min: i32, max: i32 },
    #[error("Published date cannot be more than {days} days in the past.")]
    TooOld { days: i64 },

    #[error("A book with this {} already exists.", .field.label())]
    Duplicate { field: Field },
    #[error("A book with this title by this author already exists.")]
    DuplicateTitleAuthor,
    #[error("Subtitle cannot be longer than the title.")]
    SubtitleTooLong,
    #[error("Books published within the last {days} days must cost at least {floor}.")]
    RecentBookUnderpriced { days: i64, floor: u64 },
}

impl Violation {
    pub fn kind(&self) -> IssueKind {
        match self {
            Violation::Duplicate { .. } | Violation::DuplicateTitleAuthor => {
                IssueKind::UniquenessConflict
            }
            Violation::SubtitleTooLong | Violation::RecentBookUnderpriced { .. } => {
                IssueKind::CrossFieldConsistency
            }
            _ => IssueKind::FieldFormat,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Violation::Required => "required",
            Violation::Blank => "blank",
            Violation::NotAString => "not_a_string",
            Violation::NotAnInteger => "not_an_integer",
            Violation::NotANumber => "not_a_number",
            Violation::NotABoolean => "not_a_boolean",
            Violation::InvalidDate => "invalid_date",
            Violation::InvalidUrl => "invalid_url",
            Violation::TooLong { .. } => "too_long",
            Violation::TooManyWholeDigits { .. } => "max_whole_digits",
            Violation::TooManyDecimalPlaces { .. } => "max_decimal_places",
            Violation::TooFewWords { .. } => "min_words",
            Violation::NotCapitalized => "not_capitalized",
            Violation::WordNotCapitalized => "word_not_capitalized",
            Violation::DisallowedCharacters => "disallowed_characters",
            Violation::NotLettersOnly => "letters_only",
            Violation::DigitsOnly => "digits_only",
            Violation::IsbnLength => "isbn_length",
            Violation::IsbnNotDigits => "isbn_not_digits",
            Violation::IsbnGrouping => "isbn_grouping",
            Violation::NotPositive => "not_positive",
            Violation::PriceOutOfRange { .. } => "price_out_of_range",
            Violation::TooManyFractionDigits { .. } => "fraction_digits",
            Violation::FutureDate => "future_date",
            Violation::TooEarly { .. } => "too_early",
            Violation::YearOutOfRange { .. } => "year_out_of_range",
            Violation::TooOld { .. } => "too_old",
            Violation::Duplicate { .. } => "unique",
            Violation::DuplicateTitleAuthor => "unique_title_author",
            Violation::SubtitleTooLong => "subtitle_too_long",
            Violation::RecentBookUnderpriced { .. } => "recent_book_underpriced",
        }
    }
}
