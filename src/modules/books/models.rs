use std::fmt;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier assigned by the store on create.
pub type BookId = u64;

/// Every attribute of a book, used to tag validation issues and build filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Subtitle,
    Author,
    PublishedDate,
    IsbnNumber,
    Pages,
    CoverImage,
    Language,
    Price,
    Published,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::Title,
        Field::Subtitle,
        Field::Author,
        Field::PublishedDate,
        Field::IsbnNumber,
        Field::Pages,
        Field::CoverImage,
        Field::Language,
        Field::Price,
        Field::Published,
    ];

    /// Wire name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Subtitle => "subtitle",
            Field::Author => "author",
            Field::PublishedDate => "published_date",
            Field::IsbnNumber => "isbn_number",
            Field::Pages => "pages",
            Field::CoverImage => "cover_image",
            Field::Language => "language",
            Field::Price => "price",
            Field::Published => "published",
        }
    }

    /// Human readable name used inside messages.
    pub fn label(&self) -> &'static str {
        match self {
            Field::IsbnNumber => "ISBN",
            Field::PublishedDate => "published date",
            Field::CoverImage => "cover image",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An accepted, normalized book that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub author: String,
    pub published_date: NaiveDate,
    pub isbn_number: String,
    pub pages: i32,
    #[serde(default)]
    pub cover_image: Option<String>,
    pub language: String,
    pub price: BigDecimal,
    #[serde(default)]
    pub published: bool,
}

impl BookRecord {
    /// Textual value of a field as compared by equality filters.
    /// Unset optional fields have no value and never match.
    pub fn field_text(&self, field: Field) -> Option<String> {
        match field {
            Field::Title => Some(self.title.clone()),
            Field::Subtitle => self.subtitle.clone(),
            Field::Author => Some(self.author.clone()),
            Field::PublishedDate => Some(self.published_date.to_string()),
            Field::IsbnNumber => Some(self.isbn_number.clone()),
            Field::Pages => Some(self.pages.to_string()),
            Field::CoverImage => self.cover_image.clone(),
            Field::Language => Some(self.language.clone()),
            Field::Price => Some(self.price.normalized().to_string()),
            Field::Published => Some(self.published.to_string()),
        }
    }
}

/// A stored book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    #[serde(flatten)]
    pub record: BookRecord,
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}", self.record.title, self.record.author)
    }
}

/// Counts returned by the statistics endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogStatistics {
    pub total_books: usize,
    pub published_books: usize,
    pub unpublished_books: usize,
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub count: usize,
    pub page: usize,
    pub page_size: usize,
    pub results: Vec<T>,
}
