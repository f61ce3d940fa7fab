//! Candidate validation.
//!
//! A candidate is decoded, every submitted field runs through the policy's
//! rules for that field, the result is merged with the record being
//! updated (if any) and, when every field passed, the record rules run on
//! the merged record. All independent problems end up in one
//! [`ValidationReport`].

pub mod normalize;
pub mod policy;
pub mod report;
pub mod rules;
pub mod violation;

use std::{fmt, sync::Arc};

use chrono::NaiveDate;
use thiserror::Error;

use super::candidate::{Candidate, Draft, PriceInput};
use super::models::{Book, BookId, BookRecord, Field};
use super::store::{BookStore, Filter, StoreError};
use policy::Policy;
use report::ValidationReport;
use rules::{RecordRule, TextRule};
use violation::Violation;

/// Source of "today" for date rules.
pub trait Clock: Send + Sync + fmt::Debug {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Clock pinned to one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// What a candidate is validated for.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Create,
    /// Full update: required fields must be submitted again.
    Replace(&'a Book),
    /// Partial update: missing fields keep their stored values.
    Patch(&'a Book),
}

impl<'a> Target<'a> {
    pub fn existing(&self) -> Option<&'a Book> {
        match *self {
            Target::Create => None,
            Target::Replace(book) | Target::Patch(book) => Some(book),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("candidate rejected with {} issue(s)", .0.len())]
    Rejected(ValidationReport),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Applies a [`Policy`] to candidates, consulting the store for uniqueness.
#[derive(Debug, Clone)]
pub struct ValidationEngine {
    store: Arc<dyn BookStore>,
    clock: Arc<dyn Clock>,
}

impl ValidationEngine {
    pub fn new(store: Arc<dyn BookStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Validate `candidate` and return the normalized record to store.
    pub async fn validate(
        &self,
        policy: &Policy,
        candidate: &Candidate,
        target: Target<'_>,
    ) -> Result<BookRecord, EngineError> {
        let today = self.clock.today();
        let existing = target.existing();
        let exclude = existing.map(|book| book.id);

        let mut report = ValidationReport::new();
        let mut draft = Draft::decode(candidate, &mut report);

        if let Some(title) = draft.title.take() {
            draft.title = self
                .check_text(&policy.title, Field::Title, title, exclude, &mut report)
                .await?;
        }
        if let Some(author) = draft.author.take() {
            draft.author = self
                .check_text(&policy.author, Field::Author, author, exclude, &mut report)
                .await?;
        }
        if let Some(isbn) = draft.isbn_number.take() {
            draft.isbn_number = self
                .check_text(&policy.isbn_number, Field::IsbnNumber, isbn, exclude, &mut report)
                .await?;
        }
        if let Some(PriceInput { amount, text }) = &draft.price {
            if let Some(violation) = policy
                .price
                .iter()
                .find_map(|rule| rule.check(amount, text).err())
            {
                report.field(Field::Price, violation);
                draft.price = None;
            }
        }
        if let Some(date) = draft.published_date {
            if let Some(violation) = policy
                .published_date
                .iter()
                .find_map(|rule| rule.check(date, today).err())
            {
                report.field(Field::PublishedDate, violation);
                draft.published_date = None;
            }
        }

        let mut record = match merge(draft, target, &mut report) {
            Some(record) if report.is_empty() => record,
            _ => return Err(self.reject(policy, exclude, report)),
        };

        for rule in &policy.record {
            self.check_record(rule, &record, exclude, today, &mut report)
                .await?;
        }
        if !report.is_empty() {
            return Err(self.reject(policy, exclude, report));
        }

        record.price = record.price.with_scale(2);
        tracing::debug!(policy = %policy.name, book_id = ?exclude, "candidate accepted");
        Ok(record)
    }

    fn reject(
        &self,
        policy: &Policy,
        exclude: Option<BookId>,
        report: ValidationReport,
    ) -> EngineError {
        tracing::debug!(
            policy = %policy.name,
            book_id = ?exclude,
            issues = report.len(),
            "candidate rejected"
        );
        EngineError::Rejected(report)
    }

    /// Run text rules in order, stopping at the first failure. Returns the
    /// normalized value, or `None` when a rule failed.
    async fn check_text(
        &self,
        rules: &[TextRule],
        field: Field,
        mut value: String,
        exclude: Option<BookId>,
        report: &mut ValidationReport,
    ) -> Result<Option<String>, StoreError> {
        for rule in rules {
            match rule {
                TextRule::TitleCase => value = normalize::title_case(&value),
                TextRule::Unique => {
                    let filter = Filter::eq(field, value.clone());
                    if self.store.exists_where(&filter, exclude).await? {
                        report.field(field, Violation::Duplicate { field });
                        return Ok(None);
                    }
                }
                pure => {
                    if let Err(violation) = pure.check(&value) {
                        report.field(field, violation);
                        return Ok(None);
                    }
                }
            }
        }
        Ok(Some(value))
    }

    async fn check_record(
        &self,
        rule: &RecordRule,
        record: &BookRecord,
        exclude: Option<BookId>,
        today: NaiveDate,
        report: &mut ValidationReport,
    ) -> Result<(), StoreError> {
        match rule {
            RecordRule::UniqueTitleAuthor => {
                let filter = Filter::eq(Field::Title, record.title.clone())
                    .and(Field::Author, record.author.clone());
                if self.store.exists_where(&filter, exclude).await? {
                    report.non_field(Violation::DuplicateTitleAuthor);
                }
            }
            RecordRule::UniqueCoverImage => {
                if let Some(cover) = &record.cover_image {
                    let filter = Filter::eq(Field::CoverImage, cover.clone());
                    if self.store.exists_where(&filter, exclude).await? {
                        report.field(
                            Field::CoverImage,
                            Violation::Duplicate {
                                field: Field::CoverImage,
                            },
                        );
                    }
                }
            }
            RecordRule::SubtitleNotLongerThanTitle => {
                if let Err(violation) = rule.check(record, today) {
                    report.field(Field::Subtitle, violation);
                }
            }
            RecordRule::RecentPriceFloor { .. } => {
                if let Err(violation) = rule.check(record, today) {
                    report.field(Field::Price, violation);
                }
            }
        }
        Ok(())
    }
}

/// Fills unsubmitted fields from the stored record where the target allows it.
struct Merge<'a> {
    base: Option<&'a BookRecord>,
    resubmit_required: bool,
}

impl<'a> Merge<'a> {
    fn required<T>(
        &self,
        report: &mut ValidationReport,
        field: Field,
        submitted: Option<T>,
        stored: impl FnOnce(&BookRecord) -> T,
    ) -> Option<T> {
        if submitted.is_some() {
            return submitted;
        }
        let fallback = if self.resubmit_required {
            None
        } else {
            self.base.map(stored)
        };
        // Fields that failed to decode already carry their own issue.
        if fallback.is_none() && !report.has_field(field) {
            report.field(field, Violation::Required);
        }
        fallback
    }

    fn optional<T>(&self, submitted: Option<T>, stored: impl FnOnce(&BookRecord) -> T) -> Option<T> {
        submitted.or_else(|| self.base.map(stored))
    }
}

fn merge(draft: Draft, target: Target<'_>, report: &mut ValidationReport) -> Option<BookRecord> {
    let merge = Merge {
        base: target.existing().map(|book| &book.record),
        resubmit_required: !matches!(target, Target::Patch(_)),
    };

    let title = merge.required(report, Field::Title, draft.title, |r| r.title.clone());
    let author = merge.required(report, Field::Author, draft.author, |r| r.author.clone());
    let published_date =
        merge.required(report, Field::PublishedDate, draft.published_date, |r| {
            r.published_date
        });
    let isbn_number = merge.required(report, Field::IsbnNumber, draft.isbn_number, |r| {
        r.isbn_number.clone()
    });
    let pages = merge.required(report, Field::Pages, draft.pages, |r| r.pages);
    let language = merge.required(report, Field::Language, draft.language, |r| {
        r.language.clone()
    });
    let price = merge.required(
        report,
        Field::Price,
        draft.price.map(|price| price.amount),
        |r| r.price.clone(),
    );

    Some(BookRecord {
        title: title?,
        subtitle: merge.optional(draft.subtitle, |r| r.subtitle.clone()).flatten(),
        author: author?,
        published_date: published_date?,
        isbn_number: isbn_number?,
        pages: pages?,
        cover_image: merge
            .optional(draft.cover_image, |r| r.cover_image.clone())
            .flatten(),
        language: language?,
        price: price?,
        published: merge
            .optional(draft.published, |r| r.published)
            .unwrap_or(false),
    })
}
