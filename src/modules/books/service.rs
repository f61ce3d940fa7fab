//! Catalog operations: validation plus persistence.

use std::sync::Arc;

use libris_kernel::settings::CatalogSettings;
use thiserror::Error;

use super::candidate::Candidate;
use super::models::{Book, BookId, CatalogStatistics, Field, Page};
use super::store::{BookStore, Filter, StoreError, UniqueIndex};
use super::validation::{
    policy::{Policies, Policy, UnknownPolicy},
    report::ValidationReport,
    violation::Violation,
    Clock, EngineError, Target, ValidationEngine,
};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("book {0} not found")]
    NotFound(BookId),

    #[error(transparent)]
    UnknownPolicy(#[from] UnknownPolicy),

    #[error("invalid page {0}")]
    InvalidPage(usize),

    #[error("book rejected with {} issue(s)", .0.len())]
    Rejected(ValidationReport),

    #[error(transparent)]
    Store(StoreError),
}

impl From<EngineError> for CatalogError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Rejected(report) => CatalogError::Rejected(report),
            EngineError::Store(err) => err.into(),
        }
    }
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { index } => {
                CatalogError::Rejected(conflict_report(index))
            }
            StoreError::NotFound { id } => CatalogError::NotFound(id),
            other => CatalogError::Store(other),
        }
    }
}

/// Report for a write that passed validation but hit a unique index.
fn conflict_report(index: UniqueIndex) -> ValidationReport {
    let mut report = ValidationReport::new();
    match index.fields {
        [field] => report.field(*field, Violation::Duplicate { field: *field }),
        _ => report.non_field(Violation::DuplicateTitleAuthor),
    }
    report
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Book catalog backed by a [`BookStore`].
#[derive(Debug)]
pub struct CatalogService {
    store: Arc<dyn BookStore>,
    engine: ValidationEngine,
    policies: Policies,
    page_size: usize,
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn BookStore>,
        clock: Arc<dyn Clock>,
        policies: Policies,
        page_size: usize,
    ) -> Self {
        let engine = ValidationEngine::new(store.clone(), clock);
        Self {
            store,
            engine,
            policies,
            page_size: page_size.max(1),
        }
    }

    pub fn from_settings(
        store: Arc<dyn BookStore>,
        clock: Arc<dyn Clock>,
        catalog: &CatalogSettings,
    ) -> Result<Self, UnknownPolicy> {
        let policies = Policies::from_settings(catalog)?;
        Ok(Self::new(store, clock, policies, catalog.page_size))
    }

    pub fn policies(&self) -> &Policies {
        &self.policies
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Validate with the default policy and store.
    pub async fn create(&self, candidate: &Candidate) -> CatalogResult<Book> {
        self.create_with(&self.policies.default_policy(), candidate)
            .await
    }

    /// Validate with the named policy and store.
    pub async fn create_with_policy(
        &self,
        name: &str,
        candidate: &Candidate,
    ) -> CatalogResult<Book> {
        let policy = self.policies.lookup(name)?;
        self.create_with(&policy, candidate).await
    }

    async fn create_with(&self, policy: &Policy, candidate: &Candidate) -> CatalogResult<Book> {
        let record = self
            .engine
            .validate(policy, candidate, Target::Create)
            .await?;
        let book = self.store.create(record).await?;
        tracing::info!(book_id = book.id, policy = %policy.name, "book created");
        Ok(book)
    }

    /// Full update. Required fields must all be submitted.
    pub async fn replace(&self, id: BookId, candidate: &Candidate) -> CatalogResult<Book> {
        let existing = self.get(id).await?;
        self.update_with(&existing, Target::Replace(&existing), candidate)
            .await
    }

    /// Partial update. Only submitted fields go through field rules.
    pub async fn patch(&self, id: BookId, candidate: &Candidate) -> CatalogResult<Book> {
        let existing = self.get(id).await?;
        self.update_with(&existing, Target::Patch(&existing), candidate)
            .await
    }

    async fn update_with(
        &self,
        existing: &Book,
        target: Target<'_>,
        candidate: &Candidate,
    ) -> CatalogResult<Book> {
        let policy = self.policies.default_policy();
        let record = self.engine.validate(&policy, candidate, target).await?;
        let book = self.store.update(existing.id, record).await?;
        tracing::info!(book_id = book.id, policy = %policy.name, "book updated");
        Ok(book)
    }

    pub async fn get(&self, id: BookId) -> CatalogResult<Book> {
        self.store
            .get(id)
            .await?
            .ok_or(CatalogError::NotFound(id))
    }

    /// One page of books ordered by id. Pages start at 1; the first page
    /// always exists, later ones only when they hold books.
    pub async fn list(&self, page: usize, published: Option<bool>) -> CatalogResult<Page<Book>> {
        if page == 0 {
            return Err(CatalogError::InvalidPage(page));
        }
        let filter = published.map_or_else(Filter::all, |flag| {
            Filter::eq(Field::Published, flag.to_string())
        });
        let offset = (page - 1).saturating_mul(self.page_size);
        let (count, results) = self.store.list(&filter, offset, self.page_size).await?;
        if page > 1 && offset >= count {
            return Err(CatalogError::InvalidPage(page));
        }
        Ok(Page {
            count,
            page,
            page_size: self.page_size,
            results,
        })
    }

    /// Every published book, unpaginated.
    pub async fn published(&self) -> CatalogResult<Vec<Book>> {
        let filter = Filter::eq(Field::Published, true.to_string());
        let (_, books) = self.store.list(&filter, 0, usize::MAX).await?;
        Ok(books)
    }

    pub async fn delete(&self, id: BookId) -> CatalogResult<()> {
        if !self.store.delete(id).await? {
            return Err(CatalogError::NotFound(id));
        }
        tracing::info!(book_id = id, "book deleted");
        Ok(())
    }

    pub async fn publish(&self, id: BookId) -> CatalogResult<Book> {
        self.set_published(id, true).await
    }

    pub async fn unpublish(&self, id: BookId) -> CatalogResult<Book> {
        self.set_published(id, false).await
    }

    // Flipping the flag touches no validated field.
    async fn set_published(&self, id: BookId, published: bool) -> CatalogResult<Book> {
        let mut book = self.get(id).await?;
        book.record.published = published;
        let book = self.store.update(id, book.record).await?;
        tracing::info!(book_id = id, published, "book publication changed");
        Ok(book)
    }

    pub async fn statistics(&self) -> CatalogResult<CatalogStatistics> {
        let (total_books, _) = self.store.list(&Filter::all(), 0, 0).await?;
        let (published_books, _) = self
            .store
            .list(&Filter::eq(Field::Published, true.to_string()), 0, 0)
            .await?;
        Ok(CatalogStatistics {
            total_books,
            published_books,
            unpublished_books: total_books - published_books,
        })
    }
}
