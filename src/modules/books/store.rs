//! Persistent book storage.
//!
//! The store enforces its own unique indexes on every write. Validation
//! checks uniqueness first for a friendly message, but two concurrent
//! requests can both pass that check; the index is what keeps the data
//! consistent.

use std::{collections::BTreeMap, fmt};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use super::models::{Book, BookId, BookRecord, Field};

/// Equality conjunction over book fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    terms: Vec<(Field, String)>,
}

impl Filter {
    /// Filter matching every book.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(field: Field, value: impl Into<String>) -> Self {
        Self::all().and(field, value)
    }

    pub fn and(mut self, field: Field, value: impl Into<String>) -> Self {
        self.terms.push((field, value.into()));
        self
    }

    pub fn matches(&self, record: &BookRecord) -> bool {
        self.terms
            .iter()
            .all(|(field, value)| record.field_text(*field).as_deref() == Some(value.as_str()))
    }
}

/// A storage-level uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniqueIndex {
    pub name: &'static str,
    pub fields: &'static [Field],
}

impl UniqueIndex {
    /// Filter selecting books that collide with `record` on this index.
    /// `None` when one of the indexed fields is unset.
    fn filter_for(&self, record: &BookRecord) -> Option<Filter> {
        self.fields.iter().try_fold(Filter::all(), |filter, field| {
            record
                .field_text(*field)
                .map(|value| filter.and(*field, value))
        })
    }
}

/// Unique indexes declared for the book table.
pub const BOOK_UNIQUE_INDEXES: &[UniqueIndex] = &[
    UniqueIndex {
        name: "book_isbn_number_unique",
        fields: &[Field::IsbnNumber],
    },
    UniqueIndex {
        name: "book_title_author_unique",
        fields: &[Field::Title, Field::Author],
    },
    UniqueIndex {
        name: "book_cover_image_unique",
        fields: &[Field::CoverImage],
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("unique index '{}' violated", .index.name)]
    UniqueViolation { index: UniqueIndex },

    #[error("book {id} not found")]
    NotFound { id: BookId },

    #[error("store unavailable: {message}")]
    Unavailable { message: String },
}

/// Book persistence used by the catalog.
#[async_trait]
pub trait BookStore: Send + Sync + fmt::Debug {
    /// Whether any book other than `exclude` matches `filter`.
    async fn exists_where(&self, filter: &Filter, exclude: Option<BookId>)
        -> Result<bool, StoreError>;

    async fn create(&self, record: BookRecord) -> Result<Book, StoreError>;

    async fn update(&self, id: BookId, record: BookRecord) -> Result<Book, StoreError>;

    async fn get(&self, id: BookId) -> Result<Option<Book>, StoreError>;

    /// Books matching `filter` ordered by id, plus the total match count.
    async fn list(
        &self,
        filter: &Filter,
        offset: usize,
        limit: usize,
    ) -> Result<(usize, Vec<Book>), StoreError>;

    /// Returns whether a book was removed.
    async fn delete(&self, id: BookId) -> Result<bool, StoreError>;
}

#[derive(Debug, Default)]
struct State {
    last_id: BookId,
    books: BTreeMap<BookId, Book>,
}

/// Process-local store guarded by an async read-write lock.
#[derive(Debug)]
pub struct InMemoryBookStore {
    state: RwLock<State>,
    indexes: &'static [UniqueIndex],
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            indexes: BOOK_UNIQUE_INDEXES,
        }
    }

    /// Insert books with their existing ids, enforcing the unique indexes.
    pub async fn seed(&self, books: Vec<Book>) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        for book in books {
            self.check_indexes(&state, &book.record, Some(book.id))?;
            state.last_id = state.last_id.max(book.id);
            state.books.insert(book.id, book);
        }
        Ok(())
    }

    fn check_indexes(
        &self,
        state: &State,
        record: &BookRecord,
        exclude: Option<BookId>,
    ) -> Result<(), StoreError> {
        for index in self.indexes {
            let Some(filter) = index.filter_for(record) else {
                continue;
            };
            let collides = state
                .books
                .values()
                .any(|book| Some(book.id) != exclude && filter.matches(&book.record));
            if collides {
                tracing::warn!(index = index.name, "unique index rejected write");
                return Err(StoreError::UniqueViolation { index: *index });
            }
        }
        Ok(())
    }
}

impl Default for InMemoryBookStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn exists_where(
        &self,
        filter: &Filter,
        exclude: Option<BookId>,
    ) -> Result<bool, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .books
            .values()
            .any(|book| Some(book.id) != exclude && filter.matches(&book.record)))
    }

    async fn create(&self, record: BookRecord) -> Result<Book, StoreError> {
        let mut state = self.state.write().await;
        self.check_indexes(&state, &record, None)?;
        state.last_id += 1;
        let book = Book {
            id: state.last_id,
            record,
        };
        state.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update(&self, id: BookId, record: BookRecord) -> Result<Book, StoreError> {
        let mut state = self.state.write().await;
        if !state.books.contains_key(&id) {
            return Err(StoreError::NotFound { id });
        }
        self.check_indexes(&state, &record, Some(id))?;
        let book = Book { id, record };
        state.books.insert(id, book.clone());
        Ok(book)
    }

    async fn get(&self, id: BookId) -> Result<Option<Book>, StoreError> {
        Ok(self.state.read().await.books.get(&id).cloned())
    }

    async fn list(
        &self,
        filter: &Filter,
        offset: usize,
        limit: usize,
    ) -> Result<(usize, Vec<Book>), StoreError> {
        let state = self.state.read().await;
        let matching: Vec<&Book> = state
            .books
            .values()
            .filter(|book| filter.matches(&book.record))
            .collect();
        let page = matching
            .iter()
            .skip(offset)
            .take(limit)
            .map(|book| (*book).clone())
            .collect();
        Ok((matching.len(), page))
    }

    async fn delete(&self, id: BookId) -> Result<bool, StoreError> {
        Ok(self.state.write().await.books.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn record(title: &str, isbn: &str) -> BookRecord {
        BookRecord {
            title: title.to_string(),
            subtitle: None,
            author: "Frank Herbert".to_string(),
            published_date: NaiveDate::from_ymd_opt(1965, 8, 1).unwrap(),
            isbn_number: isbn.to_string(),
            pages: 412,
            cover_image: None,
            language: "English".to_string(),
            price: BigDecimal::from(25u64),
            published: false,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let store = InMemoryBookStore::new();
        let first = store.create(record("Dune One", "9780441013593")).await.unwrap();
        let second = store.create(record("Dune Two", "9780441013594")).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.get(2).await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_exists_where_honours_exclusion() {
        let store = InMemoryBookStore::new();
        let book = store.create(record("Dune One", "9780441013593")).await.unwrap();
        let filter = Filter::eq(Field::IsbnNumber, "9780441013593");

        assert!(store.exists_where(&filter, None).await.unwrap());
        assert!(!store.exists_where(&filter, Some(book.id)).await.unwrap());
        assert!(!store
            .exists_where(&Filter::eq(Field::IsbnNumber, "0000000000"), None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_unique_indexes_back_up_validation() {
        let store = InMemoryBookStore::new();
        store.create(record("Dune One", "9780441013593")).await.unwrap();

        let err = store
            .create(record("Dune Two", "9780441013593"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::UniqueViolation {
                index: BOOK_UNIQUE_INDEXES[0]
            }
        );

        let err = store
            .create(record("Dune One", "9780441013594"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::UniqueViolation {
                index: BOOK_UNIQUE_INDEXES[1]
            }
        );
    }

    #[tokio::test]
    async fn test_unset_cover_images_never_collide() {
        let store = InMemoryBookStore::new();
        store.create(record("Dune One", "9780441013593")).await.unwrap();
        assert!(store.create(record("Dune Two", "9780441013594")).await.is_ok());

        let mut with_cover = record("Dune Three", "9780441013595");
        with_cover.cover_image = Some("https://covers.example.com/dune.jpg".to_string());
        store.create(with_cover.clone()).await.unwrap();

        with_cover.title = "Dune Four".to_string();
        with_cover.isbn_number = "9780441013596".to_string();
        assert!(matches!(
            store.create(with_cover).await,
            Err(StoreError::UniqueViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_own_values() {
        let store = InMemoryBookStore::new();
        let book = store.create(record("Dune One", "9780441013593")).await.unwrap();
        let mut changed = book.record.clone();
        changed.pages = 500;
        let updated = store.update(book.id, changed).await.unwrap();
        assert_eq!(updated.record.pages, 500);

        assert_eq!(
            store.update(42, book.record).await,
            Err(StoreError::NotFound { id: 42 })
        );
    }

    #[tokio::test]
    async fn test_list_filters_and_pages() {
        let store = InMemoryBookStore::new();
        for n in 0..5u64 {
            let mut book = record(&format!("Dune Part {n}"), &format!("978044101359{n}"));
            book.published = n % 2 == 0;
            store.create(book).await.unwrap();
        }

        let (count, page) = store.list(&Filter::all(), 2, 2).await.unwrap();
        assert_eq!(count, 5);
        assert_eq!(page.iter().map(|b| b.id).collect::<Vec<_>>(), vec![3, 4]);

        let (count, page) = store
            .list(&Filter::eq(Field::Published, "true"), 0, 10)
            .await
            .unwrap();
        assert_eq!(count, 3);
        assert!(page.iter().all(|b| b.record.published));
    }

    #[tokio::test]
    async fn test_seed_keeps_ids_and_advances_sequence() {
        let store = InMemoryBookStore::new();
        store
            .seed(vec![Book {
                id: 10,
                record: record("Dune One", "9780441013593"),
            }])
            .await
            .unwrap();
        let next = store.create(record("Dune Two", "9780441013594")).await.unwrap();
        assert_eq!(next.id, 11);
        assert!(store.delete(10).await.unwrap());
        assert!(!store.delete(10).await.unwrap());
    }
}
