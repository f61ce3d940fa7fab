//! HTTP handlers for the books module, mounted under `/api/books`.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use libris_http::error::AppError;
use serde::Deserialize;
use serde_json::{json, Value};

use super::candidate::Candidate;
use super::models::{Book, BookId, CatalogStatistics, Page};
use super::service::{CatalogError, CatalogService};
use super::validation::report::ValidationReport;

type Catalog = State<Arc<CatalogService>>;

/// Routes of the books module with the catalog attached as state.
pub fn router(catalog: Arc<CatalogService>) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/published", get(published_books))
        .route("/statistics", get(statistics))
        .route("/policies", get(list_policies))
        .route("/policies/{name}", post(create_with_policy))
        .route("/health", get(health_check))
        .route(
            "/{id}",
            get(get_book)
                .put(replace_book)
                .patch(patch_book)
                .delete(delete_book),
        )
        .route("/{id}/publish", post(publish_book))
        .route("/{id}/unpublish", post(unpublish_book))
        .with_state(catalog)
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(id) => AppError::not_found(format!("book {id} not found")),
            CatalogError::InvalidPage(_) => AppError::not_found("Invalid page."),
            CatalogError::UnknownPolicy(err) => AppError::bad_request(err.to_string()),
            CatalogError::Rejected(report) => rejection(&report),
            CatalogError::Store(err) => AppError::Internal(err.into()),
        }
    }
}

/// 409 when the only problems are uniqueness conflicts, 422 otherwise.
fn rejection(report: &ValidationReport) -> AppError {
    let fields = serde_json::to_value(report).unwrap_or_default();
    let error = if report.only_conflicts() {
        AppError::conflict(report.details(), "Book conflicts with an existing book")
    } else {
        AppError::validation(report.details(), "Book failed validation")
    };
    error.with_fields(fields)
}

fn candidate(payload: Result<Json<Value>, JsonRejection>) -> Result<Candidate, AppError> {
    let Json(value) = payload?;
    Candidate::from_value(value).map_err(|err| AppError::bad_request(err.to_string()))
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    page: Option<usize>,
    published: Option<bool>,
}

async fn list_books(
    State(catalog): Catalog,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Page<Book>>, AppError> {
    let Query(params) = params?;
    let page = catalog
        .list(params.page.unwrap_or(1), params.published)
        .await?;
    Ok(Json(page))
}

async fn create_book(
    State(catalog): Catalog,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let book = catalog.create(&candidate(payload)?).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn get_book(
    State(catalog): Catalog,
    id: Result<Path<BookId>, PathRejection>,
) -> Result<Json<Book>, AppError> {
    let Path(id) = id?;
    Ok(Json(catalog.get(id).await?))
}

async fn replace_book(
    State(catalog): Catalog,
    id: Result<Path<BookId>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let Path(id) = id?;
    Ok(Json(catalog.replace(id, &candidate(payload)?).await?))
}

async fn patch_book(
    State(catalog): Catalog,
    id: Result<Path<BookId>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let Path(id) = id?;
    Ok(Json(catalog.patch(id, &candidate(payload)?).await?))
}

async fn delete_book(
    State(catalog): Catalog,
    id: Result<Path<BookId>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    catalog.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn published_books(State(catalog): Catalog) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(catalog.published().await?))
}

async fn statistics(State(catalog): Catalog) -> Result<Json<CatalogStatistics>, AppError> {
    Ok(Json(catalog.statistics().await?))
}

async fn publish_book(
    State(catalog): Catalog,
    id: Result<Path<BookId>, PathRejection>,
) -> Result<Json<Book>, AppError> {
    let Path(id) = id?;
    Ok(Json(catalog.publish(id).await?))
}

async fn unpublish_book(
    State(catalog): Catalog,
    id: Result<Path<BookId>, PathRejection>,
) -> Result<Json<Book>, AppError> {
    let Path(id) = id?;
    Ok(Json(catalog.unpublish(id).await?))
}

async fn list_policies(State(catalog): Catalog) -> Json<Value> {
    let policies = catalog.policies();
    Json(json!({
        "default": policies.default_name().as_str(),
        "policies": policies.summaries(),
    }))
}

async fn create_with_policy(
    State(catalog): Catalog,
    Path(name): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let book = catalog
        .create_with_policy(&name, &candidate(payload)?)
        .await?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn health_check() -> &'static str {
    "books module is healthy"
}
