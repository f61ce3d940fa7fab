#![recursion_limit = "256"]
//! Libris application library
//!
//! The book catalog module and the bootstrap that serves it over HTTP.

pub mod modules;

use std::future::Future;

use anyhow::Context;
use libris_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Build the registry, run the module lifecycle and serve until Ctrl-C.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, &settings).context("failed to register modules")?;

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    let served = libris_http::start_server(&registry, &settings, shutdown_signal()).await;

    registry.stop_modules().await?;
    served
}

async fn shutdown_signal() {
    wait_for_signal(tokio::signal::ctrl_c()).await
}

async fn wait_for_signal(signal: impl Future<Output = std::io::Result<()>>) {
    if let Err(err) = signal.await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        // Without a signal handler the server runs until the process is killed.
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::{
        service::CatalogService, store::InMemoryBookStore, validation::FixedClock, BooksModule,
    };
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use std::{sync::Arc, time::Duration};
    use tower::ServiceExt;

    fn app() -> axum::Router {
        let settings = Settings::default();
        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &settings).unwrap();
        libris_http::build_router(&registry, &settings)
    }

    /// Same mounting as [`app`], with date rules evaluated on a fixed day.
    fn app_on(today: NaiveDate) -> axum::Router {
        let settings = Settings::default();
        let catalog = CatalogService::from_settings(
            Arc::new(InMemoryBookStore::new()),
            Arc::new(FixedClock(today)),
            &settings.catalog,
        )
        .unwrap();
        let mut registry = ModuleRegistry::new();
        registry
            .register(Arc::new(BooksModule::new(Arc::new(catalog))))
            .unwrap();
        libris_http::build_router(&registry, &settings)
    }

    #[tokio::test]
    async fn test_books_are_mounted_under_api_prefix() {
        let app = app_on(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        let book = json!({
            "title": "The Left Hand Of Darkness",
            "author": "Ursula Le Guin",
            "published_date": "1969-03-01",
            "isbn_number": "0-441-47812-3",
            "pages": 304,
            "language": "English",
            "price": "14.99",
        });
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/books")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(book.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().contains_key("x-request-id"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/books/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["isbn_number"], "0-441-47812-3");
    }

    #[tokio::test]
    async fn test_failed_signal_handler_keeps_serving() {
        let failed = async { Err(std::io::Error::other("no signal driver")) };
        let waited =
            tokio::time::timeout(Duration::from_millis(50), wait_for_signal(failed)).await;
        assert!(waited.is_err());

        let received = async { Ok(()) };
        assert!(
            tokio::time::timeout(Duration::from_millis(50), wait_for_signal(received))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_openapi_lists_book_routes() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let spec: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(spec["paths"]["/api/books/{id}"]["patch"].is_object());
        assert!(spec["components"]["schemas"]["Book"].is_object());
    }
}
