pub mod candidate;
pub mod models;
pub mod routes;
pub mod service;
pub mod store;
pub mod validation;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::Router;
use libris_kernel::{settings::Settings, InitCtx, Module};
use serde_json::{json, Value};

use service::CatalogService;
use store::InMemoryBookStore;
use validation::SystemClock;

/// Book catalog module: CRUD, publication and policy-driven validation.
pub struct BooksModule {
    catalog: Arc<CatalogService>,
}

impl BooksModule {
    pub fn new(catalog: Arc<CatalogService>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<CatalogService> {
        &self.catalog
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            policy = %self.catalog.policies().default_name(),
            page_size = self.catalog.page_size(),
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.catalog.clone())
    }

    fn openapi(&self) -> Option<Value> {
        Some(openapi())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Build the books module over a fresh in-memory store.
pub fn create_module(settings: &Settings) -> anyhow::Result<Arc<dyn Module>> {
    let catalog = CatalogService::from_settings(
        Arc::new(InMemoryBookStore::new()),
        Arc::new(SystemClock),
        &settings.catalog,
    )
    .context("invalid catalog settings")?;
    Ok(Arc::new(BooksModule::new(Arc::new(catalog))))
}

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn json_response(description: &str, schema: Value) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } }
    })
}

fn book_body() -> Value {
    json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/BookInput" }
            }
        }
    })
}

fn id_param() -> Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int64" }
    })
}

fn openapi() -> Value {
    let book = json!({ "$ref": "#/components/schemas/Book" });
    let rejected = error_response("Validation failed; `fields` maps field names to messages");
    let conflict = error_response("Every issue is a uniqueness conflict");
    let missing = error_response("Book not found");
    let bad_request = error_response("Malformed request");

    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "parameters": [
                        { "name": "page", "in": "query", "schema": { "type": "integer", "minimum": 1 } },
                        { "name": "published", "in": "query", "schema": { "type": "boolean" } }
                    ],
                    "responses": {
                        "200": json_response("One page of books", json!({ "$ref": "#/components/schemas/BookPage" })),
                        "404": error_response("Invalid page")
                    }
                },
                "post": {
                    "summary": "Create a book with the default policy",
                    "tags": ["Books"],
                    "requestBody": book_body(),
                    "responses": {
                        "201": json_response("Created book", book.clone()),
                        "400": bad_request.clone(),
                        "409": conflict.clone(),
                        "422": rejected.clone()
                    }
                }
            },
            "/{id}": {
                "parameters": [id_param()],
                "get": {
                    "summary": "Fetch a book",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response("Book", book.clone()),
                        "404": missing.clone()
                    }
                },
                "put": {
                    "summary": "Replace a book",
                    "tags": ["Books"],
                    "requestBody": book_body(),
                    "responses": {
                        "200": json_response("Updated book", book.clone()),
                        "400": bad_request.clone(),
                        "404": missing.clone(),
                        "409": conflict.clone(),
                        "422": rejected.clone()
                    }
                },
                "patch": {
                    "summary": "Update some fields of a book",
                    "tags": ["Books"],
                    "requestBody": book_body(),
                    "responses": {
                        "200": json_response("Updated book", book.clone()),
                        "400": bad_request.clone(),
                        "404": missing.clone(),
                        "409": conflict.clone(),
                        "422": rejected.clone()
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "responses": {
                        "204": { "description": "Deleted" },
                        "404": missing.clone()
                    }
                }
            },
            "/{id}/publish": {
                "parameters": [id_param()],
                "post": {
                    "summary": "Mark a book as published",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response("Published book", book.clone()),
                        "404": missing.clone()
                    }
                }
            },
            "/{id}/unpublish": {
                "parameters": [id_param()],
                "post": {
                    "summary": "Mark a book as unpublished",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response("Unpublished book", book.clone()),
                        "404": missing
                    }
                }
            },
            "/published": {
                "get": {
                    "summary": "All published books",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response("Published books", json!({ "type": "array", "items": book.clone() }))
                    }
                }
            },
            "/statistics": {
                "get": {
                    "summary": "Catalog counts",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response("Counts", json!({ "$ref": "#/components/schemas/CatalogStatistics" }))
                    }
                }
            },
            "/policies": {
                "get": {
                    "summary": "Validation policies and their rules",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response("Policies", json!({ "type": "object" }))
                    }
                }
            },
            "/policies/{name}": {
                "post": {
                    "summary": "Create a book with a named policy",
                    "tags": ["Books"],
                    "parameters": [
                        { "name": "name", "in": "path", "required": true, "schema": { "type": "string" } }
                    ],
                    "requestBody": book_body(),
                    "responses": {
                        "201": json_response("Created book", book),
                        "400": error_response("Malformed request or unknown policy"),
                        "409": conflict,
                        "422": rejected
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": "Books health check",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": { "text/plain": { "schema": { "type": "string" } } }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "BookInput": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "maxLength": 200 },
                        "subtitle": { "type": "string", "maxLength": 200, "nullable": true },
                        "author": { "type": "string", "maxLength": 100 },
                        "published_date": { "type": "string", "format": "date" },
                        "isbn_number": { "type": "string", "maxLength": 17 },
                        "pages": { "type": "integer", "format": "int32" },
                        "cover_image": { "type": "string", "format": "uri", "maxLength": 200, "nullable": true },
                        "language": { "type": "string", "maxLength": 30 },
                        "price": { "type": "string", "description": "Decimal with at most 2 places" },
                        "published": { "type": "boolean" }
                    },
                    "required": ["title", "author", "published_date", "isbn_number", "pages", "language", "price"]
                },
                "Book": {
                    "allOf": [
                        { "$ref": "#/components/schemas/BookInput" },
                        {
                            "type": "object",
                            "properties": { "id": { "type": "integer", "format": "int64" } },
                            "required": ["id"]
                        }
                    ]
                },
                "BookPage": {
                    "type": "object",
                    "properties": {
                        "count": { "type": "integer" },
                        "page": { "type": "integer" },
                        "page_size": { "type": "integer" },
                        "results": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } }
                    },
                    "required": ["count", "page", "page_size", "results"]
                },
                "CatalogStatistics": {
                    "type": "object",
                    "properties": {
                        "total_books": { "type": "integer" },
                        "published_books": { "type": "integer" },
                        "unpublished_books": { "type": "integer" }
                    },
                    "required": ["total_books", "published_books", "unpublished_books"]
                }
            }
        }
    })
}
