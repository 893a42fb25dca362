//! HTTP API Handlers and Routes
//!
//! This module provides the REST API layer for Jarvis, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `POST /chat` - Answer a question from the knowledge base
//! - `POST /ingest` - Chunk, embed and store a document
//! - `GET /api-docs/openapi.json` - OpenAPI document
//!
//! There is no authentication; CORS allows any origin.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

pub use routes::{create_router, ApiDoc};
