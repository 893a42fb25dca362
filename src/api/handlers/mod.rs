//! API request handlers.

/// Grounded question answering.
pub mod chat;
/// Liveness probe.
pub mod health;
/// Document ingestion.
pub mod ingest;
