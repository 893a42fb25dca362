//! LLM client implementations.
//!
//! - [`client`] - the [`LLMClient`] trait and [`Provider`] selection
//! - `ollama` - Ollama generate API client (`ollama` feature)

pub mod client;

#[cfg(feature = "ollama")]
pub mod ollama;

pub use client::{LLMClient, Provider};
