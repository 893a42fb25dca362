//! Vector stores.
//!
//! Storage and nearest-neighbour search are delegated to an external index;
//! this module only holds the client side:
//! - `pinecone` - Managed cloud service (production)
//! - `memory` - In-process cosine scan (development and tests)

// Vector store abstraction layer
pub mod vectorstore;

// Provider implementations
pub mod pinecone;

// Re-exports
pub use pinecone::{PineconeSettings, PineconeStore};
pub use vectorstore::{InMemoryVectorStore, VectorStore, VectorStoreProvider};
