//! Storage backends implementing [`DocumentStore`](crate::core::store::DocumentStore)

pub mod in_memory;

pub use in_memory::InMemoryDocumentStore;
