//! Resource Metadata Store - persistence for metadata records
//!
//! This crate owns the uniqueness and query semantics of metadata records:
//! scoping and membership filters, weighted text search, relevance sort and
//! limits. Two backends share those semantics through [`query::execute`]:
//! an in-memory store and a persistent redb store.

pub mod error;
pub mod memory;
pub mod query;
pub mod redb_store;
pub mod store;
mod tables;
pub mod text;

// Re-exports
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use query::{MetadataFilter, MetadataQuery, SortDirection, SortField, SortKey};
pub use redb_store::RedbStore;
pub use store::MetadataStore;
pub use text::TextQuery;
