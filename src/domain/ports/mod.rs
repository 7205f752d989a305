//! Port trait definitions (Hexagonal Architecture)
//!
//! - `DocumentStore`: hands out named collections
//! - `DocumentCollection`: lazy document operations against one collection
//!
//! The memory and SQLite adapters implement these; the typed store client and
//! the cached repositories depend only on the traits.

pub mod document_store;

pub use document_store::{DocumentCollection, DocumentStore, DocumentStream};
