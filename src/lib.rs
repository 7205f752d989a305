//! Tether - cached repositories over async document stores
//!
//! Two independent pieces of infrastructure:
//!
//! - **Cached repositories** (`repository`): write-through caches in front of a
//!   remote document store, reached through the typed `store::Collection` client
//!   and the `codec` that maps records to documents.
//! - **Resilient API client** (`infrastructure::openrouter`): an `OpenRouter`
//!   chat-completion client with header injection, retries with backoff and
//!   structured error decoding.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): documents, queries, errors and the store ports
//! - **Adapters** (`adapters`): in-memory and `SQLite` document stores
//! - **Infrastructure Layer** (`infrastructure`): config, logging, API client
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use tether::adapters::SqliteDocumentStore;
//! use tether::repository::ProfileRepository;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = SqliteDocumentStore::connect("sqlite:tether.db", None).await?;
//!     let profiles = ProfileRepository::open(&store);
//!     let enabled = profiles.toggle_pvp(uuid::Uuid::new_v4()).await?;
//!     println!("pvp: {enabled}");
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod codec;
pub mod domain;
pub mod infrastructure;
pub mod repository;
pub mod store;

pub use codec::{DocumentKey, Record, RecordCodec};
pub use domain::errors::{CodecError, StoreError, StoreResult};
pub use domain::models::{Config, Document, Filter, Profile};
pub use domain::ports::{DocumentCollection, DocumentStore};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::openrouter::{ApiError, OpenRouterClient, RetryPolicy};
pub use repository::{CachedKeyedRepository, CachedListRepository, ProfileRepository};
pub use store::Collection;
