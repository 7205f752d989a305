//! SQLite adapter for the document store.

pub mod connection;
pub mod document_store;
pub mod migrations;

pub use connection::{create_pool, create_test_pool, ConnectionError, DatabaseLocation, PoolConfig};
pub use document_store::{SqliteCollection, SqliteDocumentStore};
pub use migrations::{applied_version, latest_version, migrate};

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}
