//! Where the document database lives and how to pool connections to it.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::debug;

use crate::domain::models::DatabaseConfig;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Invalid database URL {url}: {reason}")]
    InvalidDatabaseUrl { url: String, reason: &'static str },
    #[error("Failed to create database directory {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to open document database: {0}")]
    PoolCreationFailed(#[source] sqlx::Error),
}

/// Parsed form of a `sqlite:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// `sqlite::memory:`
    Memory,
    /// `sqlite:<path>` or `sqlite://<path>`, query string dropped
    File(PathBuf),
}

impl DatabaseLocation {
    /// Parse a database URL. Only the `sqlite:` scheme is accepted.
    pub fn parse(url: &str) -> Result<Self, ConnectionError> {
        let invalid = |reason| ConnectionError::InvalidDatabaseUrl {
            url: url.to_string(),
            reason,
        };

        let rest = url
            .strip_prefix("sqlite:")
            .ok_or_else(|| invalid("expected a sqlite: URL"))?;
        let rest = rest.strip_prefix("//").unwrap_or(rest);
        let path = rest.split('?').next().unwrap_or_default();

        match path {
            ":memory:" => Ok(Self::Memory),
            "" => Err(invalid("missing database path")),
            path => Ok(Self::File(PathBuf::from(path))),
        }
    }

    /// Create the parent directory of a file database if it is missing.
    fn prepare(&self) -> Result<(), ConnectionError> {
        let Self::File(path) = self else {
            return Ok(());
        };
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
                std::fs::create_dir_all(parent).map_err(|source| {
                    ConnectionError::DirectoryCreationFailed {
                        path: parent.to_path_buf(),
                        source,
                    }
                })
            }
            _ => Ok(()),
        }
    }

    fn connect_options(&self) -> Result<SqliteConnectOptions, ConnectionError> {
        match self {
            Self::Memory => SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(ConnectionError::PoolCreationFailed),
            Self::File(path) => Ok(file_options(path)),
        }
    }
}

fn file_options(path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(30))
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(3),
        }
    }
}

impl From<&DatabaseConfig> for PoolConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_connections: config.max_connections.max(1),
            ..Self::default()
        }
    }
}

/// Open a pool on `database_url`, creating the file and its directory as needed.
///
/// An in-memory URL gets a single connection that is never recycled, since
/// every connection to `:memory:` sees its own database.
pub async fn create_pool(
    database_url: &str,
    config: Option<PoolConfig>,
) -> Result<SqlitePool, ConnectionError> {
    let location = DatabaseLocation::parse(database_url)?;
    location.prepare()?;

    let config = config.unwrap_or_default();
    let options = SqlitePoolOptions::new().acquire_timeout(config.acquire_timeout);
    let options = match location {
        DatabaseLocation::Memory => options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None),
        DatabaseLocation::File(_) => options
            .max_connections(config.max_connections)
            .min_connections(config.min_connections.min(config.max_connections)),
    };
    debug!(?location, "opening document database");

    options
        .connect_with(location.connect_options()?)
        .await
        .map_err(ConnectionError::PoolCreationFailed)
}

/// Single-connection in-memory pool for tests.
pub async fn create_test_pool() -> Result<SqlitePool, ConnectionError> {
    create_pool("sqlite::memory:", None).await
}
