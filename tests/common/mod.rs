//! Common test utilities for integration tests
//!
//! Shared fixtures, record types and helpers used across the integration
//! test files.

#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tether::adapters::SqliteDocumentStore;
use tether::codec::Record;
use tether::repository::ListRecord;

/// Create a temporary directory for test isolation
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Path to a not-yet-created `SQLite` database inside a temp dir.
pub fn temp_db_path() -> (TempDir, PathBuf) {
    let dir = temp_dir();
    let db_path = dir.path().join("nested").join("test.db");
    (dir, db_path)
}

/// `sqlite:` URL for a file database in a fresh temp dir.
pub fn temp_db_url() -> (TempDir, String) {
    let (dir, path) = temp_db_path();
    (dir, format!("sqlite:{}", path.display()))
}

pub async fn sqlite_store() -> SqliteDocumentStore {
    SqliteDocumentStore::in_memory()
        .await
        .expect("Failed to open in-memory store")
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Poll `predicate` every 10ms until it holds or `timeout_ms` elapses.
pub async fn wait_for<F>(mut predicate: F, timeout_ms: u64) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = Duration::from_millis(timeout_ms);

    while start.elapsed() < timeout {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    predicate()
}

/// A kill-feed entry: many entries share a killer, so it has no unique key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillEntry {
    pub killer: String,
    pub victim: String,
    pub at: i64,
}

impl KillEntry {
    pub fn new(killer: &str, victim: &str, at: i64) -> Self {
        Self {
            killer: killer.to_string(),
            victim: victim.to_string(),
            at,
        }
    }
}

impl Record for KillEntry {}

impl ListRecord<String> for KillEntry {
    fn matches_key(&self, key: &String) -> bool {
        &self.killer == key
    }
}

/// Keyed record used by the repository tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub owner: String,
    pub coins: i64,
    /// Session-only cache field
    #[serde(skip)]
    pub pending: Option<i64>,
}

impl Balance {
    pub fn new(owner: &str, coins: i64) -> Self {
        Self {
            owner: owner.to_string(),
            coins,
            pending: None,
        }
    }
}

impl Record for Balance {}
