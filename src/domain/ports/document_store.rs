use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::domain::errors::StoreResult;
use crate::domain::models::{Document, Filter, ReplaceResult, Sort, Stage};

/// Cold stream of documents. Nothing runs until it is polled; each fresh
/// stream re-executes its query.
pub type DocumentStream = BoxStream<'static, StoreResult<Document>>;

/// A named collection of documents in a remote store.
///
/// All methods are lazy: futures do no I/O until awaited and streams do no
/// I/O until polled.
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Collection name
    fn name(&self) -> &str;

    /// Stream documents matching `filter`, optionally sorted and truncated.
    fn find(&self, filter: Filter, sort: Option<Sort>, limit: Option<usize>) -> DocumentStream;

    /// Replace the first document matching `filter`.
    ///
    /// With `upsert`, a missing document is inserted. The stored `_id` comes
    /// from the document, else from the filter's `_id` equality, else a new
    /// UUID is generated.
    async fn replace_one(
        &self,
        filter: Filter,
        doc: Document,
        upsert: bool,
    ) -> StoreResult<ReplaceResult>;

    /// Insert a new document and return its `_id`.
    ///
    /// # Errors
    /// Returns `StoreError::Query` if a document with the same `_id` exists.
    async fn insert_one(&self, doc: Document) -> StoreResult<String>;

    /// Delete the first document matching `filter`, returning it.
    async fn find_one_and_delete(&self, filter: Filter) -> StoreResult<Option<Document>>;

    async fn count(&self, filter: Filter) -> StoreResult<u64>;

    /// Run an aggregation pipeline over the collection.
    fn aggregate(&self, stages: Vec<Stage>) -> DocumentStream;
}

/// A document store handing out named collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn collection(&self, name: &str) -> Arc<dyn DocumentCollection>;

    /// Names of collections that currently hold documents
    async fn collection_names(&self) -> StoreResult<Vec<String>>;
}
