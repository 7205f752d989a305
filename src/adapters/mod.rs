//! Document store adapters.

pub mod memory;
pub mod sqlite;

use std::future::Future;

use futures::stream::{self, StreamExt};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::errors::StoreResult;
use crate::domain::models::{Document, Filter, ID_FIELD};
use crate::domain::ports::DocumentStream;

pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

/// Turn a lazily fetched batch into a cold document stream.
///
/// A failed fetch yields a single `Err` item.
pub(crate) fn batch_stream<F>(fetch: F) -> DocumentStream
where
    F: Future<Output = StoreResult<Vec<Document>>> + Send + 'static,
{
    row_stream(async move { Ok(fetch.await?.into_iter().map(Ok).collect()) })
}

/// Like [`batch_stream`], for backends that decode each row on its own.
///
/// Every row becomes one item, so a bad row fails alone. A failed fetch
/// yields a single `Err` item that is not record-level.
pub(crate) fn row_stream<F>(fetch: F) -> DocumentStream
where
    F: Future<Output = StoreResult<Vec<StoreResult<Document>>>> + Send + 'static,
{
    stream::once(fetch)
        .flat_map(|result| {
            let items = match result {
                Ok(rows) => rows,
                Err(e) => vec![Err(e)],
            };
            stream::iter(items)
        })
        .boxed()
}

/// `_id` for a document about to be inserted: its own `_id`, else the
/// filter's `_id` equality, else a fresh UUID.
pub(crate) fn resolve_insert_id(doc: &Document, filter: Option<&Filter>) -> String {
    match doc.get(ID_FIELD) {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Null) | None => filter
            .and_then(Filter::id_equality)
            .map_or_else(|| Uuid::new_v4().to_string(), str::to_string),
        Some(other) => other.to_string(),
    }
}
