//! Structured document representation shared by the codec and the stores.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored document: a JSON object tree keyed by field name.
pub type Document = serde_json::Map<String, Value>;

/// Primary key field of every stored document.
pub const ID_FIELD: &str = "_id";

/// Returns the document's `_id` when it is a string.
pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

/// Resolve a dot-separated field path (`stats.kills`) inside a document.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut current = doc.get(first)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Outcome of a replace operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceResult {
    /// Number of documents the filter matched (0 or 1).
    pub matched_count: u64,
    /// Number of documents whose body actually changed.
    pub modified_count: u64,
    /// Id of the inserted document when the replace turned into an insert.
    pub upserted_id: Option<String>,
}

impl ReplaceResult {
    pub fn matched(modified: bool) -> Self {
        Self {
            matched_count: 1,
            modified_count: u64::from(modified),
            upserted_id: None,
        }
    }

    pub fn upserted(id: impl Into<String>) -> Self {
        Self {
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some(id.into()),
        }
    }

    pub fn unmatched() -> Self {
        Self::default()
    }

    /// True when the store now holds the written document.
    pub fn is_applied(&self) -> bool {
        self.matched_count > 0 || self.upserted_id.is_some()
    }
}
