//! Record codec: maps domain values to and from stored documents.
//!
//! Every store read and write goes through [`RecordCodec`]. Field-level rules
//! (identifier strings, wide integers, exclusion) are declared on the record
//! type with serde attributes and the helpers in [`fields`]; the
//! [`Record::post_process`] hook runs once after each decode.

pub mod fields;
mod key;

pub use key::DocumentKey;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::errors::{CodecError, CodecResult};
use crate::domain::models::document::{Document, ID_FIELD};

/// A value that can be stored as a document.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Finalize a freshly decoded value. Runs exactly once per decode.
    fn post_process(&mut self) -> CodecResult<()> {
        Ok(())
    }
}

/// Stateless encoder/decoder between records and documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordCodec;

impl RecordCodec {
    pub const fn new() -> Self {
        Self
    }

    /// Encode a value into a document.
    pub fn encode<V: Serialize>(&self, value: &V) -> CodecResult<Document> {
        match serde_json::to_value(value).map_err(|e| CodecError::Serialize(e.to_string()))? {
            Value::Object(doc) => Ok(doc),
            other => Err(CodecError::NotADocument(kind_of(&other))),
        }
    }

    /// Encode a value and stamp it with the given `_id`, overriding any field of that name.
    pub fn encode_with_id<V: Serialize>(&self, id: &str, value: &V) -> CodecResult<Document> {
        let mut doc = self.encode(value)?;
        doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        Ok(doc)
    }

    /// Decode a document and run the record's post-process hook.
    pub fn decode<V: Record>(&self, doc: Document) -> CodecResult<V> {
        let mut value: V = serde_json::from_value(Value::Object(doc))?;
        value.post_process().map_err(|e| match e {
            CodecError::PostProcess(_) => e,
            other => CodecError::PostProcess(other.to_string()),
        })?;
        Ok(value)
    }

    /// Decode each document independently, keeping per-element failures.
    pub fn decode_each<V: Record>(&self, docs: Vec<Document>) -> Vec<CodecResult<V>> {
        docs.into_iter().map(|doc| self.decode(doc)).collect()
    }

    /// Decode all documents, failing on the first bad one.
    pub fn decode_all<V: Record>(&self, docs: Vec<Document>) -> CodecResult<Vec<V>> {
        docs.into_iter().map(|doc| self.decode(doc)).collect()
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Encode an outbound request payload as compact JSON bytes.
pub fn to_payload<T: Serialize>(value: &T) -> CodecResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| CodecError::Serialize(e.to_string()))
}

/// Encode any serializable value as indented JSON, for display.
pub fn to_pretty_json<T: Serialize>(value: &T) -> CodecResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| CodecError::Serialize(e.to_string()))
}

/// Fluent builder for ad-hoc documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentBuilder {
    doc: Document,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.doc.insert(key.into(), Value::String(value.into()));
        self
    }

    pub fn number(mut self, key: impl Into<String>, value: impl Into<serde_json::Number>) -> Self {
        self.doc.insert(key.into(), Value::Number(value.into()));
        self
    }

    pub fn boolean(mut self, key: impl Into<String>, value: bool) -> Self {
        self.doc.insert(key.into(), Value::Bool(value));
        self
    }

    /// Identifiers use the same canonical string form as stored keys.
    pub fn uuid(mut self, key: impl Into<String>, value: Uuid) -> Self {
        self.doc
            .insert(key.into(), Value::String(value.hyphenated().to_string()));
        self
    }

    pub fn value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.doc.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Document {
        self.doc
    }

    pub fn build_string(self) -> String {
        Value::Object(self.doc).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        name: String,
        #[serde(default)]
        hits: u32,
        #[serde(skip)]
        scratch: Option<String>,
    }

    impl Record for Counter {
        fn post_process(&mut self) -> CodecResult<()> {
            if self.name.is_empty() {
                return Err(CodecError::PostProcess("empty name".to_string()));
            }
            self.hits += 1;
            Ok(())
        }
    }

    #[test]
    fn test_encode_with_id_overrides_field() {
        let codec = RecordCodec::new();
        let counter = Counter {
            name: "a".to_string(),
            hits: 1,
            scratch: Some("x".to_string()),
        };
        let doc = codec.encode_with_id("key-1", &counter).unwrap();
        assert_eq!(doc.get("_id"), Some(&json!("key-1")));
        assert!(!doc.contains_key("scratch"));
    }

    #[test]
    fn test_decode_runs_post_process_once() {
        let codec = RecordCodec::new();
        let doc = DocumentBuilder::new()
            .string("name", "a")
            .number("hits", 4)
            .build();
        let counter: Counter = codec.decode(doc).unwrap();
        assert_eq!(counter.hits, 5);
        assert_eq!(counter.scratch, None);
    }

    #[test]
    fn test_post_process_failure_is_reported() {
        let codec = RecordCodec::new();
        let doc = DocumentBuilder::new().string("name", "").build();
        let err = codec.decode::<Counter>(doc).unwrap_err();
        assert!(matches!(err, CodecError::PostProcess(_)));
    }

    #[test]
    fn test_encode_scalar_is_not_a_document() {
        let codec = RecordCodec::new();
        let err = codec.encode(&42).unwrap_err();
        assert!(matches!(err, CodecError::NotADocument("number")));
    }

    #[test]
    fn test_decode_each_isolates_failures() {
        let codec = RecordCodec::new();
        let docs = vec![
            DocumentBuilder::new().string("name", "ok").build(),
            DocumentBuilder::new().number("name", 3).build(),
            DocumentBuilder::new().string("name", "also").build(),
        ];
        let results = codec.decode_each::<Counter>(docs.clone());
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
        assert!(codec.decode_all::<Counter>(docs).is_err());
    }

    #[test]
    fn test_builder_string_output() {
        let id = Uuid::nil();
        let text = DocumentBuilder::new()
            .uuid("owner", id)
            .boolean("flag", true)
            .value("tags", json!(["a"]))
            .build_string();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["owner"], json!(id.to_string()));
        assert_eq!(parsed["flag"], json!(true));
        assert_eq!(parsed["tags"], json!(["a"]));
    }
}
