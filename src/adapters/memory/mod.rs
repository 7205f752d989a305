//! In-process document store.
//!
//! Holds each collection in an `_id`-ordered map. Latency and outages can be
//! injected to exercise callers against a store that behaves like a remote one.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{batch_stream, resolve_insert_id};
use crate::domain::errors::{StoreError, StoreResult};
use crate::domain::models::{
    apply_pipeline, select, Document, Filter, ReplaceResult, Sort, Stage, ID_FIELD,
};
use crate::domain::ports::{DocumentCollection, DocumentStore, DocumentStream};

type Documents = BTreeMap<String, Document>;

#[derive(Debug, Default)]
struct Conditions {
    latency_micros: AtomicU64,
    offline: AtomicBool,
}

impl Conditions {
    /// Simulated network round trip.
    async fn round_trip(&self) -> StoreResult<()> {
        let micros = self.latency_micros.load(Ordering::Relaxed);
        if micros > 0 {
            tokio::time::sleep(Duration::from_micros(micros)).await;
        }
        if self.offline.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }
}

/// Document store kept entirely in memory. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<RwLock<HashMap<String, Arc<RwLock<Documents>>>>>,
    conditions: Arc<Conditions>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every operation by `latency` before it touches the data.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.set_latency(latency);
        self
    }

    pub fn set_latency(&self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.conditions.latency_micros.store(micros, Ordering::Relaxed);
    }

    /// While offline every operation fails with `StoreError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        debug!(offline, "memory store availability changed");
        self.conditions.offline.store(offline, Ordering::Relaxed);
    }

    /// Typed handle to a collection, creating it on first use.
    pub fn memory_collection(&self, name: &str) -> MemoryCollection {
        let docs = {
            let mut collections = write(&self.collections);
            Arc::clone(collections.entry(name.to_string()).or_default())
        };
        MemoryCollection {
            name: name.to_string(),
            docs,
            conditions: Arc::clone(&self.conditions),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn collection(&self, name: &str) -> Arc<dyn DocumentCollection> {
        Arc::new(self.memory_collection(name))
    }

    async fn collection_names(&self) -> StoreResult<Vec<String>> {
        self.conditions.round_trip().await?;
        let collections = read(&self.collections);
        let mut names: Vec<String> = collections
            .iter()
            .filter(|(_, docs)| !read(docs).is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}

/// One collection of a [`MemoryDocumentStore`].
#[derive(Debug, Clone)]
pub struct MemoryCollection {
    name: String,
    docs: Arc<RwLock<Documents>>,
    conditions: Arc<Conditions>,
}

impl MemoryCollection {
    fn snapshot(&self) -> Vec<Document> {
        read(&self.docs).values().cloned().collect()
    }
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn find(&self, filter: Filter, sort: Option<Sort>, limit: Option<usize>) -> DocumentStream {
        let this = self.clone();
        batch_stream(async move {
            this.conditions.round_trip().await?;
            Ok(select(this.snapshot(), &filter, sort.as_ref(), limit))
        })
    }

    async fn replace_one(
        &self,
        filter: Filter,
        mut doc: Document,
        upsert: bool,
    ) -> StoreResult<ReplaceResult> {
        self.conditions.round_trip().await?;
        let mut docs = write(&self.docs);

        let matched = docs
            .iter()
            .find(|(_, existing)| filter.matches(existing))
            .map(|(id, _)| id.clone());

        if let Some(id) = matched {
            doc.insert(ID_FIELD.to_string(), id.clone().into());
            let modified = docs.get(&id) != Some(&doc);
            docs.insert(id, doc);
            return Ok(ReplaceResult::matched(modified));
        }

        if !upsert {
            return Ok(ReplaceResult::unmatched());
        }

        let id = resolve_insert_id(&doc, Some(&filter));
        if docs.contains_key(&id) {
            return Err(StoreError::Query(format!(
                "duplicate _id {id} in collection {}",
                self.name
            )));
        }
        doc.insert(ID_FIELD.to_string(), id.clone().into());
        docs.insert(id.clone(), doc);
        Ok(ReplaceResult::upserted(id))
    }

    async fn insert_one(&self, mut doc: Document) -> StoreResult<String> {
        self.conditions.round_trip().await?;
        let id = resolve_insert_id(&doc, None);
        let mut docs = write(&self.docs);
        if docs.contains_key(&id) {
            return Err(StoreError::Query(format!(
                "duplicate _id {id} in collection {}",
                self.name
            )));
        }
        doc.insert(ID_FIELD.to_string(), id.clone().into());
        docs.insert(id.clone(), doc);
        Ok(id)
    }

    async fn find_one_and_delete(&self, filter: Filter) -> StoreResult<Option<Document>> {
        self.conditions.round_trip().await?;
        let mut docs = write(&self.docs);
        let target = docs
            .iter()
            .find(|(_, doc)| filter.matches(doc))
            .map(|(id, _)| id.clone());
        Ok(target.and_then(|id| docs.remove(&id)))
    }

    async fn count(&self, filter: Filter) -> StoreResult<u64> {
        self.conditions.round_trip().await?;
        let docs = read(&self.docs);
        Ok(docs.values().filter(|doc| filter.matches(doc)).count() as u64)
    }

    fn aggregate(&self, stages: Vec<Stage>) -> DocumentStream {
        let this = self.clone();
        batch_stream(async move {
            this.conditions.round_trip().await?;
            Ok(apply_pipeline(this.snapshot(), &stages))
        })
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_replace_upserts_with_filter_id() {
        let store = MemoryDocumentStore::new();
        let coll = store.collection("profiles");

        let result = coll
            .replace_one(Filter::id("k1"), doc(json!({"name": "a"})), true)
            .await
            .unwrap();
        assert_eq!(result.upserted_id.as_deref(), Some("k1"));

        let result = coll
            .replace_one(Filter::id("k1"), doc(json!({"name": "b"})), true)
            .await
            .unwrap();
        assert_eq!(result, ReplaceResult::matched(true));

        let all: Vec<Document> = coll.find(Filter::All, None, None).try_collect().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0]["name"], json!("b"));
        assert_eq!(all[0]["_id"], json!("k1"));
    }

    #[tokio::test]
    async fn test_replace_without_upsert_leaves_store_untouched() {
        let store = MemoryDocumentStore::new();
        let coll = store.collection("profiles");
        let result = coll
            .replace_one(Filter::id("missing"), doc(json!({"x": 1})), false)
            .await
            .unwrap();
        assert!(!result.is_applied());
        assert_eq!(coll.count(Filter::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_streams_are_cold() {
        let store = MemoryDocumentStore::new();
        let coll = store.collection("c");
        let stream = coll.find(Filter::All, None, None);

        coll.insert_one(doc(json!({"_id": "a"}))).await.unwrap();

        let seen: Vec<Document> = stream.try_collect().await.unwrap();
        assert_eq!(seen.len(), 1);
    }

    #[tokio::test]
    async fn test_offline_store_is_unavailable() {
        let store = MemoryDocumentStore::new();
        let coll = store.collection("c");
        store.set_offline(true);
        let err = coll.count(Filter::All).await.unwrap_err();
        assert!(err.is_transport());

        let items: Vec<StoreResult<Document>> =
            futures::StreamExt::collect(coll.find(Filter::All, None, None)).await;
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = MemoryDocumentStore::new();
        let coll = store.collection("c");
        coll.insert_one(doc(json!({"_id": "a"}))).await.unwrap();
        assert!(coll.insert_one(doc(json!({"_id": "a"}))).await.is_err());
    }

    #[tokio::test]
    async fn test_find_one_and_delete_returns_document() {
        let store = MemoryDocumentStore::new();
        let coll = store.collection("c");
        coll.insert_one(doc(json!({"_id": "a", "v": 1}))).await.unwrap();

        let removed = coll.find_one_and_delete(Filter::eq("v", 1)).await.unwrap();
        assert_eq!(removed.unwrap()["_id"], json!("a"));
        assert!(coll.find_one_and_delete(Filter::All).await.unwrap().is_none());
        assert!(store.collection_names().await.unwrap().is_empty());
    }
}
