//! Typed client over a remote document collection.
//!
//! [`Collection`] pairs a [`DocumentCollection`] with the [`RecordCodec`], so
//! callers read and write domain values instead of raw documents. Every method
//! is lazy: nothing reaches the store until the returned future is awaited or
//! the stream is polled.

use std::marker::PhantomData;
use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt, TryStreamExt};

use crate::codec::{Record, RecordCodec};
use crate::domain::errors::{CodecError, StoreError, StoreResult};
use crate::domain::models::{document_id, Document, Filter, ReplaceResult, Sort, Stage, ID_FIELD};
use crate::domain::ports::{DocumentCollection, DocumentStore};

/// Typed view of one collection.
pub struct Collection<V> {
    inner: Arc<dyn DocumentCollection>,
    codec: RecordCodec,
    _marker: PhantomData<fn() -> V>,
}

impl<V> Clone for Collection<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            codec: self.codec,
            _marker: PhantomData,
        }
    }
}

impl<V> std::fmt::Debug for Collection<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.inner.name())
            .finish()
    }
}

impl<V: Record> Collection<V> {
    pub fn new(inner: Arc<dyn DocumentCollection>) -> Self {
        Self {
            inner,
            codec: RecordCodec::new(),
            _marker: PhantomData,
        }
    }

    /// Open a named collection on a store.
    pub fn open(store: &dyn DocumentStore, name: &str) -> Self {
        Self::new(store.collection(name))
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn codec(&self) -> RecordCodec {
        self.codec
    }

    /// First record matching `filter` under `sort`.
    ///
    /// # Errors
    /// A document that fails to decode is an error for this read.
    pub async fn find_one(&self, filter: Filter, sort: Option<Sort>) -> StoreResult<Option<V>> {
        let mut stream = self.inner.find(filter, sort, Some(1));
        match stream.next().await {
            Some(doc) => Ok(Some(self.codec.decode(doc?)?)),
            None => Ok(None),
        }
    }

    pub fn find_all(&self) -> BoxStream<'static, StoreResult<V>> {
        self.find(Filter::All)
    }

    /// Records matching `filter`. A document that fails to decode becomes a
    /// single `Err` item and the stream continues.
    pub fn find(&self, filter: Filter) -> BoxStream<'static, StoreResult<V>> {
        self.find_sorted(filter, None)
    }

    pub fn find_sorted(&self, filter: Filter, sort: Option<Sort>) -> BoxStream<'static, StoreResult<V>> {
        let codec = self.codec;
        self.inner
            .find(filter, sort, None)
            .map(move |doc| -> StoreResult<V> { Ok(codec.decode(doc?)?) })
            .boxed()
    }

    /// Every record together with its stored `_id`.
    pub fn find_all_with_ids(&self) -> BoxStream<'static, StoreResult<(String, V)>> {
        let codec = self.codec;
        self.inner
            .find(Filter::All, None, None)
            .map(move |doc| -> StoreResult<(String, V)> {
                let doc = doc?;
                let id = document_id(&doc)
                    .map(str::to_string)
                    .ok_or_else(|| CodecError::Deserialize("document without string _id".to_string()))?;
                Ok((id, codec.decode(doc)?))
            })
            .boxed()
    }

    /// Distinct `_id`s in the collection.
    pub fn find_ids(&self) -> BoxStream<'static, StoreResult<String>> {
        self.inner
            .find(Filter::All, None, None)
            .try_filter_map(|doc| async move {
                Ok::<_, StoreError>(document_id(&doc).map(str::to_string))
            })
            .boxed()
    }

    /// Replace the record matching `filter`, inserting it when absent.
    pub async fn replace(&self, filter: Filter, value: &V) -> StoreResult<ReplaceResult> {
        self.replace_with(filter, value, true).await
    }

    pub async fn replace_with(
        &self,
        filter: Filter,
        value: &V,
        upsert: bool,
    ) -> StoreResult<ReplaceResult> {
        let mut doc = self.codec.encode(value)?;
        if let Some(id) = filter.id_equality() {
            doc.insert(ID_FIELD.to_string(), id.into());
        }
        self.inner.replace_one(filter, doc, upsert).await
    }

    pub async fn replace_document(
        &self,
        filter: Filter,
        doc: Document,
        upsert: bool,
    ) -> StoreResult<ReplaceResult> {
        self.inner.replace_one(filter, doc, upsert).await
    }

    /// Insert a record under a store-generated `_id`, returning it.
    pub async fn insert(&self, value: &V) -> StoreResult<String> {
        let doc = self.codec.encode(value)?;
        self.inner.insert_one(doc).await
    }

    pub async fn insert_with_id(&self, id: &str, value: &V) -> StoreResult<String> {
        let doc = self.codec.encode_with_id(id, value)?;
        self.inner.insert_one(doc).await
    }

    /// Delete the first document matching `filter`, returning it raw.
    pub async fn delete(&self, filter: Filter) -> StoreResult<Option<Document>> {
        self.inner.find_one_and_delete(filter).await
    }

    pub async fn count(&self, filter: Filter) -> StoreResult<u64> {
        self.inner.count(filter).await
    }

    pub fn aggregate(&self, stages: Vec<Stage>) -> BoxStream<'static, StoreResult<Document>> {
        self.inner.aggregate(stages)
    }

    /// Aggregation whose output documents decode as `T`.
    pub fn aggregate_as<T: Record>(&self, stages: Vec<Stage>) -> BoxStream<'static, StoreResult<T>> {
        let codec = self.codec;
        self.inner
            .aggregate(stages)
            .map(move |doc| -> StoreResult<T> { Ok(codec.decode(doc?)?) })
            .boxed()
    }
}
