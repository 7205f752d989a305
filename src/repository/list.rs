//! Cache over a collection whose records have no unique key.
//!
//! The cache is an ordered list maintained explicitly by the caller. Store
//! operations never touch it, so cache and store may diverge until the caller
//! reconciles them (for example with [`CachedListRepository::load_cache`]).

use std::marker::PhantomData;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use tracing::{debug, warn};

use crate::codec::{DocumentKey, Record};
use crate::domain::errors::StoreResult;
use crate::domain::models::{Document, Filter, ReplaceResult, Sort};
use crate::store::Collection;

/// A list entry that can be looked up by a (non-unique) key.
pub trait ListRecord<K>: Record + Clone {
    fn matches_key(&self, key: &K) -> bool;
}

pub struct CachedListRepository<K, V> {
    collection: Collection<V>,
    cache: RwLock<Vec<V>>,
    _key: PhantomData<fn(&K)>,
}

impl<K, V> CachedListRepository<K, V>
where
    V: ListRecord<K>,
{
    /// Create with an empty cache. Call [`Self::load_cache`] to populate it.
    pub fn new(collection: Collection<V>) -> Self {
        Self {
            collection,
            cache: RwLock::new(Vec::new()),
            _key: PhantomData,
        }
    }

    pub fn collection(&self) -> &Collection<V> {
        &self.collection
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<V>> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<V>> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// First cached entry matching `key`.
    pub fn get_from_cache(&self, key: &K) -> Option<V> {
        self.read().iter().find(|v| v.matches_key(key)).cloned()
    }

    pub fn find_in_cache(&self, predicate: impl Fn(&V) -> bool) -> Vec<V> {
        self.read().iter().filter(|v| predicate(v)).cloned().collect()
    }

    /// Snapshot of the whole cache in insertion order.
    pub fn cached(&self) -> Vec<V> {
        self.read().clone()
    }

    pub fn add_to_cache(&self, value: V) {
        self.write().push(value);
    }

    pub fn clear_cache(&self) {
        self.write().clear();
    }

    /// Remove every cached entry matching `key`, returning how many went.
    pub fn remove_by_key(&self, key: &K) -> usize {
        let mut cache = self.write();
        let before = cache.len();
        cache.retain(|v| !v.matches_key(key));
        before - cache.len()
    }

    /// Replace the cache with a full scan of the store.
    ///
    /// Undecodable documents are skipped. Returns `(loaded, skipped)`. If the
    /// scan itself fails the cache is left untouched.
    pub async fn load_cache(&self) -> StoreResult<(usize, usize)> {
        let mut stream = self.collection.find_all();
        let mut fresh = Vec::new();
        let mut skipped = 0;
        while let Some(item) = stream.next().await {
            match item {
                Ok(value) => fresh.push(value),
                Err(e) if e.is_record_level() => {
                    warn!(collection = self.collection.name(), error = %e, "skipping undecodable document");
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        let loaded = fresh.len();
        *self.write() = fresh;
        debug!(collection = self.collection.name(), loaded, skipped, "list cache reloaded");
        Ok((loaded, skipped))
    }

    pub async fn get_entry_from_database(
        &self,
        filter: Filter,
        sort: Option<Sort>,
    ) -> StoreResult<Option<V>> {
        self.collection.find_one(filter, sort).await
    }

    pub fn get_all_from_database(&self) -> BoxStream<'static, StoreResult<V>> {
        self.collection.find_all()
    }

    pub fn get_all_matching(&self, filter: Filter) -> BoxStream<'static, StoreResult<V>> {
        self.collection.find(filter)
    }

    /// Every record in the store, failing on the first error.
    pub async fn collect_all_from_database(&self) -> StoreResult<Vec<V>> {
        self.collection.find_all().try_collect().await
    }

    /// Replace the record matching `filter` (inserting when absent).
    pub async fn save_to_database(&self, filter: Filter, value: &V) -> StoreResult<ReplaceResult> {
        self.collection.replace(filter, value).await
    }

    pub async fn remove_from_database(&self, filter: Filter) -> StoreResult<Option<Document>> {
        self.collection.delete(filter).await
    }

    pub async fn count(&self, filter: Filter) -> StoreResult<u64> {
        self.collection.count(filter).await
    }
}

impl<K, V> CachedListRepository<K, V>
where
    V: ListRecord<K> + PartialEq,
{
    /// Remove the first cached entry equal to `value`.
    pub fn remove_from_cache(&self, value: &V) -> bool {
        let mut cache = self.write();
        match cache.iter().position(|v| v == value) {
            Some(index) => {
                cache.remove(index);
                true
            }
            None => false,
        }
    }
}

impl<K, V> CachedListRepository<K, V>
where
    K: DocumentKey,
    V: ListRecord<K>,
{
    /// Store record whose `_id` is `key`.
    pub async fn get_from_database(&self, key: &K) -> StoreResult<Option<V>> {
        self.collection
            .find_one(Filter::id(key.to_document_id()), None)
            .await
    }
}
