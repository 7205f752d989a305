//! Write-through cache over a keyed collection.
//!
//! Reads are served from an in-memory map. Writes update the map first and
//! then reach the store, either in the background ([`CachedKeyedRepository::save`])
//! or awaited ([`CachedKeyedRepository::save_durable`]). The store never pushes
//! changes back into the cache.
//!
//! On open, a background task scans the whole collection into the cache.
//! Until it finishes, a cache miss does not prove the record is absent;
//! [`CachedKeyedRepository::get_or_fetch`] falls back to the store for that
//! window, and [`CachedKeyedRepository::wait_until_loaded`] lets callers block
//! on the scan instead.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use futures::stream::{BoxStream, StreamExt};
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::codec::{DocumentKey, Record};
use crate::domain::errors::StoreResult;
use crate::domain::models::{Filter, ReplaceResult};
use crate::store::Collection;

/// Progress of the initial cache population.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    /// Scan finished.
    Complete {
        /// Records read from the store, including ones a newer save or a
        /// delete made during the scan kept out of the cache
        loaded: usize,
        /// Documents whose `_id` does not parse as a key
        skipped_keys: usize,
        /// Documents whose body does not decode as a record
        skipped_records: usize,
    },
    /// The store could not be read; the cache holds whatever arrived before.
    Failed(String),
    Cancelled,
}

impl LoadState {
    pub fn is_finished(&self) -> bool {
        !matches!(self, LoadState::Loading)
    }

    /// Documents the scan passed over, for any reason.
    pub fn skipped(&self) -> usize {
        match self {
            LoadState::Complete {
                skipped_keys,
                skipped_records,
                ..
            } => skipped_keys + skipped_records,
            _ => 0,
        }
    }
}

struct Shared<K, V> {
    cache: DashMap<K, V>,
    /// Keys deleted while the initial scan runs; the scan must not restore them.
    deleted: DashSet<K>,
    state: watch::Sender<LoadState>,
}

impl<K: DocumentKey, V> Shared<K, V> {
    /// Remove `key` from the cache, leaving a tombstone if the scan is running.
    ///
    /// The tombstone goes in before the cache entry comes out, so a scan that
    /// holds the entry either sees the tombstone or inserts before the removal.
    fn evict_deleted(&self, key: &K) {
        if !self.state.borrow().is_finished() {
            self.deleted.insert(key.clone());
        }
        self.cache.remove(key);
    }
}

/// Cached repository for records with a unique domain key.
pub struct CachedKeyedRepository<K, V>
where
    K: DocumentKey,
    V: Record + Clone,
{
    collection: Collection<V>,
    shared: Arc<Shared<K, V>>,
    loader: AbortHandle,
}

impl<K, V> CachedKeyedRepository<K, V>
where
    K: DocumentKey,
    V: Record + Clone,
{
    /// Create the repository and start populating its cache in the background.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(collection: Collection<V>) -> Self {
        let (state, _) = watch::channel(LoadState::Loading);
        let shared = Arc::new(Shared {
            cache: DashMap::new(),
            deleted: DashSet::new(),
            state,
        });
        let loader = tokio::spawn(initial_load(collection.clone(), Arc::clone(&shared)));
        Self {
            collection,
            shared,
            loader: loader.abort_handle(),
        }
    }

    pub fn collection(&self) -> &Collection<V> {
        &self.collection
    }

    /// Cached value for `key`. Never touches the store.
    pub fn get_from_cache(&self, key: &K) -> Option<V> {
        self.shared.cache.get(key).map(|entry| entry.value().clone())
    }

    /// Cache first, then the store. A value found in the store is cached.
    pub async fn get_or_fetch(&self, key: &K) -> StoreResult<Option<V>> {
        if let Some(value) = self.get_from_cache(key) {
            return Ok(Some(value));
        }
        let Some(fetched) = self.get_from_database(key).await? else {
            return Ok(None);
        };
        let cached = self
            .shared
            .cache
            .entry(key.clone())
            .or_insert(fetched)
            .value()
            .clone();
        Ok(Some(cached))
    }

    /// Read `key` straight from the store, bypassing the cache.
    pub async fn get_from_database(&self, key: &K) -> StoreResult<Option<V>> {
        self.collection
            .find_one(Filter::id(key.to_document_id()), None)
            .await
    }

    pub fn get_all_from_database(&self) -> BoxStream<'static, StoreResult<V>> {
        self.collection.find_all()
    }

    /// Update the cache now and write to the store in the background.
    ///
    /// The returned handle may be dropped. Failed writes are logged; the cache
    /// keeps the new value either way. Must be called from within a Tokio runtime.
    pub fn save(&self, key: K, value: V) -> JoinHandle<StoreResult<ReplaceResult>> {
        self.shared.cache.insert(key.clone(), value.clone());
        let collection = self.collection.clone();
        tokio::spawn(async move {
            let id = key.to_document_id();
            let result = collection.replace(Filter::id(id.clone()), &value).await;
            if let Err(e) = &result {
                error!(collection = collection.name(), id = %id, error = %e, "background save failed");
            }
            result
        })
    }

    /// Update the cache and wait for the store to acknowledge the write.
    pub async fn save_durable(&self, key: K, value: V) -> StoreResult<ReplaceResult> {
        self.shared.cache.insert(key.clone(), value.clone());
        self.collection
            .replace(Filter::id(key.to_document_id()), &value)
            .await
    }

    /// [`Self::save_durable`] for each entry in order; stops at the first failure.
    pub async fn save_all_durable<I>(&self, entries: I) -> StoreResult<usize>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut written = 0;
        for (key, value) in entries {
            self.save_durable(key, value).await?;
            written += 1;
        }
        Ok(written)
    }

    pub fn add_to_cache(&self, key: K, value: V) {
        self.shared.cache.insert(key, value);
    }

    pub fn remove_from_cache(&self, key: &K) -> Option<V> {
        self.shared.cache.remove(key).map(|(_, value)| value)
    }

    /// Drop `key` from the cache and delete it from the store in the background.
    ///
    /// The handle resolves to whether the store held the record.
    pub fn remove(&self, key: K) -> JoinHandle<StoreResult<bool>> {
        self.shared.evict_deleted(&key);
        let collection = self.collection.clone();
        tokio::spawn(async move {
            let id = key.to_document_id();
            let result = collection
                .delete(Filter::id(id.clone()))
                .await
                .map(|doc| doc.is_some());
            if let Err(e) = &result {
                error!(collection = collection.name(), id = %id, error = %e, "background delete failed");
            }
            result
        })
    }

    pub async fn remove_durable(&self, key: &K) -> StoreResult<bool> {
        self.shared.evict_deleted(key);
        let removed = self
            .collection
            .delete(Filter::id(key.to_document_id()))
            .await?;
        Ok(removed.is_some())
    }

    pub fn contains(&self, key: &K) -> bool {
        self.shared.cache.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.shared.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.cache.is_empty()
    }

    pub fn cached_keys(&self) -> Vec<K> {
        self.shared.cache.iter().map(|e| e.key().clone()).collect()
    }

    pub fn cached_values(&self) -> Vec<V> {
        self.shared.cache.iter().map(|e| e.value().clone()).collect()
    }

    pub fn load_state(&self) -> LoadState {
        self.shared.state.borrow().clone()
    }

    /// Wait for the initial scan to finish, fail or be cancelled.
    pub async fn wait_until_loaded(&self) -> LoadState {
        let mut rx = self.shared.state.subscribe();
        let state = match rx.wait_for(LoadState::is_finished).await {
            Ok(state) => state.clone(),
            Err(_) => self.load_state(),
        };
        state
    }

    /// Stop the initial scan. Entries already loaded stay cached.
    pub fn cancel_initial_load(&self) {
        self.loader.abort();
        let cancelled = self.shared.state.send_if_modified(|state| {
            if matches!(state, LoadState::Loading) {
                *state = LoadState::Cancelled;
                true
            } else {
                false
            }
        });
        if cancelled {
            self.shared.deleted.clear();
            info!(collection = self.collection.name(), "initial cache load cancelled");
        }
    }
}

impl<K, V> Drop for CachedKeyedRepository<K, V>
where
    K: DocumentKey,
    V: Record + Clone,
{
    fn drop(&mut self) {
        self.loader.abort();
    }
}

async fn initial_load<K, V>(collection: Collection<V>, shared: Arc<Shared<K, V>>)
where
    K: DocumentKey,
    V: Record + Clone,
{
    let name = collection.name().to_string();
    debug!(collection = %name, "starting initial cache load");

    let mut stream = collection.find_all_with_ids();
    let (mut loaded, mut skipped_keys, mut skipped_records) = (0_usize, 0_usize, 0_usize);

    while let Some(item) = stream.next().await {
        match item {
            Ok((id, value)) => match K::from_document_id(&id) {
                Some(key) => {
                    // A save made while loading wins over the stored copy, and a
                    // delete made while loading keeps it out.
                    if let Entry::Vacant(slot) = shared.cache.entry(key) {
                        if !shared.deleted.contains(slot.key()) {
                            slot.insert(value);
                        }
                    }
                    loaded += 1;
                }
                None => {
                    warn!(collection = %name, id = %id, "skipping document with unparseable key");
                    skipped_keys += 1;
                }
            },
            Err(e) if e.is_record_level() => {
                warn!(collection = %name, error = %e, "skipping undecodable document");
                skipped_records += 1;
            }
            Err(e) => {
                error!(collection = %name, error = %e, loaded, "initial cache load failed");
                shared.state.send_replace(LoadState::Failed(e.to_string()));
                shared.deleted.clear();
                return;
            }
        }
    }

    info!(collection = %name, loaded, skipped_keys, skipped_records, "initial cache load complete");
    shared.state.send_replace(LoadState::Complete {
        loaded,
        skipped_keys,
        skipped_records,
    });
    shared.deleted.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryDocumentStore;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    impl Record for Note {}

    fn note(text: &str) -> Note {
        Note {
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_empty_store_loads_complete() {
        let store = MemoryDocumentStore::new();
        let repo: CachedKeyedRepository<String, Note> =
            CachedKeyedRepository::open(Collection::open(&store, "notes"));
        assert_eq!(
            repo.wait_until_loaded().await,
            LoadState::Complete {
                loaded: 0,
                skipped_keys: 0,
                skipped_records: 0,
            }
        );
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_save_durable_then_reopen() {
        let store = MemoryDocumentStore::new();
        {
            let repo: CachedKeyedRepository<u64, Note> =
                CachedKeyedRepository::open(Collection::open(&store, "notes"));
            repo.wait_until_loaded().await;
            repo.save_all_durable([(1, note("a")), (2, note("b"))])
                .await
                .unwrap();
        }

        let reopened: CachedKeyedRepository<u64, Note> =
            CachedKeyedRepository::open(Collection::open(&store, "notes"));
        reopened.wait_until_loaded().await;
        assert_eq!(reopened.get_from_cache(&2), Some(note("b")));
        assert_eq!(reopened.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_durable_clears_both() {
        let store = MemoryDocumentStore::new();
        let repo: CachedKeyedRepository<String, Note> =
            CachedKeyedRepository::open(Collection::open(&store, "notes"));
        repo.wait_until_loaded().await;

        repo.save_durable("k".to_string(), note("x")).await.unwrap();
        assert!(repo.remove_durable(&"k".to_string()).await.unwrap());
        assert!(!repo.contains(&"k".to_string()));
        assert!(repo
            .get_from_database(&"k".to_string())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_offline_store_fails_load() {
        let store = MemoryDocumentStore::new();
        store.set_offline(true);
        let repo: CachedKeyedRepository<String, Note> =
            CachedKeyedRepository::open(Collection::open(&store, "notes"));
        assert!(matches!(repo.wait_until_loaded().await, LoadState::Failed(_)));
    }
}
