use crate::common::{atomic, Atomic, ReadExecutor, WriteExecutor};
use crate::errors::{AutomigrateError, AutomigrateResult, ErrorKind};
use crate::schema::CollectionDefinition;
use crate::store::SchemaStore;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

type Collections = Arc<HashMap<String, CollectionDefinition>>;

/// Last observed definition of every collection, keyed by id.
///
/// The cache is loaded lazily from the store on first access and then kept
/// current one entry at a time through [`commit`](Self::commit). Committing
/// a single entry instead of reloading everything keeps mutations that have
/// not been processed yet out of the cache, so their diff is not lost.
///
/// Readers get a cheap [`Arc`] to an immutable map; commits copy on write.
#[derive(Clone)]
pub struct SchemaSnapshot {
    inner: Arc<SchemaSnapshotInner>,
}

impl SchemaSnapshot {
    pub fn new(store: SchemaStore) -> Self {
        SchemaSnapshot {
            inner: Arc::new(SchemaSnapshotInner {
                store,
                collections: atomic(None),
            }),
        }
    }

    /// Returns the cached collections, loading them if needed.
    pub fn get(&self) -> AutomigrateResult<Collections> {
        if let Some(collections) = self.inner.collections.read_with(|c| c.clone()) {
            return Ok(collections);
        }
        self.refresh()
    }

    /// Reloads every collection from the store.
    ///
    /// The cache stays write locked while the store is queried, so a
    /// concurrent [`commit`](Self::commit) lands after the reload instead of
    /// being overwritten by it. On failure the previous contents are kept.
    pub fn refresh(&self) -> AutomigrateResult<Collections> {
        self.inner.collections.write_with(|collections| {
            let loaded: HashMap<String, CollectionDefinition> = self
                .inner
                .store
                .find_all()?
                .into_iter()
                .map(|definition| (definition.id().to_string(), definition))
                .collect();

            debug!("Loaded {} collection(s) into the schema snapshot", loaded.len());
            let loaded = Arc::new(loaded);
            *collections = Some(loaded.clone());
            Ok(loaded)
        })
    }

    /// Returns the last observed definition of collection `id`.
    pub fn entry(&self, id: &str) -> AutomigrateResult<Option<CollectionDefinition>> {
        Ok(self.get()?.get(id).cloned())
    }

    /// Like [`entry`](Self::entry), but never loads the cache.
    ///
    /// A load at this point would read mutations that were never diffed, so
    /// an unloaded cache is reported as `BaselineNotLoaded` instead.
    pub fn loaded_entry(&self, id: &str) -> AutomigrateResult<Option<CollectionDefinition>> {
        self.inner.collections.read_with(|collections| match collections {
            Some(collections) => Ok(collections.get(id).cloned()),
            None => Err(AutomigrateError::new(
                &format!(
                    "Schema snapshot is not loaded, cannot diff collection {}; load the baseline first",
                    id
                ),
                ErrorKind::BaselineNotLoaded,
            )),
        })
    }

    /// Records `definition` as the current state of collection `id`.
    ///
    /// `None` removes the entry. Does nothing while the cache is not loaded;
    /// the next load picks the state up from the store anyway.
    pub fn commit(&self, id: &str, definition: Option<CollectionDefinition>) {
        self.inner.collections.write_with(|collections| {
            if let Some(current) = collections {
                let mut updated = (**current).clone();
                match definition {
                    Some(definition) => {
                        updated.insert(id.to_string(), definition);
                    }
                    None => {
                        updated.remove(id);
                    }
                }
                *current = Arc::new(updated);
            }
        });
    }

    /// Drops the cache; the next read reloads it.
    pub fn invalidate(&self) {
        self.inner.collections.write_with(|collections| *collections = None);
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.collections.read_with(|c| c.is_some())
    }

    /// Number of cached collections, zero when not loaded.
    pub fn len(&self) -> usize {
        self.inner
            .collections
            .read_with(|c| c.as_ref().map_or(0, |collections| collections.len()))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct SchemaSnapshotInner {
    store: SchemaStore,
    collections: Atomic<Option<Collections>>,
}
