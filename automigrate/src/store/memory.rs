use super::SchemaStoreProvider;
use crate::common::{atomic, Atomic, ReadExecutor, WriteExecutor};
use crate::errors::{AutomigrateError, AutomigrateResult, ErrorKind};
use crate::event::{SchemaEvent, SchemaEventBus};
use crate::schema::CollectionDefinition;
use indexmap::IndexMap;
use log::{debug, error};
use std::sync::Arc;

/// In-memory schema store.
///
/// Keeps collections in insertion order, keyed by id. When an event bus is
/// attached, every successful [`save`](Self::save) and
/// [`delete`](Self::delete) publishes a collection [`SchemaEvent`] after the
/// store lock has been released, so listeners are free to query the store.
///
/// Cloning shares the underlying collections.
#[derive(Clone, Default)]
pub struct InMemorySchemaStore {
    inner: Arc<InMemorySchemaStoreInner>,
}

impl InMemorySchemaStore {
    pub fn new() -> Self {
        InMemorySchemaStore {
            inner: Arc::new(InMemorySchemaStoreInner::new()),
        }
    }

    /// Publishes mutation events on `event_bus` from now on.
    pub fn attach_event_bus(&self, event_bus: SchemaEventBus) {
        self.inner.event_bus.write_with(|bus| *bus = Some(event_bus));
    }

    /// Inserts or replaces a collection.
    ///
    /// A definition with an empty id gets a generated `pbc_` prefixed one.
    /// Returns the stored definition.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for an invalid definition or when another
    /// collection already uses the same name. Listener failures do not fail
    /// the save; they are logged.
    pub fn save(&self, definition: CollectionDefinition) -> AutomigrateResult<CollectionDefinition> {
        let saved = self.inner.save(definition)?;
        self.inner.publish(saved.id());
        Ok(saved)
    }

    /// Removes the collection with the given id or name.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no such collection exists. Listener failures
    /// are logged.
    pub fn delete(&self, name_or_id: &str) -> AutomigrateResult<CollectionDefinition> {
        let deleted = self.inner.delete(name_or_id)?;
        self.inner.publish(deleted.id());
        Ok(deleted)
    }

    pub fn len(&self) -> usize {
        self.inner.collections.read_with(|collections| collections.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SchemaStoreProvider for InMemorySchemaStore {
    fn find_all(&self) -> AutomigrateResult<Vec<CollectionDefinition>> {
        Ok(self
            .inner
            .collections
            .read_with(|collections| collections.values().cloned().collect()))
    }

    fn find_by_name_or_id(&self, name_or_id: &str) -> AutomigrateResult<CollectionDefinition> {
        self.inner
            .collections
            .read_with(|collections| find_key(collections, name_or_id).map(|key| collections[&key].clone()))
            .ok_or_else(|| not_found(name_or_id))
    }
}

#[derive(Default)]
struct InMemorySchemaStoreInner {
    collections: Atomic<IndexMap<String, CollectionDefinition>>,
    event_bus: Atomic<Option<SchemaEventBus>>,
}

impl InMemorySchemaStoreInner {
    fn new() -> Self {
        InMemorySchemaStoreInner {
            collections: atomic(IndexMap::new()),
            event_bus: atomic(None),
        }
    }

    fn save(&self, mut definition: CollectionDefinition) -> AutomigrateResult<CollectionDefinition> {
        if definition.id().is_empty() {
            definition = definition.with_id(&generate_id());
        }
        definition.validate()?;

        self.collections.write_with(|collections| {
            let conflict = collections.values().any(|existing| {
                existing.id() != definition.id()
                    && existing.name().eq_ignore_ascii_case(definition.name())
            });
            if conflict {
                return Err(AutomigrateError::new(
                    &format!("Collection name {} is already in use", definition.name()),
                    ErrorKind::ValidationError,
                ));
            }

            collections.insert(definition.id().to_string(), definition.clone());
            Ok(definition)
        })
    }

    fn delete(&self, name_or_id: &str) -> AutomigrateResult<CollectionDefinition> {
        self.collections.write_with(|collections| {
            find_key(collections, name_or_id)
                .and_then(|key| collections.shift_remove(&key))
                .ok_or_else(|| not_found(name_or_id))
        })
    }

    // the mutation is already committed, so a failing listener is logged
    // rather than reported as a failed save
    fn publish(&self, collection_id: &str) {
        // clone the bus out so no store lock is held while listeners run
        let event_bus = self.event_bus.read_with(|bus| bus.clone());
        if let Some(bus) = event_bus {
            debug!("Publishing schema event for collection {}", collection_id);
            if let Err(e) = bus.publish(SchemaEvent::collection(collection_id)) {
                error!(
                    "Schema event listener failed for collection {}: {}",
                    collection_id, e
                );
            }
        }
    }
}

fn find_key(collections: &IndexMap<String, CollectionDefinition>, name_or_id: &str) -> Option<String> {
    if collections.contains_key(name_or_id) {
        return Some(name_or_id.to_string());
    }
    collections
        .values()
        .find(|definition| definition.name().eq_ignore_ascii_case(name_or_id))
        .map(|definition| definition.id().to_string())
}

fn generate_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("pbc_{}", &uuid[..10])
}

fn not_found(name_or_id: &str) -> AutomigrateError {
    AutomigrateError::new(
        &format!("Collection {} not found", name_or_id),
        ErrorKind::NotFound,
    )
}
