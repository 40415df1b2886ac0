//! Access to the live collection schema.

mod memory;

pub use memory::InMemorySchemaStore;

use crate::errors::AutomigrateResult;
use crate::schema::CollectionDefinition;
use std::ops::Deref;
use std::sync::Arc;

/// Read access to the collections a migrator watches.
///
/// Implementations must be `Send + Sync`; the migrator queries the store from
/// whatever thread a schema event is published on.
pub trait SchemaStoreProvider: Send + Sync {
    /// Returns every collection currently defined.
    fn find_all(&self) -> AutomigrateResult<Vec<CollectionDefinition>>;

    /// Looks up a collection by id, falling back to its name.
    ///
    /// # Errors
    ///
    /// Returns an error of kind `NotFound` when no collection matches.
    /// Any other error kind means the store itself failed.
    fn find_by_name_or_id(&self, name_or_id: &str) -> AutomigrateResult<CollectionDefinition>;
}

/// Shared handle to a [`SchemaStoreProvider`].
///
/// Cloning is cheap and dereferences to the provider.
#[derive(Clone)]
pub struct SchemaStore {
    inner: Arc<dyn SchemaStoreProvider>,
}

impl SchemaStore {
    pub fn new<T: SchemaStoreProvider + 'static>(inner: T) -> Self {
        SchemaStore { inner: Arc::new(inner) }
    }

    /// Like [`find_by_name_or_id`](SchemaStoreProvider::find_by_name_or_id),
    /// but maps `NotFound` to `Ok(None)`.
    pub fn find_optional(&self, name_or_id: &str) -> AutomigrateResult<Option<CollectionDefinition>> {
        match self.inner.find_by_name_or_id(name_or_id) {
            Ok(definition) => Ok(Some(definition)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Deref for SchemaStore {
    type Target = Arc<dyn SchemaStoreProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
