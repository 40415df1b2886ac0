use crate::common::{
    atomic, Atomic, LockRegistry, ReadExecutor, SubscriberRef, WriteExecutor,
    COLLECTIONS_SNAPSHOT_LABEL,
};
use crate::config::AutomigrateConfig;
use crate::diff::{ChangeRecord, ChangeSet};
use crate::errors::{AutomigrateError, AutomigrateResult, ErrorKind};
use crate::event::{SchemaEvent, SchemaEventBus, SchemaEventListener};
use crate::snapshot::SchemaSnapshot;
use crate::store::SchemaStore;
use crate::template::Template;
use crate::writer::MigrationWriter;
use log::{debug, error, info};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::{Arc, Weak};

/// Turns collection schema changes into migration files.
///
/// For every collection event the migrator compares the definition it saw
/// last with the one now in the store, renders the difference with the
/// configured template and writes it to the migrations directory:
///
/// ```text
/// event ─► lock(id) ─► old = snapshot[id] ─► new = store[id]
///       ─► diff ─► render ─► write ─► snapshot[id] = new
/// ```
///
/// Any failure stops the pipeline before the snapshot is updated, so a
/// retried event produces the same migration.
///
/// Events for the same collection are processed one at a time; events for
/// different collections run in parallel.
///
/// # Examples
///
/// ```
/// use automigrate::store::{InMemorySchemaStore, SchemaStore};
/// use automigrate::schema::{CollectionDefinition, FieldType, SchemaField};
/// use automigrate::{AutoMigrator, AutomigrateBuilder, SchemaEventBus};
///
/// let dir = std::env::temp_dir().join(format!("automigrate-doc-{}", std::process::id()));
/// let config = AutomigrateBuilder::new().migrations_dir(&dir).build().unwrap();
///
/// let bus = SchemaEventBus::new();
/// let memory = InMemorySchemaStore::new();
/// memory.attach_event_bus(bus.clone());
///
/// let migrator = AutoMigrator::new(config, SchemaStore::new(memory.clone()));
/// migrator.register(&bus).unwrap();
///
/// memory
///     .save(CollectionDefinition::new("pbc_posts", "posts")
///         .with_field(SchemaField::new("title", FieldType::Text)))
///     .unwrap();
///
/// let written = std::fs::read_dir(&dir).unwrap().count();
/// assert_eq!(written, 1);
/// # std::fs::remove_dir_all(&dir).unwrap();
/// ```
#[derive(Clone)]
pub struct AutoMigrator {
    inner: Arc<AutoMigratorInner>,
}

impl AutoMigrator {
    pub fn new(config: AutomigrateConfig, store: SchemaStore) -> Self {
        AutoMigrator::with_writer(config, store, MigrationWriter::new())
    }

    /// Creates a migrator writing through `writer`.
    pub fn with_writer(config: AutomigrateConfig, store: SchemaStore, writer: MigrationWriter) -> Self {
        let template = Template::for_lang(config.template_lang());
        AutoMigrator {
            inner: Arc::new(AutoMigratorInner {
                snapshot: SchemaSnapshot::new(store.clone()),
                config,
                store,
                template,
                writer,
                lock_registry: LockRegistry::new(),
                baseline_gate: RwLock::new(()),
                subscription: atomic(None),
            }),
        }
    }

    pub fn config(&self) -> &AutomigrateConfig {
        &self.inner.config
    }

    /// The cache of last observed collection definitions.
    pub fn snapshot(&self) -> &SchemaSnapshot {
        &self.inner.snapshot
    }

    /// Loads the current collections as the baseline for future diffs.
    ///
    /// [`register`](Self::register) does this itself; call it directly only
    /// when feeding events through
    /// [`on_schema_change`](Self::on_schema_change) by hand. A collection
    /// saved before the baseline is loaded is considered pre-existing.
    ///
    /// Waits for events in flight and holds back new ones until the load
    /// completes. Events are rejected with `BaselineNotLoaded` while no
    /// baseline is loaded, e.g. after [`SchemaSnapshot::invalidate`].
    pub fn load_baseline(&self) -> AutomigrateResult<()> {
        let _gate = self.inner.baseline_gate.write();
        self.inner.snapshot.refresh().map(|_| ())
    }

    /// Subscribes to `event_bus` and loads the baseline.
    ///
    /// Returns `Ok(false)` without subscribing when automatic migrations are
    /// disabled.
    ///
    /// # Errors
    ///
    /// `ValidationError` when already registered, or the store/bus error
    /// that prevented the registration. A failed baseline load leaves the
    /// migrator unsubscribed.
    pub fn register(&self, event_bus: &SchemaEventBus) -> AutomigrateResult<bool> {
        if !self.inner.config.auto_enabled() {
            debug!("Automatic migrations are disabled, not subscribing");
            return Ok(false);
        }
        if self.is_registered() {
            return Err(AutomigrateError::new(
                "Migrator is already registered on an event bus",
                ErrorKind::ValidationError,
            ));
        }

        // subscribe before loading, so no mutation falls between the two;
        // events arriving meanwhile wait for the baseline at the gate
        let gate = self.inner.baseline_gate.write();
        let inner = Arc::downgrade(&self.inner);
        let subscriber = event_bus.register(SchemaEventListener::new(move |event| {
            match Weak::upgrade(&inner) {
                Some(inner) => AutoMigrator { inner }.on_schema_change(&event).map(|_| ()),
                // migrator dropped without unregistering
                None => Ok(()),
            }
        }))?;

        if let Err(e) = self.inner.snapshot.refresh() {
            // waiting events fail on the missing baseline once released
            drop(gate);
            event_bus.deregister(subscriber)?;
            return Err(e);
        }

        self.inner
            .subscription
            .write_with(|subscription| *subscription = Some((event_bus.clone(), subscriber)));
        drop(gate);
        info!(
            "Writing {} migrations to {}",
            self.inner.config.template_lang(),
            self.inner.config.migrations_dir().display()
        );
        Ok(true)
    }

    /// Removes the bus subscription, if any.
    pub fn unregister(&self) -> AutomigrateResult<()> {
        let subscription = self.inner.subscription.write_with(|subscription| subscription.take());
        match subscription {
            Some((event_bus, subscriber)) => event_bus.deregister(subscriber),
            None => Ok(()),
        }
    }

    pub fn is_registered(&self) -> bool {
        self.inner.subscription.read_with(|subscription| subscription.is_some())
    }

    /// Handles one schema event.
    ///
    /// Returns the path of the written migration, or `None` when the event
    /// is ignored or the collection did not change.
    pub fn on_schema_change(&self, event: &SchemaEvent) -> AutomigrateResult<Option<PathBuf>> {
        if !event.is_collection_event() {
            debug!(
                "Ignoring {} event for {}",
                event.entity_kind(),
                event.entity_id()
            );
            return Ok(None);
        }
        if !self.inner.config.auto_enabled() {
            debug!("Automatic migrations are disabled, ignoring {}", event.entity_id());
            return Ok(None);
        }

        self.inner.process(event.entity_id()).map_err(|e| {
            error!(
                "Failed to generate migration for collection {}: {}",
                event.entity_id(),
                e
            );
            e
        })
    }

    /// Writes a migration that imports every current collection.
    pub fn snapshot_collections(&self) -> AutomigrateResult<PathBuf> {
        let collections = self.inner.store.find_all()?;
        let script = self.inner.template.render_snapshot(&collections)?;
        let path = self.inner.write(COLLECTIONS_SNAPSHOT_LABEL, &script)?;
        info!(
            "Wrote snapshot of {} collection(s) to {}",
            collections.len(),
            path.display()
        );
        Ok(path)
    }

    /// Writes an empty migration named after `name`.
    pub fn create_blank(&self, name: &str) -> AutomigrateResult<PathBuf> {
        if name.trim().is_empty() {
            return Err(AutomigrateError::new(
                "Missing migration file name",
                ErrorKind::ValidationError,
            ));
        }
        let script = self.inner.template.render_blank(name);
        let path = self.inner.write(name, &script)?;
        info!("Created blank migration {}", path.display());
        Ok(path)
    }
}

struct AutoMigratorInner {
    config: AutomigrateConfig,
    store: SchemaStore,
    snapshot: SchemaSnapshot,
    template: Template,
    writer: MigrationWriter,
    lock_registry: LockRegistry,
    baseline_gate: RwLock<()>,
    subscription: Atomic<Option<(SchemaEventBus, SubscriberRef)>>,
}

impl AutoMigratorInner {
    fn process(&self, collection_id: &str) -> AutomigrateResult<Option<PathBuf>> {
        let _gate = self.baseline_gate.read();
        let lock = self.lock_registry.get_lock(collection_id);
        let _guard = lock.lock();

        let old = self.snapshot.loaded_entry(collection_id)?;
        let new = self.store.find_optional(collection_id)?;
        let record = match ChangeRecord::new(old, new) {
            Some(record) => record,
            None => {
                debug!("Collection {} is unknown, nothing to migrate", collection_id);
                return Ok(None);
            }
        };

        let label = record.action_label();
        let change_set = ChangeSet::from_record(&record);
        let path = match self.template.render(&change_set, &label)? {
            Some(script) => {
                let path = self.write(&label, &script)?;
                info!("Wrote migration {}", path.display());
                Some(path)
            }
            None => {
                debug!("No schema changes for collection {}", collection_id);
                None
            }
        };

        self.snapshot
            .commit(collection_id, record.new_definition().cloned());
        Ok(path)
    }

    fn write(&self, label: &str, script: &str) -> AutomigrateResult<PathBuf> {
        self.writer.write(
            self.config.migrations_dir(),
            label,
            self.template.extension(),
            script,
        )
    }
}
