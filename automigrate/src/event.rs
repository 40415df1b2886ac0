use crate::common::{unix_timestamp, EventBus};
use crate::errors::AutomigrateResult;
use anyhow::Error;
use basu::error::BasuError;
use basu::event::Event;
use basu::Handle;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// Kind of entity a [`SchemaEvent`] is about.
///
/// Only collection events are of interest to the migrator, every other kind
/// is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Collection,
    Record,
    Other(String),
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Collection => write!(f, "collection"),
            EntityKind::Record => write!(f, "record"),
            EntityKind::Other(kind) => write!(f, "{}", kind),
        }
    }
}

/// Notification that an entity was created, updated or deleted.
///
/// The event deliberately carries no payload besides the id: consumers look
/// the current state up in the store and compare it with what they saw last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEvent {
    entity_id: String,
    entity_kind: EntityKind,
    timestamp: i64,
}

impl SchemaEvent {
    pub fn new(entity_id: &str, entity_kind: EntityKind) -> Self {
        SchemaEvent {
            entity_id: entity_id.to_string(),
            entity_kind,
            timestamp: unix_timestamp(),
        }
    }

    /// Shorthand for a collection mutation event.
    pub fn collection(collection_id: &str) -> Self {
        SchemaEvent::new(collection_id, EntityKind::Collection)
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn entity_kind(&self) -> &EntityKind {
        &self.entity_kind
    }

    /// Seconds since the unix epoch at which the event was created.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn is_collection_event(&self) -> bool {
        self.entity_kind == EntityKind::Collection
    }
}

/// Callback invoked for every published [`SchemaEvent`].
///
/// Any `Fn(SchemaEvent) -> AutomigrateResult<()>` closure that is
/// `Send + Sync` implements this trait.
pub trait SchemaEventCallback: Send + Sync + Fn(SchemaEvent) -> AutomigrateResult<()> {}

impl<F> SchemaEventCallback for F where F: Send + Sync + Fn(SchemaEvent) -> AutomigrateResult<()> {}

/// Listener registered on a [`SchemaEventBus`].
///
/// ```ignore
/// let subscriber = bus.register(SchemaEventListener::new(|event| {
///     println!("changed: {}", event.entity_id());
///     Ok(())
/// }))?;
/// ```
#[derive(Clone)]
pub struct SchemaEventListener {
    on_event: Arc<dyn SchemaEventCallback>,
}

impl SchemaEventListener {
    pub fn new(on_event: impl SchemaEventCallback + 'static) -> Self {
        SchemaEventListener {
            on_event: Arc::new(on_event),
        }
    }
}

impl Handle<SchemaEvent> for SchemaEventListener {
    fn handle(&self, event: &Event<SchemaEvent>) -> Result<(), BasuError> {
        match (self.on_event)(event.data.clone()) {
            Ok(_) => Ok(()),
            Err(e) => Err(BasuError::HandlerError(Error::from(e))),
        }
    }
}

impl Debug for SchemaEventListener {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaEventListener").finish()
    }
}

/// Bus over which schema stores announce mutations.
pub type SchemaEventBus = EventBus<SchemaEvent, SchemaEventListener>;
