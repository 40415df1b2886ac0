use crate::common::SCHEMA_EVENT;
use crate::errors::{AutomigrateError, AutomigrateResult, ErrorKind};
use basu::error::BasuError;
use basu::event::Event;
use basu::{Handle, HandlerId};
use std::marker::PhantomData;
use std::sync::Arc;

/// Publishes events to registered listeners.
///
/// A thin wrapper over a `basu` bus bound to a single event type. Publishing
/// runs every registered handler before returning and reports the first
/// handler failure as an [`ErrorKind::EventError`].
///
/// # Example
///
/// ```ignore
/// let event_bus: EventBus<SchemaEvent, SchemaEventListener> = EventBus::new();
/// let subscriber = event_bus.register(listener)?;
/// event_bus.publish(SchemaEvent::collection("pbc_posts"))?;
/// event_bus.deregister(subscriber)?;
/// ```
pub struct EventBus<E, L> {
    inner: Arc<EventBusInner<E, L>>,
}

impl<E, L> Clone for EventBus<E, L> {
    fn clone(&self) -> Self {
        EventBus {
            inner: self.inner.clone(),
        }
    }
}

impl<E, L> Default for EventBus<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, L> EventBus<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    /// Creates a new event bus instance.
    pub fn new() -> Self {
        EventBus {
            inner: Arc::new(EventBusInner::new()),
        }
    }

    /// Registers an event listener with the bus.
    pub fn register(&self, listener: L) -> AutomigrateResult<SubscriberRef> {
        self.inner.register(listener)
    }

    /// Deregisters a previously registered event listener.
    pub fn deregister(&self, subscriber: SubscriberRef) -> AutomigrateResult<()> {
        self.inner.deregister(subscriber)
    }

    /// Publishes an event to all registered listeners.
    pub fn publish(&self, event: E) -> AutomigrateResult<()> {
        self.inner.publish(event)
    }

    /// Clears all registered listeners.
    pub fn close(&self) -> AutomigrateResult<()> {
        self.inner.close()
    }

    /// Returns true if there are any registered listeners.
    pub fn has_listeners(&self) -> bool {
        self.inner.has_listeners()
    }
}

/// Registration token returned by [`EventBus::register`].
#[derive(Debug)]
pub struct SubscriberRef {
    pub(crate) inner: HandlerId,
}

impl SubscriberRef {
    pub fn new(inner: HandlerId) -> Self {
        SubscriberRef { inner }
    }
}

struct EventBusInner<E, L> {
    event_bus: basu::EventBus<E>,
    phantom_data: PhantomData<L>,
}

impl<E, L> EventBusInner<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    fn new() -> Self {
        EventBusInner {
            event_bus: basu::EventBus::new(),
            phantom_data: PhantomData,
        }
    }

    fn register(&self, listener: L) -> AutomigrateResult<SubscriberRef> {
        self.event_bus
            .subscribe(SCHEMA_EVENT, Box::new(listener))
            .map(SubscriberRef::new)
            .map_err(Self::bus_error)
    }

    #[inline]
    fn deregister(&self, subscriber: SubscriberRef) -> AutomigrateResult<()> {
        self.event_bus
            .unsubscribe(SCHEMA_EVENT, &subscriber.inner)
            .map_err(Self::bus_error)
    }

    #[inline]
    fn publish(&self, event: E) -> AutomigrateResult<()> {
        let handler_count = match self.event_bus.get_handler_count(SCHEMA_EVENT) {
            Ok(count) => count,
            // nobody ever subscribed
            Err(BasuError::EventTypeNotFOUND) => return Ok(()),
            Err(e) => return Err(Self::bus_error(e)),
        };

        if handler_count == 0 {
            return Ok(());
        }

        let basu_event = Event::new(event);
        self.event_bus
            .publish(SCHEMA_EVENT, &basu_event)
            .map_err(Self::bus_error)
    }

    #[inline]
    fn close(&self) -> AutomigrateResult<()> {
        self.event_bus.clear().map_err(Self::bus_error)
    }

    #[inline]
    fn has_listeners(&self) -> bool {
        match self.event_bus.get_handler_count(SCHEMA_EVENT) {
            Ok(count) => count > 0,
            Err(BasuError::EventTypeNotFOUND) => false,
            Err(e) => {
                log::warn!("Failed to check listeners: {}, defaulting to false", e);
                false
            }
        }
    }

    fn bus_error(e: BasuError) -> AutomigrateError {
        match e {
            BasuError::EventTypeNotFOUND => AutomigrateError::new(
                "Event bus error: no handler registered for schema events",
                ErrorKind::EventError,
            ),
            BasuError::MutexPoisoned => AutomigrateError::new(
                "Event bus error: internal mutex poisoned",
                ErrorKind::EventError,
            ),
            BasuError::HandlerError(e) => AutomigrateError::new(
                &format!("Event handler error: {}", e),
                ErrorKind::EventError,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone)]
    struct CountingListener {
        seen: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Handle<String> for CountingListener {
        fn handle(&self, _event: &Event<String>) -> Result<(), BasuError> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(BasuError::HandlerError(anyhow::anyhow!("listener failed")));
            }
            Ok(())
        }
    }

    fn listener(fail: bool) -> (CountingListener, Arc<AtomicUsize>) {
        let seen = Arc::new(AtomicUsize::new(0));
        (
            CountingListener {
                seen: seen.clone(),
                fail,
            },
            seen,
        )
    }

    #[test]
    fn test_publish_without_listeners_is_noop() {
        let bus: EventBus<String, CountingListener> = EventBus::new();
        assert!(!bus.has_listeners());
        assert!(bus.publish("posts".to_string()).is_ok());
    }

    #[test]
    fn test_publish_reaches_registered_listener() {
        let bus: EventBus<String, CountingListener> = EventBus::new();
        let (listener, seen) = listener(false);
        let _subscriber = bus.register(listener).unwrap();
        assert!(bus.has_listeners());

        bus.publish("posts".to_string()).unwrap();
        bus.publish("users".to_string()).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_deregister_stops_delivery() {
        let bus: EventBus<String, CountingListener> = EventBus::new();
        let (listener, seen) = listener(false);
        let subscriber = bus.register(listener).unwrap();
        bus.deregister(subscriber).unwrap();

        bus.publish("posts".to_string()).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_handler_failure_is_event_error() {
        let bus: EventBus<String, CountingListener> = EventBus::new();
        let (listener, _seen) = listener(true);
        let _subscriber = bus.register(listener).unwrap();

        let err = bus.publish("posts".to_string()).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::EventError);
    }

    #[test]
    fn test_bus_error_mapping() {
        let err = EventBusInner::<String, CountingListener>::bus_error(BasuError::MutexPoisoned);
        assert_eq!(err.kind(), &ErrorKind::EventError);
        assert!(err.message().contains("mutex poisoned"));
    }
}
