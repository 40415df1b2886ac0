use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// A handle to a named lock that can be stored and reused
#[derive(Clone)]
pub struct LockHandle {
    lock: Arc<Mutex<()>>,
}

impl LockHandle {
    /// Creates a new, unregistered lock handle.
    pub fn new() -> Self {
        LockHandle {
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Acquires the lock, blocking until it is available.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock()
    }
}

impl Default for LockHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry of named locks, one per collection id.
///
/// Two change events for the same collection must observe a consistent
/// `(old, new)` pair, so the listener holds the collection's lock from the
/// snapshot lookup until the snapshot entry is committed. Events for
/// different collections use different locks and proceed in parallel.
///
/// Locks are never removed: a handle dropped from the registry while held
/// would let a later event for the same id run unserialized.
///
/// # Examples
///
/// ```
/// use automigrate::common::LockRegistry;
///
/// let registry = LockRegistry::new();
/// let handle = registry.get_lock("pbc_posts");
/// {
///     let _guard = handle.lock();
/// } // released here
/// assert_eq!(registry.lock_count(), 1);
/// ```
#[derive(Clone)]
pub struct LockRegistry {
    locks: Arc<RwLock<HashMap<String, Arc<Mutex<()>>>>>,
}

impl LockRegistry {
    /// Creates a new empty lock registry.
    pub fn new() -> Self {
        LockRegistry {
            locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Gets the lock for the given name, creating it on first use.
    pub fn get_lock(&self, name: &str) -> LockHandle {
        if let Some(lock) = self.locks.read().get(name) {
            return LockHandle { lock: lock.clone() };
        }

        let lock = {
            let mut locks = self.locks.write();
            locks
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        LockHandle { lock }
    }

    /// Returns the number of locks currently registered.
    pub fn lock_count(&self) -> usize {
        self.locks.read().len()
    }
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::new()
    }
}
