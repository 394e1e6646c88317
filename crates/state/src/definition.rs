use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Persistence class of a storage domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageLocation {
    Disk,
    Memory,
}

/// A named storage domain bound to a persistence class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StateDefinition {
    name: &'static str,
    location: StorageLocation,
}

impl StateDefinition {
    pub const fn new(name: &'static str, location: StorageLocation) -> Self {
        Self { name, location }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn location(&self) -> StorageLocation {
        self.location
    }
}

/// Identifies one typed storage location: a domain, a key name unique within
/// that domain, and the default value hydrated when nothing is persisted.
///
/// Definitions are cheap to clone and carry no storage themselves. Uniqueness
/// of the (domain, key) pair is enforced by [`crate::registry::KeyRegistry`].
pub struct KeyDefinition<T> {
    state: StateDefinition,
    key: &'static str,
    default: Arc<dyn Fn() -> T + Send + Sync>,
}

impl<T> Clone for KeyDefinition<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state,
            key: self.key,
            default: Arc::clone(&self.default),
        }
    }
}

impl<T> fmt::Debug for KeyDefinition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyDefinition")
            .field("domain", &self.state.name())
            .field("key", &self.key)
            .finish()
    }
}

impl<T> KeyDefinition<T> {
    pub fn new(
        state: StateDefinition,
        key: &'static str,
        default: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            state,
            key,
            default: Arc::new(default),
        }
    }

    pub fn state(&self) -> StateDefinition {
        self.state
    }

    pub fn domain(&self) -> &'static str {
        self.state.name()
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn location(&self) -> StorageLocation {
        self.state.location()
    }

    /// The value observed when nothing has been persisted for a scope.
    pub fn default_value(&self) -> T {
        (self.default)()
    }
}

impl<V: 'static> KeyDefinition<HashMap<String, V>> {
    /// Convenience constructor for "record of id -> value" keys. Absent
    /// state hydrates to an empty mapping; insertion order is not
    /// significant.
    pub fn record(state: StateDefinition, key: &'static str) -> Self {
        Self::new(state, key, HashMap::new)
    }
}
