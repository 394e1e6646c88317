//! The four storage-location resolvers.
//!
//! One capability, four variants selected at the call site: the active user,
//! a specific user, the process-wide scope, or a derived view over another
//! handle.

mod active_user;
mod derived;
mod global;
mod single_user;

pub use active_user::ActiveUserStateProvider;
pub use derived::{DeriveDefinition, DerivedState, DerivedStateProvider, DerivedSubscription};
pub use global::GlobalStateProvider;
pub use single_user::SingleUserStateProvider;

use std::sync::Arc;

use crate::cache::StateCache;
use crate::definition::StorageLocation;
use crate::storage::StateStorage;

/// Disk- and memory-located keys route to different backends; each backend
/// sits behind one cache so nodes are shared across all resolvers.
pub(crate) struct Backends {
    disk: StateCache,
    memory: StateCache,
}

impl Backends {
    pub(crate) fn new(disk: Arc<dyn StateStorage>, memory: Arc<dyn StateStorage>) -> Self {
        Self {
            disk: StateCache::new(disk),
            memory: StateCache::new(memory),
        }
    }

    pub(crate) fn cache(&self, location: StorageLocation) -> &StateCache {
        match location {
            StorageLocation::Disk => &self.disk,
            StorageLocation::Memory => &self.memory,
        }
    }
}
