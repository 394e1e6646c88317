use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::definition::KeyDefinition;
use crate::handle::KeyedState;
use crate::providers::Backends;
use crate::storage::{CompositeKey, Scope};

/// Resolves keys against the single process-wide scope, independent of any
/// user.
pub struct GlobalStateProvider {
    backends: Arc<Backends>,
}

impl GlobalStateProvider {
    pub(crate) fn new(backends: Arc<Backends>) -> Self {
        Self { backends }
    }

    pub fn get<T>(&self, definition: &KeyDefinition<T>) -> KeyedState<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let key = CompositeKey::new(definition, Scope::Global);
        let cache = self.backends.cache(definition.location());
        KeyedState::new(
            key.clone(),
            definition.clone(),
            cache.storage(),
            cache.node(&key),
        )
    }
}
