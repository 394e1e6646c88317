use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use common::types::UserId;

use crate::definition::KeyDefinition;
use crate::errors::StateError;
use crate::handle::KeyedState;
use crate::providers::Backends;
use crate::storage::{CompositeKey, Scope};

/// Resolves keys against one caller-supplied user id for the handle's
/// entire lifetime.
pub struct SingleUserStateProvider {
    backends: Arc<Backends>,
}

impl SingleUserStateProvider {
    pub(crate) fn new(backends: Arc<Backends>) -> Self {
        Self { backends }
    }

    pub fn get<T>(
        &self,
        user_id: UserId,
        definition: &KeyDefinition<T>,
    ) -> Result<KeyedState<T>, StateError>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        if user_id.is_nil() {
            return Err(StateError::InvalidArgument(
                "a concrete user id is required".into(),
            ));
        }
        let key = CompositeKey::new(definition, Scope::User(user_id));
        let cache = self.backends.cache(definition.location());
        Ok(KeyedState::new(
            key.clone(),
            definition.clone(),
            cache.storage(),
            cache.node(&key),
        ))
    }
}
