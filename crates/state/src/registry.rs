use std::collections::HashMap;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::definition::{KeyDefinition, StateDefinition};
use crate::errors::StateError;

/// Guards (domain, key) uniqueness across the process. Registering the same
/// pair twice is a configuration error and fatal at startup.
pub struct KeyRegistry {
    entries: DashMap<(&'static str, &'static str), ()>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn register<T>(
        &self,
        state: StateDefinition,
        key: &'static str,
        default: impl Fn() -> T + Send + Sync + 'static,
    ) -> Result<KeyDefinition<T>, StateError> {
        if self.entries.insert((state.name(), key), ()).is_some() {
            return Err(StateError::Configuration(format!(
                "state key already registered: {}/{}",
                state.name(),
                key
            )));
        }
        Ok(KeyDefinition::new(state, key, default))
    }

    /// Register a "record of id -> value" key with an empty-map default.
    pub fn register_record<V: 'static>(
        &self,
        state: StateDefinition,
        key: &'static str,
    ) -> Result<KeyDefinition<HashMap<String, V>>, StateError> {
        self.register(state, key, HashMap::new)
    }
}

impl Default for KeyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: Lazy<KeyRegistry> = Lazy::new(KeyRegistry::new);

/// Process-wide registry, used by keys declared in `Lazy` statics.
pub fn global() -> &'static KeyRegistry {
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::StorageLocation;

    const DOMAIN_A: StateDefinition = StateDefinition::new("domain_a", StorageLocation::Memory);
    const DOMAIN_B: StateDefinition = StateDefinition::new("domain_b", StorageLocation::Memory);

    #[test]
    fn duplicate_registration_is_a_configuration_error() {
        let registry = KeyRegistry::new();
        registry
            .register(DOMAIN_A, "widgets", || 0u32)
            .expect("first registration");
        let err = registry
            .register(DOMAIN_A, "widgets", || 0u32)
            .expect_err("duplicate registration");
        assert!(matches!(err, StateError::Configuration(_)));
    }

    #[test]
    fn record_registration_defaults_to_empty_map() {
        let registry = KeyRegistry::new();
        let key = registry
            .register_record::<String>(DOMAIN_A, "records")
            .expect("record registration");
        assert!(key.default_value().is_empty());
    }

    #[test]
    fn same_key_in_different_domains_is_fine() {
        let registry = KeyRegistry::new();
        registry
            .register(DOMAIN_A, "widgets", || 0u32)
            .expect("domain a");
        registry
            .register(DOMAIN_B, "widgets", || 0u32)
            .expect("domain b");
    }
}
