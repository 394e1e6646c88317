use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use common::types::UserId;

use crate::account::AccountService;
use crate::definition::KeyDefinition;
use crate::errors::StateError;
use crate::handle::{KeyedState, StateSubscription};
use crate::providers::{
    ActiveUserStateProvider, Backends, DeriveDefinition, DerivedState, DerivedStateProvider,
    GlobalStateProvider, SingleUserStateProvider,
};
use crate::storage::{MemoryStorage, StateStorage};

/// Single entry point used by domain services to obtain state handles
/// without knowing which resolver backs a given key. Pure routing; holds no
/// state of its own.
pub struct StateProvider {
    global: GlobalStateProvider,
    single: SingleUserStateProvider,
    active: ActiveUserStateProvider,
    derived: DerivedStateProvider,
    accounts: AccountService,
}

impl StateProvider {
    /// Wire the resolvers over a disk and a memory backend. Must be called
    /// from within a tokio runtime; the backend caches spawn their change
    /// feed forwarders.
    pub fn new(
        disk: Arc<dyn StateStorage>,
        memory: Arc<dyn StateStorage>,
        accounts: AccountService,
    ) -> Self {
        let backends = Arc::new(Backends::new(disk, memory));
        Self {
            global: GlobalStateProvider::new(Arc::clone(&backends)),
            single: SingleUserStateProvider::new(Arc::clone(&backends)),
            active: ActiveUserStateProvider::new(accounts.clone(), backends),
            derived: DerivedStateProvider::new(),
            accounts,
        }
    }

    /// Memory-only provider; handy for tests and ephemeral processes.
    pub fn in_memory(accounts: AccountService) -> Self {
        Self::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(MemoryStorage::new()),
            accounts,
        )
    }

    pub fn get_global<T>(&self, definition: &KeyDefinition<T>) -> KeyedState<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        self.global.get(definition)
    }

    pub fn get_user<T>(
        &self,
        user_id: UserId,
        definition: &KeyDefinition<T>,
    ) -> Result<KeyedState<T>, StateError>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        self.single.get(user_id, definition)
    }

    pub fn get_active<T>(&self, definition: &KeyDefinition<T>) -> Result<KeyedState<T>, StateError>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        self.active.get(definition)
    }

    /// Resolve against the given user when provided, otherwise against the
    /// currently active one.
    pub fn get_user_or_active<T>(
        &self,
        user_id: Option<UserId>,
        definition: &KeyDefinition<T>,
    ) -> Result<KeyedState<T>, StateError>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        match user_id {
            Some(id) => self.get_user(id, definition),
            None => self.get_active(definition),
        }
    }

    pub fn get_derived<TFrom, TTo>(
        &self,
        parent: StateSubscription<TFrom>,
        definition: DeriveDefinition<TFrom, TTo>,
    ) -> DerivedState<TTo>
    where
        TFrom: DeserializeOwned + Send + Sync + 'static,
        TTo: Clone + Send + Sync + 'static,
    {
        self.derived.get(parent, definition)
    }

    pub fn active_user_id(&self) -> Option<UserId> {
        self.accounts.active_user_id()
    }

    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }
}
