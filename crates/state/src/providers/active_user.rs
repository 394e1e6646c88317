use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;

use common::types::UserId;

use crate::account::AccountService;
use crate::definition::KeyDefinition;
use crate::errors::StateError;
use crate::handle::KeyedState;
use crate::providers::{Backends, SingleUserStateProvider};

/// Resolves keys against whichever account is active when `get` is called.
///
/// The resolver itself always reflects the live active account: every call
/// re-reads it. The returned handle, however, is pinned to the concrete
/// user resolved at that moment and keeps tracking it even if the active
/// account changes afterwards.
pub struct ActiveUserStateProvider {
    accounts: AccountService,
    single: SingleUserStateProvider,
}

impl ActiveUserStateProvider {
    pub(crate) fn new(accounts: AccountService, backends: Arc<Backends>) -> Self {
        Self {
            accounts,
            single: SingleUserStateProvider::new(backends),
        }
    }

    pub fn get<T>(&self, definition: &KeyDefinition<T>) -> Result<KeyedState<T>, StateError>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let user = self
            .accounts
            .active_user_id()
            .ok_or_else(|| StateError::InvalidArgument("no active account".into()))?;
        self.single.get(user, definition)
    }

    pub fn active_user_id(&self) -> Option<UserId> {
        self.accounts.active_user_id()
    }

    /// Live feed of active-account switches, for consumers that want to
    /// re-resolve instead of staying pinned.
    pub fn active_user_changes(&self) -> watch::Receiver<Option<UserId>> {
        self.accounts.changes()
    }
}
