use std::sync::Arc;

use tokio::sync::watch;

use common::types::UserId;

/// Source of the currently active account id plus a live feed of switches.
///
/// "Active user" is itself a piece of process state; handles scoped to the
/// active user resolve the concrete id through this service at acquisition
/// time and stay pinned to it afterwards.
#[derive(Clone)]
pub struct AccountService {
    active: Arc<watch::Sender<Option<UserId>>>,
}

impl AccountService {
    pub fn new() -> Self {
        let (active, _) = watch::channel(None);
        Self {
            active: Arc::new(active),
        }
    }

    pub fn with_active(user: UserId) -> Self {
        let service = Self::new();
        service.switch(Some(user));
        service
    }

    /// Make `user` the active account, or clear it with `None`.
    pub fn switch(&self, user: Option<UserId>) {
        self.active.send_replace(user);
    }

    pub fn active_user_id(&self) -> Option<UserId> {
        *self.active.borrow()
    }

    /// Live feed of active-account switches.
    pub fn changes(&self) -> watch::Receiver<Option<UserId>> {
        self.active.subscribe()
    }
}

impl Default for AccountService {
    fn default() -> Self {
        Self::new()
    }
}
