use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::errors::StateError;
use crate::handle::StateSubscription;

/// Names and implements the pure projection applied to a parent state.
pub struct DeriveDefinition<TFrom, TTo> {
    name: &'static str,
    derive: Arc<dyn Fn(&TFrom) -> TTo + Send + Sync>,
}

impl<TFrom, TTo> DeriveDefinition<TFrom, TTo> {
    pub fn new(name: &'static str, derive: impl Fn(&TFrom) -> TTo + Send + Sync + 'static) -> Self {
        Self {
            name,
            derive: Arc::new(derive),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<TFrom, TTo> Clone for DeriveDefinition<TFrom, TTo> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            derive: Arc::clone(&self.derive),
        }
    }
}

impl<TFrom, TTo> fmt::Debug for DeriveDefinition<TFrom, TTo> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeriveDefinition")
            .field("name", &self.name)
            .finish()
    }
}

/// Computes handles whose value is a pure function of a parent handle's
/// emissions. Derived values stay consistent with the stored parent and are
/// never persisted independently.
pub struct DerivedStateProvider;

impl DerivedStateProvider {
    pub(crate) fn new() -> Self {
        Self
    }

    pub fn get<TFrom, TTo>(
        &self,
        mut parent: StateSubscription<TFrom>,
        definition: DeriveDefinition<TFrom, TTo>,
    ) -> DerivedState<TTo>
    where
        TFrom: DeserializeOwned + Send + Sync + 'static,
        TTo: Clone + Send + Sync + 'static,
    {
        let (tx, rx) = watch::channel(None);
        let task = tokio::spawn(async move {
            loop {
                match parent.recv().await {
                    Ok(value) => {
                        let derived = (definition.derive)(&value);
                        trace!(derivation = definition.name(), "recomputed derived value");
                        if tx.send(Some(derived)).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });
        DerivedState { rx, task }
    }
}

/// Live computed state over a parent subscription. Dropping it stops the
/// projection task.
pub struct DerivedState<TTo> {
    rx: watch::Receiver<Option<TTo>>,
    task: JoinHandle<()>,
}

impl<TTo> DerivedState<TTo>
where
    TTo: Clone + Send + Sync + 'static,
{
    /// Latest derived value, once the parent has emitted at least once.
    pub fn current(&self) -> Option<TTo> {
        self.rx.borrow().clone()
    }

    pub fn changes(&self) -> DerivedSubscription<TTo> {
        DerivedSubscription {
            rx: self.rx.clone(),
            replay: true,
        }
    }
}

impl<TTo> Drop for DerivedState<TTo> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// One subscriber's view of a derived state.
pub struct DerivedSubscription<TTo> {
    rx: watch::Receiver<Option<TTo>>,
    replay: bool,
}

impl<TTo> DerivedSubscription<TTo>
where
    TTo: Clone,
{
    /// Next derived value. The first call waits for the parent's initial
    /// emission and resolves with the current projection.
    pub async fn recv(&mut self) -> Result<TTo, StateError> {
        let closed = || StateError::Closed("derived state dropped".into());
        if self.replay {
            self.replay = false;
            let value = self
                .rx
                .wait_for(|value| value.is_some())
                .await
                .map_err(|_| closed())?
                .clone();
            return value.ok_or_else(closed);
        }
        self.rx.changed().await.map_err(|_| closed())?;
        let value = self.rx.borrow_and_update().clone();
        value.ok_or_else(closed)
    }
}
