use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;

use crate::cache::{Commit, StateNode};
use crate::definition::KeyDefinition;
use crate::errors::StateError;
use crate::storage::{CompositeKey, StateStorage};

/// Live handle bound to one (key definition, scope) pair.
///
/// All handles constructed for the same pair share one underlying node, so
/// an update through any of them is observed by every subscriber, including
/// the writer.
pub struct KeyedState<T> {
    key: CompositeKey,
    definition: KeyDefinition<T>,
    storage: Arc<dyn StateStorage>,
    node: Arc<StateNode>,
}

impl<T> Clone for KeyedState<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            definition: self.definition.clone(),
            storage: Arc::clone(&self.storage),
            node: Arc::clone(&self.node),
        }
    }
}

impl<T> KeyedState<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub(crate) fn new(
        key: CompositeKey,
        definition: KeyDefinition<T>,
        storage: Arc<dyn StateStorage>,
        node: Arc<StateNode>,
    ) -> Self {
        Self {
            key,
            definition,
            storage,
            node,
        }
    }

    pub fn composite_key(&self) -> &CompositeKey {
        &self.key
    }

    fn decode(&self, value: Option<Value>) -> Result<T, StateError> {
        decode_or_default(&self.definition, value)
    }

    /// Snapshot of the current committed value. Absent state decodes to the
    /// key's declared default and is never an error.
    pub async fn get(&self) -> Result<T, StateError> {
        let value = self.storage.get(&self.key).await?;
        self.decode(value)
    }

    /// Subscribe to the live value: the value current at subscription time
    /// is replayed first, then one emission follows every committed update.
    /// Each subscription is independent; dropping it releases the channel.
    pub async fn changes(&self) -> Result<StateSubscription<T>, StateError> {
        let mut rx = self.node.value.subscribe();
        let persisted = self.storage.get(&self.key).await?;
        // Seed the node from the storage read so a later feed delivery of
        // that same commit is recognized as already seen instead of waking
        // the subscriber a second time. A value that reached the node first
        // wins; it is at least as fresh.
        self.node.seed(persisted);
        let initial = rx.borrow_and_update().clone().map(|commit| commit.value);
        Ok(StateSubscription {
            rx,
            definition: self.definition.clone(),
            replay: Some(initial),
        })
    }

    /// Atomic read-modify-write: reads the current value (or default),
    /// applies `f`, persists the result, and notifies subscribers.
    ///
    /// Concurrent updates against the same (key, scope) pair serialize
    /// behind the node lock, so the second caller always sees the first
    /// caller's result. Backend failures surface as-is; nothing is retried.
    pub async fn update<F>(&self, f: F) -> Result<T, StateError>
    where
        F: FnOnce(T) -> T + Send,
    {
        let _guard = self.node.write_lock.lock().await;
        let current = self.decode(self.storage.get(&self.key).await?)?;
        let next = f(current);
        let value =
            serde_json::to_value(&next).map_err(|e| StateError::Persistence(e.to_string()))?;
        let seq = self.storage.set(&self.key, value.clone()).await?;
        // Feed the node directly while the lock is still held; subscribers
        // must not depend on the feed task having caught up.
        self.node.apply(seq, value);
        Ok(next)
    }
}

/// One subscriber's view of a keyed state: replay of the current value,
/// then live committed updates.
pub struct StateSubscription<T> {
    rx: watch::Receiver<Option<Commit>>,
    definition: KeyDefinition<T>,
    replay: Option<Option<Value>>,
}

impl<T> StateSubscription<T>
where
    T: DeserializeOwned,
{
    /// Next value in the sequence. The first call resolves immediately with
    /// the value current at subscription time; later calls wait for commits.
    pub async fn recv(&mut self) -> Result<T, StateError> {
        let value = match self.replay.take() {
            Some(initial) => initial,
            None => {
                self.rx
                    .changed()
                    .await
                    .map_err(|_| StateError::Closed("state node dropped".into()))?;
                self.rx.borrow_and_update().clone().map(|commit| commit.value)
            }
        };
        decode_or_default(&self.definition, value)
    }
}

fn decode_or_default<T: DeserializeOwned>(
    definition: &KeyDefinition<T>,
    value: Option<Value>,
) -> Result<T, StateError> {
    match value {
        Some(v) => {
            serde_json::from_value(v).map_err(|e| StateError::Deserialization(e.to_string()))
        }
        None => Ok(definition.default_value()),
    }
}
