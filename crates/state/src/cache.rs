use std::sync::{Arc, Weak};

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{trace, warn};

use crate::storage::{CompositeKey, StateStorage, StorageUpdate};

/// One committed value together with its backend commit sequence.
#[derive(Clone, Debug)]
pub(crate) struct Commit {
    pub(crate) seq: u64,
    pub(crate) value: Value,
}

/// Live channel and write lock for one (domain, key, scope) entry.
pub(crate) struct StateNode {
    pub(crate) value: watch::Sender<Option<Commit>>,
    pub(crate) write_lock: Mutex<()>,
}

impl StateNode {
    fn new() -> Self {
        let (value, _) = watch::channel(None);
        Self {
            value,
            write_lock: Mutex::new(()),
        }
    }

    /// Route a commit into the channel. The sequence keeps a late feed
    /// delivery from regressing the node or re-notifying subscribers that
    /// already observed the value through a more direct path.
    pub(crate) fn apply(&self, seq: u64, value: Value) {
        self.value.send_if_modified(|current| match current {
            Some(commit) if seq <= commit.seq => false,
            Some(commit) if commit.value == value => {
                commit.seq = seq;
                false
            }
            current => {
                *current = Some(Commit { seq, value });
                true
            }
        });
    }

    /// Seed an empty node from a storage read, without notifying. A value
    /// that already reached the node wins; it is at least as fresh.
    pub(crate) fn seed(&self, persisted: Option<Value>) {
        self.value.send_if_modified(|current| {
            if current.is_none() {
                *current = persisted.map(|value| Commit { seq: 0, value });
            }
            false
        });
    }
}

/// Deduplicates nodes per composite key and keeps them fed from the backend
/// change feed, so every handle for the same (key, scope) pair observes the
/// same channel. One forwarder task per cache; it stops once the cache and
/// all its nodes are gone.
pub(crate) struct StateCache {
    storage: Arc<dyn StateStorage>,
    nodes: Arc<DashMap<CompositeKey, Arc<StateNode>>>,
}

impl StateCache {
    /// Must be called from within a tokio runtime; spawns the feed forwarder.
    pub(crate) fn new(storage: Arc<dyn StateStorage>) -> Self {
        let nodes: Arc<DashMap<CompositeKey, Arc<StateNode>>> = Arc::new(DashMap::new());
        spawn_forwarder(Arc::clone(&storage), Arc::downgrade(&nodes));
        Self { storage, nodes }
    }

    pub(crate) fn storage(&self) -> Arc<dyn StateStorage> {
        Arc::clone(&self.storage)
    }

    pub(crate) fn node(&self, key: &CompositeKey) -> Arc<StateNode> {
        self.nodes
            .entry(key.clone())
            .or_insert_with(|| Arc::new(StateNode::new()))
            .clone()
    }
}

fn spawn_forwarder(
    storage: Arc<dyn StateStorage>,
    nodes: Weak<DashMap<CompositeKey, Arc<StateNode>>>,
) {
    let mut feed = storage.updates();
    tokio::spawn(async move {
        // Commit sequences are consecutive per backend, so the count of
        // skipped messages tells us how far ahead storage already is.
        let mut last_seq = 0u64;
        loop {
            match feed.recv().await {
                Ok(update) => {
                    let Some(nodes) = nodes.upgrade() else { break };
                    last_seq = update.seq;
                    route(&nodes, update);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "state change feed lagged, resyncing from storage");
                    let Some(nodes) = nodes.upgrade() else { break };
                    last_seq += skipped;
                    resync(storage.as_ref(), &nodes, &mut feed, &mut last_seq).await;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

fn route(nodes: &DashMap<CompositeKey, Arc<StateNode>>, update: StorageUpdate) {
    if let Some(node) = nodes.get(&update.key) {
        trace!(key = %update.key.storage_key(), seq = update.seq, "state commit");
        node.apply(update.seq, update.value);
    }
}

/// A lagged feed may have dropped the only commit for some key, so warn-and-
/// continue would leave that key's subscribers stale forever. Drain whatever
/// is still queued, then re-read storage for every live node.
async fn resync(
    storage: &dyn StateStorage,
    nodes: &DashMap<CompositeKey, Arc<StateNode>>,
    feed: &mut broadcast::Receiver<StorageUpdate>,
    last_seq: &mut u64,
) {
    loop {
        match feed.try_recv() {
            Ok(update) => {
                *last_seq = update.seq;
                route(nodes, update);
            }
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                *last_seq += skipped;
            }
            Err(_) => break,
        }
    }

    // Snapshot the entries first; a storage read must not await while a
    // dashmap shard guard is held.
    let entries: Vec<(CompositeKey, Arc<StateNode>)> = nodes
        .iter()
        .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
        .collect();
    for (key, node) in entries {
        match storage.get(&key).await {
            Ok(Some(value)) => node.apply(*last_seq, value),
            Ok(None) => {}
            Err(e) => warn!(key = %key.storage_key(), error = %e, "resync read failed"),
        }
    }
}
