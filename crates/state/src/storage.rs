use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::sync::{broadcast, Mutex};

use common::types::UserId;

use crate::definition::KeyDefinition;
use crate::errors::StateError;

/// Who a storage entry belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    User(UserId),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::User(id) => write!(f, "user:{id}"),
        }
    }
}

/// Full address of one stored value: (domain, key, scope).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CompositeKey {
    pub domain: String,
    pub key: String,
    pub scope: Scope,
}

impl CompositeKey {
    pub fn new<T>(definition: &KeyDefinition<T>, scope: Scope) -> Self {
        Self {
            domain: definition.domain().to_string(),
            key: definition.key().to_string(),
            scope,
        }
    }

    /// Flat addressing key used by the backends.
    pub fn storage_key(&self) -> String {
        format!("{}/{}/{}", self.domain, self.key, self.scope)
    }
}

/// Fired after every successful `set`; drives live subscriptions across
/// independent handle instances. Sequences are consecutive per backend and
/// let consumers order deliveries against values they read directly.
#[derive(Clone, Debug)]
pub struct StorageUpdate {
    pub seq: u64,
    pub key: CompositeKey,
    pub value: Value,
}

/// Key-value JSON store addressed by composite key. Reads are lock-free and
/// always reflect the latest committed value; writes serialize internally.
#[async_trait]
pub trait StateStorage: Send + Sync {
    async fn get(&self, key: &CompositeKey) -> Result<Option<Value>, StateError>;
    /// Commit a value and return its backend commit sequence.
    async fn set(&self, key: &CompositeKey, value: Value) -> Result<u64, StateError>;
    /// Change feed fired after every successful `set`.
    fn updates(&self) -> broadcast::Receiver<StorageUpdate>;
}

pub const DEFAULT_CHANGE_FEED_CAPACITY: usize = 256;

/// In-process store for memory-located domains.
pub struct MemoryStorage {
    snapshot: ArcSwap<HashMap<String, Value>>,
    write_lock: Mutex<()>,
    seq: AtomicU64,
    events: broadcast::Sender<StorageUpdate>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANGE_FEED_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self {
            snapshot: ArcSwap::from_pointee(HashMap::new()),
            write_lock: Mutex::new(()),
            seq: AtomicU64::new(0),
            events,
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStorage for MemoryStorage {
    async fn get(&self, key: &CompositeKey) -> Result<Option<Value>, StateError> {
        Ok(self.snapshot.load().get(&key.storage_key()).cloned())
    }

    async fn set(&self, key: &CompositeKey, value: Value) -> Result<u64, StateError> {
        let _guard = self.write_lock.lock().await;
        let mut next = self.snapshot.load().as_ref().clone();
        next.insert(key.storage_key(), value.clone());
        self.snapshot.store(Arc::new(next));
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        // Send while still holding the lock so the feed observes commits in
        // commit order. A send error only means nobody is listening.
        let _ = self.events.send(StorageUpdate {
            seq,
            key: key.clone(),
            value,
        });
        Ok(seq)
    }

    fn updates(&self) -> broadcast::Receiver<StorageUpdate> {
        self.events.subscribe()
    }
}

/// JSON file-backed store for disk-located domains.
///
/// Persists the whole composite-key map as one JSON document and rewrites it
/// on every committed `set`. Intended for client-side state where a database
/// is overkill.
pub struct FileStorage {
    snapshot: ArcSwap<HashMap<String, Value>>,
    write_lock: Mutex<()>,
    seq: AtomicU64,
    events: broadcast::Sender<StorageUpdate>,
    file_path: PathBuf,
}

impl FileStorage {
    /// Initialize the store from a path. Creates the file with an empty map
    /// if missing; a present but malformed file surfaces as a
    /// deserialization failure rather than being silently discarded.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, StateError> {
        Self::with_capacity(path, DEFAULT_CHANGE_FEED_CAPACITY).await
    }

    pub async fn with_capacity<P: Into<PathBuf>>(
        path: P,
        capacity: usize,
    ) -> Result<Arc<Self>, StateError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await.ok();
        }

        let map: HashMap<String, Value> = match fs::read(&file_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StateError::Deserialization(e.to_string()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let empty: HashMap<String, Value> = HashMap::new();
                fs::write(
                    &file_path,
                    serde_json::to_vec(&empty).map_err(|e| StateError::Persistence(e.to_string()))?,
                )
                .await
                .map_err(|e| StateError::Persistence(e.to_string()))?;
                empty
            }
            // Any other read failure may hide an intact file; bootstrapping
            // over it would destroy persisted state.
            Err(e) => return Err(StateError::Persistence(e.to_string())),
        };

        let (events, _) = broadcast::channel(capacity);
        Ok(Arc::new(Self {
            snapshot: ArcSwap::from_pointee(map),
            write_lock: Mutex::new(()),
            seq: AtomicU64::new(0),
            events,
            file_path,
        }))
    }

    async fn save(&self, map: &HashMap<String, Value>) -> Result<(), StateError> {
        let data = serde_json::to_vec(map).map_err(|e| StateError::Persistence(e.to_string()))?;
        fs::write(&self.file_path, data)
            .await
            .map_err(|e| StateError::Persistence(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl StateStorage for FileStorage {
    async fn get(&self, key: &CompositeKey) -> Result<Option<Value>, StateError> {
        Ok(self.snapshot.load().get(&key.storage_key()).cloned())
    }

    async fn set(&self, key: &CompositeKey, value: Value) -> Result<u64, StateError> {
        let _guard = self.write_lock.lock().await;
        let mut next = self.snapshot.load().as_ref().clone();
        next.insert(key.storage_key(), value.clone());
        // Persist before publishing; a failed write must not become visible.
        self.save(&next).await?;
        self.snapshot.store(Arc::new(next));
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let _ = self.events.send(StorageUpdate {
            seq,
            key: key.clone(),
            value,
        });
        Ok(seq)
    }

    fn updates(&self) -> broadcast::Receiver<StorageUpdate> {
        self.events.subscribe()
    }
}
