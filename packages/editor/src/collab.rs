//! # Collaborators
//!
//! Outside services the editor consumes only through these traits: content
//! generation, persistence of document snapshots, and a key-based record
//! store.

use crate::document::DocumentSnapshot;
use async_trait::async_trait;
use livepage_protocol::Block;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to encode record: {0}")]
    Encode(String),

    #[error("I/O failure: {0}")]
    Io(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    #[error("Generation failed: {0}")]
    Failed(String),

    #[error("Generator returned no blocks")]
    Empty,
}

/// What to generate a page from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateInput {
    pub prompt: String,

    /// Requested section kinds, in page order
    #[serde(default)]
    pub sections: Vec<String>,
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, input: &GenerateInput) -> Result<Vec<Block>, GenerateError>;
}

#[async_trait]
pub trait Persist: Send + Sync {
    async fn persist(&self, snapshot: &DocumentSnapshot) -> Result<(), PersistError>;
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn save(&self, key: &str, value: Value) -> Result<(), PersistError>;
    async fn load(&self, key: &str) -> Result<Option<Value>, PersistError>;
}

/// Persists snapshots as one record of a [`RecordStore`]
pub struct StorePersist<S> {
    store: Arc<S>,
    key: String,
}

impl<S: RecordStore> StorePersist<S> {
    pub fn new(store: Arc<S>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }
}

#[async_trait]
impl<S: RecordStore> Persist for StorePersist<S> {
    async fn persist(&self, snapshot: &DocumentSnapshot) -> Result<(), PersistError> {
        let value =
            serde_json::to_value(snapshot).map_err(|e| PersistError::Encode(e.to_string()))?;
        self.store.save(&self.key, value).await
    }
}

/// In-memory record store. Cloning shares the records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<String, Value>>>,
    saves: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves so far
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn save(&self, key: &str, value: Value) -> Result<(), PersistError> {
        self.lock().insert(key.to_string(), value);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Value>, PersistError> {
        Ok(self.get(key))
    }
}
