//! Record store backed by one JSON file per key

use async_trait::async_trait;
use livepage_editor::{PersistError, RecordStore};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Saves through one store run one at a time, in call order. Sessions
/// sharing a store share one staging file per key.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    writes: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            writes: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, PersistError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(PersistError::Unavailable(format!("invalid record key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn save(&self, key: &str, value: Value) -> Result<(), PersistError> {
        let path = self.path_for(key)?;
        let body =
            serde_json::to_vec_pretty(&value).map_err(|e| PersistError::Encode(e.to_string()))?;

        let _write = self.writes.lock().await;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PersistError::Io(e.to_string()))?;

        // Staged write, then rename into place
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, body)
            .await
            .map_err(|e| PersistError::Io(e.to_string()))?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|e| PersistError::Io(e.to_string()))?;

        tracing::debug!(path = %path.display(), "Saved record");
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Value>, PersistError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| PersistError::Io(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistError::Io(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested"));

        store.save("page", json!({"primary": []})).await.unwrap();
        assert_eq!(store.load("page").await.unwrap(), Some(json!({"primary": []})));
        assert!(dir.path().join("nested/page.json").exists());
        assert!(!dir.path().join("nested/page.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_concurrent_saves_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(JsonFileStore::new(dir.path()));

        let saves: Vec<_> = (0..8)
            .map(|n| {
                let store = store.clone();
                tokio::spawn(async move { store.save("page", json!({ "n": n })).await })
            })
            .collect();
        for save in saves {
            save.await.unwrap().unwrap();
        }

        let saved = store.load("page").await.unwrap().unwrap();
        assert!(saved["n"].as_i64().is_some());
        assert!(!dir.path().join("page.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert_eq!(store.load("page").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_path_like_keys_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        for key in ["../escape", "a/b", ""] {
            assert!(matches!(
                store.save(key, json!(1)).await,
                Err(PersistError::Unavailable(_))
            ));
        }
    }
}
