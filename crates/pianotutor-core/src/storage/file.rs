//! JSON-file backed key-value store.
//!
//! All slots live in one JSON object. Every mutation is a read-modify-write
//! of the whole file, serialized by an async mutex and executed on the
//! blocking pool. The new contents are written to a sibling temp file and
//! renamed over the original so a crash never leaves a half-written file.

use std::path::{Path, PathBuf};

use futures::future::{BoxFuture, FutureExt};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::debug;

use super::{KeyValueStore, StorageError, StorageResult};

/// Preferences file name in the data directory
pub const PREFERENCES_FILE: &str = "preferences.json";

type Slots = Map<String, Value>;

pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Store backed by `preferences.json` inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(PREFERENCES_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_slots(path: &Path) -> StorageResult<Slots> {
        if !path.exists() {
            return Ok(Slots::new());
        }
        let contents = std::fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Slots::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn save_slots(path: &Path, slots: &Slots) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(slots)?;
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    async fn read_slot(&self, key: &str) -> StorageResult<Option<Value>> {
        let path = self.path.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || -> StorageResult<Option<Value>> {
            let mut slots = Self::load_slots(&path)?;
            Ok(slots.remove(&key))
        })
        .await?
    }

    async fn update<F>(&self, key: &str, apply: F) -> StorageResult<()>
    where
        F: FnOnce(&mut Slots) + Send + 'static,
    {
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> StorageResult<()> {
            let mut slots = Self::load_slots(&path)?;
            apply(&mut slots);
            Self::save_slots(&path, &slots)
        })
        .await??;
        debug!(key, path = %self.path.display(), "Preferences file updated");
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_string<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<Option<String>>> {
        async move {
            match self.read_slot(key).await? {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) => Ok(Some(s)),
                Some(_) => Err(StorageError::TypeMismatch {
                    key: key.to_string(),
                    expected: "string",
                }),
            }
        }
        .boxed()
    }

    fn get_i64<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<Option<i64>>> {
        async move {
            match self.read_slot(key).await? {
                None | Some(Value::Null) => Ok(None),
                Some(value) => value.as_i64().map(Some).ok_or_else(|| StorageError::TypeMismatch {
                    key: key.to_string(),
                    expected: "integer",
                }),
            }
        }
        .boxed()
    }

    fn set_string<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, StorageResult<()>> {
        let owned_key = key.to_string();
        let value = Value::String(value.to_string());
        self.update(key, move |slots| {
            slots.insert(owned_key, value);
        })
        .boxed()
    }

    fn set_i64<'a>(&'a self, key: &'a str, value: i64) -> BoxFuture<'a, StorageResult<()>> {
        let owned_key = key.to_string();
        self.update(key, move |slots| {
            slots.insert(owned_key, Value::from(value));
        })
        .boxed()
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<()>> {
        let owned_key = key.to_string();
        self.update(key, move |slots| {
            slots.remove(&owned_key);
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        assert_eq!(store.get_string("token").await.unwrap(), None);
        assert_eq!(store.get_i64("token_timestamp").await.unwrap(), None);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_values_survive_a_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonFileStore::in_dir(dir.path());
            store.set_string("token", "abc").await.unwrap();
            store.set_i64("token_timestamp", 1_700_000_000_000).await.unwrap();
        }

        let reopened = JsonFileStore::in_dir(dir.path());
        assert_eq!(reopened.get_string("token").await.unwrap().as_deref(), Some("abc"));
        assert_eq!(
            reopened.get_i64("token_timestamp").await.unwrap(),
            Some(1_700_000_000_000)
        );
    }

    #[tokio::test]
    async fn test_remove_keeps_other_slots() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        store.set_string("token", "abc").await.unwrap();
        store.set_string("app_theme", "Dark").await.unwrap();

        store.remove("token").await.unwrap();
        store.remove("never_set").await.unwrap();

        assert_eq!(store.get_string("token").await.unwrap(), None);
        assert_eq!(store.get_string("app_theme").await.unwrap().as_deref(), Some("Dark"));
        assert!(!dir.path().join("preferences.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(
            store.get_string("token").await,
            Err(StorageError::Json(_))
        ));
    }

    #[tokio::test]
    async fn test_wrong_type_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        store.set_string("token_timestamp", "yesterday").await.unwrap();
        assert!(matches!(
            store.get_i64("token_timestamp").await,
            Err(StorageError::TypeMismatch { expected: "integer", .. })
        ));
    }
}
