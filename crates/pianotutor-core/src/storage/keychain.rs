//! OS keychain backed key-value store.
//!
//! Each slot is stored as its own keychain entry under a shared service
//! name. Integers are kept as decimal strings because the keychain only
//! holds secrets as text.

use futures::future::{BoxFuture, FutureExt};
use keyring::Entry;

use super::{KeyValueStore, StorageError, StorageResult};

/// Keychain service name used when none is configured
pub const DEFAULT_SERVICE_NAME: &str = "pianotutor";

pub struct KeyringStore {
    service: String,
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NAME)
    }
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    async fn read(&self, key: &str) -> StorageResult<Option<String>> {
        let service = self.service.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || -> StorageResult<Option<String>> {
            let entry = Entry::new(&service, &key)?;
            match entry.get_password() {
                Ok(value) => Ok(Some(value)),
                Err(keyring::Error::NoEntry) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await?
    }

    async fn write(&self, key: &str, value: String) -> StorageResult<()> {
        let service = self.service.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || -> StorageResult<()> {
            Entry::new(&service, &key)?.set_password(&value)?;
            Ok(())
        })
        .await?
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let service = self.service.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || -> StorageResult<()> {
            match Entry::new(&service, &key)?.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(e.into()),
            }
        })
        .await?
    }
}

fn parse_i64(key: &str, raw: &str) -> StorageResult<i64> {
    raw.trim().parse().map_err(|_| StorageError::TypeMismatch {
        key: key.to_string(),
        expected: "integer",
    })
}

impl KeyValueStore for KeyringStore {
    fn get_string<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<Option<String>>> {
        self.read(key).boxed()
    }

    fn get_i64<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<Option<i64>>> {
        async move {
            match self.read(key).await? {
                Some(raw) => parse_i64(key, &raw).map(Some),
                None => Ok(None),
            }
        }
        .boxed()
    }

    fn set_string<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, StorageResult<()>> {
        self.write(key, value.to_string()).boxed()
    }

    fn set_i64<'a>(&'a self, key: &'a str, value: i64) -> BoxFuture<'a, StorageResult<()>> {
        self.write(key, value.to_string()).boxed()
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<()>> {
        self.delete(key).boxed()
    }
}
