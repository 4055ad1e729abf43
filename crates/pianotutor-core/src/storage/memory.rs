use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use futures::future::{self, BoxFuture, FutureExt};
use serde_json::Value;

use super::{KeyValueStore, StorageError, StorageResult};

/// In-process store. Useful for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_values<R>(&self, f: impl FnOnce(&mut HashMap<String, Value>) -> R) -> R {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut values)
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.with_values(|values| values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) {
        self.with_values(|values| {
            values.insert(key.to_string(), value);
        });
    }
}

impl KeyValueStore for MemoryStore {
    fn get_string<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<Option<String>>> {
        let result = match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(StorageError::TypeMismatch {
                key: key.to_string(),
                expected: "string",
            }),
        };
        future::ready(result).boxed()
    }

    fn get_i64<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<Option<i64>>> {
        let result = match self.get(key) {
            None => Ok(None),
            Some(value) => value.as_i64().map(Some).ok_or_else(|| StorageError::TypeMismatch {
                key: key.to_string(),
                expected: "integer",
            }),
        };
        future::ready(result).boxed()
    }

    fn set_string<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, StorageResult<()>> {
        self.set(key, Value::String(value.to_string()));
        future::ready(Ok(())).boxed()
    }

    fn set_i64<'a>(&'a self, key: &'a str, value: i64) -> BoxFuture<'a, StorageResult<()>> {
        self.set(key, Value::from(value));
        future::ready(Ok(())).boxed()
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<()>> {
        self.with_values(|values| {
            values.remove(key);
        });
        future::ready(Ok(())).boxed()
    }
}
