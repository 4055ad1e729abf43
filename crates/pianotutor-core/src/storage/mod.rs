//! Durable key-value storage behind the session store and preferences.
//!
//! The session core only needs a tiny contract: read a slot (absent reads as
//! `None`), upsert a slot, delete a slot. `KeyValueStore` captures that
//! contract so the engine can be swapped without touching the session logic.
//!
//! Engines:
//! - `JsonFileStore`: a JSON object on disk, written atomically
//! - `KeyringStore`: one OS keychain entry per key
//! - `MemoryStore`: process-local, nothing survives a restart

pub mod file;
pub mod keychain;
pub mod memory;

use futures::future::BoxFuture;
use thiserror::Error;

pub use file::JsonFileStore;
pub use keychain::KeyringStore;
pub use memory::MemoryStore;

/// Slot holding the bearer token.
pub const KEY_TOKEN: &str = "token";

/// Slot holding the epoch-millis time the token was stored.
pub const KEY_TOKEN_TIMESTAMP: &str = "token_timestamp";

/// Slot holding the selected theme name.
pub const KEY_APP_THEME: &str = "app_theme";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Keychain access failed: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Value for key '{key}' is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Minimal get/set/remove contract over string and integer slots.
///
/// Methods return boxed `Send` futures so the store can live behind
/// `Arc<dyn KeyValueStore>` and be driven from spawned tasks.
pub trait KeyValueStore: Send + Sync {
    fn get_string<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<Option<String>>>;

    fn get_i64<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<Option<i64>>>;

    fn set_string<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, StorageResult<()>>;

    fn set_i64<'a>(&'a self, key: &'a str, value: i64) -> BoxFuture<'a, StorageResult<()>>;

    /// Delete a slot. Removing a slot that does not exist is not an error.
    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<()>>;
}
