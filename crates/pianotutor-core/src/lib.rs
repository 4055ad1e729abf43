//! pianotutor core: session store, authenticated API client and storage.
//!
//! Wiring for a front end:
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use pianotutor_core::{open_storage, AuthService, Config};
//!
//! let config = Config::load()?;
//! let storage = open_storage(&config)?;
//! let auth = AuthService::connect(&config, storage).await?;
//! auth.login("ada", "correct horse").await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod storage;
pub mod theme;

use std::sync::Arc;

use anyhow::Result;

pub use api::{ApiClient, ApiError, RequestOutcome, SuccessConvention};
pub use auth::{AuthError, AuthService, ExpiryPolicy, SessionStore};
pub use config::{Config, StorageBackend};
pub use storage::{JsonFileStore, KeyValueStore, KeyringStore, MemoryStore};
pub use theme::{ThemeManager, ThemeMode};

/// Durable storage selected by the configuration
pub fn open_storage(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    let storage: Arc<dyn KeyValueStore> = match config.storage {
        StorageBackend::File => Arc::new(JsonFileStore::in_dir(&config.data_dir()?)),
        StorageBackend::Keyring => Arc::new(KeyringStore::default()),
    };
    Ok(storage)
}
