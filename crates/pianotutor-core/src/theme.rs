//! Persisted light/dark/system theme preference.
//!
//! Only the user's choice lives here; palettes belong to the front end.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::storage::{KeyValueStore, KEY_APP_THEME};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    System,
}

impl ThemeMode {
    pub fn name(&self) -> &'static str {
        match self {
            ThemeMode::Light => "Light",
            ThemeMode::Dark => "Dark",
            ThemeMode::System => "System",
        }
    }

    /// Parse a stored or typed name, case-insensitively
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "light" => Some(ThemeMode::Light),
            "dark" => Some(ThemeMode::Dark),
            "system" => Some(ThemeMode::System),
            _ => None,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
            ThemeMode::System => ThemeMode::Light,
        }
    }

    /// Concrete mode once the platform preference is known
    pub fn resolve(&self, system_is_dark: bool) -> Self {
        match self {
            ThemeMode::System if system_is_dark => ThemeMode::Dark,
            ThemeMode::System => ThemeMode::Light,
            other => *other,
        }
    }
}

pub struct ThemeManager {
    storage: Arc<dyn KeyValueStore>,
    current: watch::Sender<ThemeMode>,
}

impl ThemeManager {
    /// Load the saved theme. Missing, unknown or unreadable values fall back
    /// to `System`.
    pub async fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let mode = match storage.get_string(KEY_APP_THEME).await {
            Ok(Some(name)) => ThemeMode::from_str(&name).unwrap_or_default(),
            Ok(None) => ThemeMode::default(),
            Err(e) => {
                warn!(error = %e, "Failed to load saved theme");
                ThemeMode::default()
            }
        };
        debug!(theme = mode.name(), "Theme loaded");

        let (current, _) = watch::channel(mode);
        Self { storage, current }
    }

    pub fn current(&self) -> ThemeMode {
        *self.current.borrow()
    }

    /// Receiver that observes every change
    pub fn subscribe(&self) -> watch::Receiver<ThemeMode> {
        self.current.subscribe()
    }

    /// Switch immediately; persistence failures are logged, not returned.
    pub async fn set(&self, mode: ThemeMode) {
        self.current.send_replace(mode);
        if let Err(e) = self.storage.set_string(KEY_APP_THEME, mode.name()).await {
            warn!(error = %e, theme = mode.name(), "Failed to persist theme");
        }
    }

    pub async fn toggle(&self) -> ThemeMode {
        let next = self.current().toggled();
        self.set(next).await;
        next
    }
}
