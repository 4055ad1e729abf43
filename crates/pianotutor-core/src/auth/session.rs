//! Session store: the single source of truth for "is the user signed in".
//!
//! The token and its issue time live in durable storage, but reads never
//! touch storage. `SessionStore::open` loads both slots once into an
//! in-memory snapshot, and `read()` answers from that snapshot without
//! awaiting, which lets the request pipeline decide synchronously whether to
//! attach a credential. Writes go to storage first and then swap the
//! snapshot.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{Duration, Utc};
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::storage::{KeyValueStore, KEY_TOKEN, KEY_TOKEN_TIMESTAMP};

/// Default token lifetime: 7 days.
pub const DEFAULT_TOKEN_MAX_AGE_DAYS: i64 = 7;

/// Current wall-clock time in epoch millis
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Immutable view of the session. Replaced as a whole, never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub token: Option<String>,
    /// Epoch millis when the token was stored; 0 means never set.
    pub issued_at: i64,
}

impl SessionSnapshot {
    pub fn new(token: String, issued_at: i64) -> Self {
        Self {
            token: Some(token),
            issued_at,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    pub max_age: Duration,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::new(Duration::days(DEFAULT_TOKEN_MAX_AGE_DAYS))
    }
}

impl ExpiryPolicy {
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    pub fn from_secs(secs: u64) -> Self {
        let secs = i64::try_from(secs).unwrap_or(i64::MAX).min(i64::MAX / 1000);
        Self::new(Duration::seconds(secs))
    }

    /// A token is expired when it was never stamped, or when it is strictly
    /// older than `max_age`.
    pub fn is_expired(&self, issued_at: i64, now: i64) -> bool {
        if issued_at == 0 {
            return true;
        }
        now.saturating_sub(issued_at) > self.max_age.num_milliseconds()
    }
}

pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    policy: ExpiryPolicy,
    snapshot: Arc<RwLock<Arc<SessionSnapshot>>>,
    /// Serializes the storage+snapshot pair of each write or clear.
    write_gate: Arc<Mutex<()>>,
    /// Runtime that durable expiry clears are spawned onto, when there is one
    runtime: Option<Handle>,
}

impl SessionStore {
    /// Load the persisted session and return a ready store.
    ///
    /// Storage failures during the load are logged and treated as signed
    /// out. When opened inside a Tokio runtime, expiry clears are later
    /// spawned onto it. Outside one, an expired token is only dropped from
    /// memory and its slots stay in storage until the next write or clear.
    pub async fn open(storage: Arc<dyn KeyValueStore>, policy: ExpiryPolicy) -> Arc<Self> {
        let snapshot = Self::load(storage.as_ref()).await;
        debug!(
            has_token = snapshot.token.is_some(),
            issued_at = snapshot.issued_at,
            "Session loaded"
        );

        Arc::new(Self {
            storage,
            policy,
            snapshot: Arc::new(RwLock::new(Arc::new(snapshot))),
            write_gate: Arc::new(Mutex::new(())),
            runtime: Handle::try_current().ok(),
        })
    }

    async fn load(storage: &dyn KeyValueStore) -> SessionSnapshot {
        let token = match storage.get_string(KEY_TOKEN).await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to load token, treating session as signed out");
                return SessionSnapshot::empty();
            }
        };
        let issued_at = match storage.get_i64(KEY_TOKEN_TIMESTAMP).await {
            Ok(ts) => ts.unwrap_or(0),
            Err(e) => {
                warn!(error = %e, "Failed to load token timestamp");
                0
            }
        };
        SessionSnapshot { token, issued_at }
    }

    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    /// Current cached snapshot, without any expiry check
    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        current_snapshot(&self.snapshot)
    }

    pub fn issued_at(&self) -> i64 {
        self.snapshot().issued_at
    }

    fn replace(&self, next: SessionSnapshot) -> Arc<SessionSnapshot> {
        let next = Arc::new(next);
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&next);
        next
    }

    /// Swap `observed` for an empty snapshot if nothing replaced it since it
    /// was read. Returns the installed snapshot when this caller won.
    fn compare_and_clear(&self, observed: &Arc<SessionSnapshot>) -> Option<Arc<SessionSnapshot>> {
        let mut current = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        if !Arc::ptr_eq(&current, observed) {
            return None;
        }
        let cleared = Arc::new(SessionSnapshot::empty());
        *current = Arc::clone(&cleared);
        Some(cleared)
    }

    /// Valid token, if any. Never awaits.
    ///
    /// An expired token is dropped from the cache immediately and the
    /// durable slots are cleared in the background.
    pub fn read(&self) -> Option<String> {
        self.credential().map(|(token, _)| token)
    }

    /// Valid token together with the snapshot it was taken from.
    ///
    /// The snapshot identifies the session a request was authorized with, so
    /// a rejection can later be applied to that session only.
    pub fn credential(&self) -> Option<(String, Arc<SessionSnapshot>)> {
        let snapshot = self.snapshot();
        let token = snapshot.token.clone()?;

        if !self.policy.is_expired(snapshot.issued_at, now_millis()) {
            return Some((token, snapshot));
        }

        if let Some(cleared) = self.compare_and_clear(&snapshot) {
            info!(issued_at = snapshot.issued_at, "Session token expired");
            self.spawn_expiry_clear(cleared);
        }
        None
    }

    fn spawn_expiry_clear(&self, cleared: Arc<SessionSnapshot>) {
        let Some(runtime) = &self.runtime else {
            warn!("No async runtime to clear the expired session from storage");
            return;
        };
        let storage = Arc::clone(&self.storage);
        let snapshot = Arc::clone(&self.snapshot);
        let gate = Arc::clone(&self.write_gate);
        runtime.spawn(async move {
            let _guard = gate.lock().await;
            if !Arc::ptr_eq(&current_snapshot(&snapshot), &cleared) {
                debug!("Session rewritten before expiry clear ran, skipping");
                return;
            }
            remove_slots(storage.as_ref()).await;
        });
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    /// Expiry under the configured policy
    pub fn is_expired(&self) -> bool {
        self.is_expired_within(self.policy.max_age)
    }

    /// Expiry under an explicit window
    pub fn is_expired_within(&self, max_age: Duration) -> bool {
        ExpiryPolicy::new(max_age).is_expired(self.issued_at(), now_millis())
    }

    /// Store a new token stamped with the current time, or clear the session
    /// when `token` is `None`.
    ///
    /// Storage failures are logged; the in-memory snapshot is updated either
    /// way so this process stays consistent.
    pub async fn write(&self, token: Option<String>) {
        let Some(token) = token else {
            self.clear().await;
            return;
        };

        let _guard = self.write_gate.lock().await;
        let issued_at = now_millis();
        if let Err(e) = self.storage.set_string(KEY_TOKEN, &token).await {
            warn!(error = %e, "Failed to persist token");
        }
        if let Err(e) = self.storage.set_i64(KEY_TOKEN_TIMESTAMP, issued_at).await {
            warn!(error = %e, "Failed to persist token timestamp");
        }
        self.replace(SessionSnapshot::new(token, issued_at));
        debug!(issued_at, "Session token stored");
    }

    /// Remove both durable slots and reset the snapshot
    pub async fn clear(&self) {
        let _guard = self.write_gate.lock().await;
        remove_slots(self.storage.as_ref()).await;
        self.replace(SessionSnapshot::empty());
        debug!("Session cleared");
    }

    /// Clear the session only if it is still `observed`.
    ///
    /// Returns `false` without touching storage when a write or clear has
    /// replaced `observed` in the meantime.
    pub async fn clear_if_current(&self, observed: &Arc<SessionSnapshot>) -> bool {
        let _guard = self.write_gate.lock().await;
        if !Arc::ptr_eq(&self.snapshot(), observed) {
            debug!("Session replaced since it was observed, keeping it");
            return false;
        }
        remove_slots(self.storage.as_ref()).await;
        self.replace(SessionSnapshot::empty());
        debug!("Session cleared");
        true
    }
}

fn current_snapshot(cell: &RwLock<Arc<SessionSnapshot>>) -> Arc<SessionSnapshot> {
    Arc::clone(&cell.read().unwrap_or_else(PoisonError::into_inner))
}

async fn remove_slots(storage: &dyn KeyValueStore) {
    if let Err(e) = storage.remove(KEY_TOKEN).await {
        warn!(error = %e, "Failed to remove token");
    }
    if let Err(e) = storage.remove(KEY_TOKEN_TIMESTAMP).await {
        warn!(error = %e, "Failed to remove token timestamp");
    }
}
