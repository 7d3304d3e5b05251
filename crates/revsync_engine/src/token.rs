//! Identity token persistence and validation.

use parking_lot::RwLock;
use revsync_storage::KeyValueStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Storage key under which the identity token is persisted.
pub const TOKEN_STORAGE_KEY: &str = "identity_token";

/// Maximum accepted token length.
const MAX_TOKEN_LEN: usize = 256;

/// Persists and validates the device identity token.
///
/// At most one valid token exists per process lifetime; once obtained it is
/// immutable except for explicit rotation. The in-memory cache is the
/// source of truth for the running process; persistence failures degrade to
/// a dirty flag that is retried on the next opportunity (a successful
/// submission or a foreground transition). After repeated failures the
/// token is lost with the process - an accepted, logged trade-off: the next
/// start simply re-acquires one.
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
    cached: RwLock<Option<String>>,
    dirty: AtomicBool,
}

impl TokenStore {
    /// Creates a token store over the given storage backend.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            cached: RwLock::new(None),
            dirty: AtomicBool::new(false),
        }
    }

    /// Structural validity check for a token.
    ///
    /// Invalid tokens are treated as absent, never surfaced as errors.
    pub fn validate(token: &str) -> bool {
        !token.is_empty()
            && token.len() <= MAX_TOKEN_LEN
            && token.chars().all(|c| c.is_ascii_graphic())
    }

    /// Loads the persisted token, if present and valid.
    ///
    /// Storage failures and malformed values behave as absence.
    pub fn load(&self) -> Option<String> {
        let bytes = match self.store.get(TOKEN_STORAGE_KEY) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!("failed to read persisted token, treating as absent: {e}");
                return None;
            }
        };

        let token = match String::from_utf8(bytes) {
            Ok(token) => token,
            Err(_) => {
                warn!("persisted token is not valid UTF-8, treating as absent");
                return None;
            }
        };

        if !Self::validate(&token) {
            warn!("persisted token failed validation, treating as absent");
            return None;
        }

        *self.cached.write() = Some(token.clone());
        debug!("loaded persisted identity token");
        Some(token)
    }

    /// Returns the current in-memory token, if any.
    pub fn current(&self) -> Option<String> {
        self.cached.read().clone()
    }

    /// Caches and persists a token, overwriting any previous value.
    ///
    /// Returns false if the token failed validation or persistence failed;
    /// in the latter case the token stays cached and dirty, and
    /// [`TokenStore::retry_pending_save`] will re-attempt persistence.
    pub fn save(&self, token: &str) -> bool {
        if !Self::validate(token) {
            warn!("refusing to save invalid identity token");
            return false;
        }

        *self.cached.write() = Some(token.to_string());

        match self.store.set(TOKEN_STORAGE_KEY, token.as_bytes()) {
            Ok(()) => {
                self.dirty.store(false, Ordering::SeqCst);
                true
            }
            Err(e) => {
                warn!("failed to persist identity token, will retry: {e}");
                self.dirty.store(true, Ordering::SeqCst);
                false
            }
        }
    }

    /// Explicitly replaces the token with a new server-issued value.
    pub fn rotate(&self, token: &str) -> bool {
        info!("rotating identity token");
        self.save(token)
    }

    /// Re-attempts a previously failed persistence, if one is pending.
    pub fn retry_pending_save(&self) {
        if !self.dirty.load(Ordering::SeqCst) {
            return;
        }
        let token = match self.current() {
            Some(token) => token,
            None => return,
        };
        if self.save(&token) {
            debug!("pending identity token save succeeded");
        }
    }

    /// Returns true if a persistence attempt is pending.
    pub fn has_pending_save(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }
}
