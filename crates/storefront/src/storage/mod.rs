//! Persistent key-value store.
//!
//! Typed access to a [`StorageBackend`] restricted to a closed set of keys.
//! Values are JSON, except strings which are stored raw so plain legacy
//! values and JSON values read back the same way.
//!
//! Nothing here returns an error to the caller: an unavailable or full
//! backend degrades to `None`/`false` with a warning in the log.

mod backend;

pub use backend::{FileBackend, MemoryBackend, StorageBackend, StorageError};

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Entries kept per list after a quota eviction pass.
const EVICTION_KEEP: usize = 5;

const CHECK_KEY: &str = "__storage_check__";

/// The only keys the store accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// Session token (string).
    UserToken,
    /// Recent search queries, newest first.
    RecentSearches,
    /// Recently viewed products, newest first.
    RecentlyViewed,
    /// `light` or `dark`.
    ThemeMode,
    /// CSS hex accent color.
    PrimaryColor,
}

impl StorageKey {
    /// Every allowed key.
    pub const ALL: [Self; 5] = [
        Self::UserToken,
        Self::RecentSearches,
        Self::RecentlyViewed,
        Self::ThemeMode,
        Self::PrimaryColor,
    ];

    /// The key as written to the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserToken => "userToken",
            Self::RecentSearches => "recent_searches",
            Self::RecentlyViewed => "recently_viewed",
            Self::ThemeMode => "themeMode",
            Self::PrimaryColor => "primaryColor",
        }
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed, degradation-safe wrapper over a storage backend.
///
/// Cheap to clone; clones share the backend.
#[derive(Clone)]
pub struct KeyValueStore {
    backend: Arc<dyn StorageBackend>,
}

impl KeyValueStore {
    /// Wrap a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// A store over a fresh in-memory backend.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Check the backend with a write and a delete.
    ///
    /// A write rejected only for quota counts as available, since a full
    /// store can still be read and evicted.
    #[must_use]
    pub fn is_available(&self) -> bool {
        match self.backend.set_item(CHECK_KEY, CHECK_KEY) {
            Ok(()) => self.backend.remove_item(CHECK_KEY).is_ok(),
            Err(StorageError::QuotaExceeded) => true,
            Err(_) => false,
        }
    }

    /// Read and decode a value.
    ///
    /// Falls back to decoding the raw text as a JSON string when it is not
    /// valid JSON for `T`.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: StorageKey) -> Option<T> {
        if !self.is_available() {
            warn!(key = %key, "Storage unavailable, returning no value");
            return None;
        }

        let raw = match self.backend.get_item(key.as_str()) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read from storage");
                return None;
            }
        };

        serde_json::from_str::<T>(&raw)
            .or_else(|_| serde_json::from_value::<T>(Value::String(raw)))
            .map_err(|e| warn!(key = %key, error = %e, "Stored value has unexpected shape"))
            .ok()
    }

    /// Read a value, or `default` when missing or unreadable.
    #[must_use]
    pub fn get_or<T: DeserializeOwned>(&self, key: StorageKey, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Encode and write a value. Returns false if it was not stored.
    ///
    /// On quota exhaustion, trims the recent-searches and recently-viewed
    /// lists and retries once.
    pub fn set<T: Serialize + ?Sized>(&self, key: StorageKey, value: &T) -> bool {
        if !self.is_available() {
            warn!(key = %key, "Storage unavailable, value not saved");
            return false;
        }

        let raw = match serde_json::to_value(value) {
            Ok(Value::String(s)) => s,
            Ok(other) => other.to_string(),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize value for storage");
                return false;
            }
        };

        match self.backend.set_item(key.as_str(), &raw) {
            Ok(()) => true,
            Err(StorageError::QuotaExceeded) => {
                warn!(key = %key, "Storage quota exceeded, evicting history");
                self.evict_history();
                match self.backend.set_item(key.as_str(), &raw) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(key = %key, error = %e, "Failed to save after eviction");
                        false
                    }
                }
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to write to storage");
                false
            }
        }
    }

    /// Delete a value. Returns false if the backend rejected the delete.
    pub fn remove(&self, key: StorageKey) -> bool {
        if !self.is_available() {
            warn!(key = %key, "Storage unavailable, value not removed");
            return false;
        }

        self.backend
            .remove_item(key.as_str())
            .map_err(|e| warn!(key = %key, error = %e, "Failed to remove from storage"))
            .is_ok()
    }

    /// Truncate the history lists to free space.
    fn evict_history(&self) {
        for key in [StorageKey::RecentlyViewed, StorageKey::RecentSearches] {
            let Ok(Some(raw)) = self.backend.get_item(key.as_str()) else {
                continue;
            };
            let Ok(mut entries) = serde_json::from_str::<Vec<Value>>(&raw) else {
                continue;
            };
            if entries.len() <= EVICTION_KEEP {
                continue;
            }
            entries.truncate(EVICTION_KEEP);
            if let Err(e) = self
                .backend
                .set_item(key.as_str(), &Value::Array(entries).to_string())
            {
                warn!(key = %key, error = %e, "Failed to write evicted history");
            }
        }
    }
}

impl std::fmt::Debug for KeyValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyValueStore").finish_non_exhaustive()
    }
}
