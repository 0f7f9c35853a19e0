//! Session token state.
//!
//! [`TokenState`] is the single holder of the current session token. It is
//! loaded once from the key-value store and every change is written back in
//! the same call, so memory and storage never disagree. Cart and wishlist
//! services read it before each request; observers can subscribe to changes.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::storage::{KeyValueStore, StorageKey};

/// An opaque backend session token.
///
/// `Debug` never prints the token.
#[derive(Clone)]
pub struct SessionToken(SecretString);

impl SessionToken {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw token, for building request headers.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

impl PartialEq for SessionToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for SessionToken {}

/// Process-wide holder of the current session token.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct TokenState {
    inner: Arc<TokenStateInner>,
}

struct TokenStateInner {
    store: KeyValueStore,
    tx: watch::Sender<Option<SessionToken>>,
}

impl TokenState {
    /// Load the token persisted in `store`, if any.
    #[must_use]
    pub fn load(store: KeyValueStore) -> Self {
        let token = store
            .get::<String>(StorageKey::UserToken)
            .filter(|t| !t.is_empty())
            .map(SessionToken::new);
        debug!(authenticated = token.is_some(), "Loaded session token");

        let (tx, _rx) = watch::channel(token);
        Self {
            inner: Arc::new(TokenStateInner { store, tx }),
        }
    }

    /// The current token, if authenticated.
    #[must_use]
    pub fn current(&self) -> Option<SessionToken> {
        self.inner.tx.borrow().clone()
    }

    /// Returns true if a token is held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.tx.borrow().is_some()
    }

    /// Replace the token, persisting the change first.
    ///
    /// Returns false if the store could not be updated; the in-memory token
    /// is still replaced so the current process behaves correctly.
    pub fn set(&self, token: SessionToken) -> bool {
        let persisted = self.inner.store.set(StorageKey::UserToken, token.expose());
        if !persisted {
            warn!("Session token not persisted, it will not survive a restart");
        }
        self.inner.tx.send_if_modified(|current| {
            if current.as_ref() == Some(&token) {
                return false;
            }
            *current = Some(token);
            true
        });
        persisted
    }

    /// Drop the token (logout).
    pub fn clear(&self) -> bool {
        let removed = self.inner.store.remove(StorageKey::UserToken);
        self.inner.tx.send_if_modified(|current| current.take().is_some());
        removed
    }

    /// Subscribe to token changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionToken>> {
        self.inner.tx.subscribe()
    }

    /// The store the token is persisted in.
    #[must_use]
    pub fn store(&self) -> &KeyValueStore {
        &self.inner.store
    }
}

impl std::fmt::Debug for TokenState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenState")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_load_absent_is_unauthenticated() {
        let tokens = TokenState::load(KeyValueStore::in_memory());
        assert!(!tokens.is_authenticated());
        assert!(tokens.current().is_none());
    }

    #[test]
    fn test_load_existing_token() {
        let store = KeyValueStore::in_memory();
        store.set(StorageKey::UserToken, "persisted");
        let tokens = TokenState::load(store);
        assert_eq!(tokens.current().unwrap().expose(), "persisted");
    }

    #[test]
    fn test_set_and_clear_mirror_into_store() {
        let store = KeyValueStore::in_memory();
        let tokens = TokenState::load(store.clone());

        assert!(tokens.set(SessionToken::new("abc")));
        assert_eq!(store.get::<String>(StorageKey::UserToken).as_deref(), Some("abc"));

        assert!(tokens.clear());
        assert!(!tokens.is_authenticated());
        assert_eq!(store.get::<String>(StorageKey::UserToken), None);
    }

    #[test]
    fn test_subscribers_see_changes_once() {
        let tokens = TokenState::load(KeyValueStore::in_memory());
        let mut rx = tokens.subscribe();
        assert!(!rx.has_changed().unwrap());

        tokens.set(SessionToken::new("abc"));
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        // Setting the same token again is not a change.
        tokens.set(SessionToken::new("abc"));
        assert!(!rx.has_changed().unwrap());

        tokens.clear();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let token = SessionToken::new("super-secret-jwt");
        assert!(!format!("{token:?}").contains("super-secret-jwt"));
    }
}
