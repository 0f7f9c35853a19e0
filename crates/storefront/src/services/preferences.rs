//! Persisted user preferences and browsing history.
//!
//! Everything here lives only in the key-value store; nothing is sent to
//! the backend. Writes report success as a `bool` like the store itself.

use tracing::debug;

use bazaar_core::{AccentColor, Product, ThemeMode};

use crate::storage::{KeyValueStore, StorageKey};

/// Most recent searches kept.
pub const MAX_RECENT_SEARCHES: usize = 8;

/// Most recently viewed products kept.
pub const MAX_RECENTLY_VIEWED: usize = 10;

/// Preferences backed by the key-value store.
#[derive(Debug, Clone)]
pub struct Preferences {
    store: KeyValueStore,
}

impl Preferences {
    #[must_use]
    pub const fn new(store: KeyValueStore) -> Self {
        Self { store }
    }

    // =========================================================================
    // Recent Searches
    // =========================================================================

    /// Recent search queries, newest first.
    #[must_use]
    pub fn recent_searches(&self) -> Vec<String> {
        self.store.get_or(StorageKey::RecentSearches, Vec::new())
    }

    /// Record a search. Repeats move to the front (case-insensitively).
    pub fn add_recent_search(&self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return false;
        }

        let mut searches = self.recent_searches();
        searches.retain(|s| !s.eq_ignore_ascii_case(query));
        searches.insert(0, query.to_string());
        searches.truncate(MAX_RECENT_SEARCHES);
        self.store.set(StorageKey::RecentSearches, &searches)
    }

    /// Forget one search.
    pub fn remove_recent_search(&self, query: &str) -> bool {
        let mut searches = self.recent_searches();
        searches.retain(|s| !s.eq_ignore_ascii_case(query.trim()));
        self.store.set(StorageKey::RecentSearches, &searches)
    }

    /// Forget all searches.
    pub fn clear_recent_searches(&self) -> bool {
        self.store.remove(StorageKey::RecentSearches)
    }

    // =========================================================================
    // Recently Viewed
    // =========================================================================

    /// Recently viewed products, newest first.
    #[must_use]
    pub fn recently_viewed(&self) -> Vec<Product> {
        self.store.get_or(StorageKey::RecentlyViewed, Vec::new())
    }

    /// Record a product view.
    pub fn add_recently_viewed(&self, product: &Product) -> bool {
        let mut viewed = self.recently_viewed();
        viewed.retain(|p| p.id != product.id);
        viewed.insert(0, product.clone());
        viewed.truncate(MAX_RECENTLY_VIEWED);
        debug!(product_id = %product.id, count = viewed.len(), "Recorded product view");
        self.store.set(StorageKey::RecentlyViewed, &viewed)
    }

    /// Forget all viewed products.
    pub fn clear_recently_viewed(&self) -> bool {
        self.store.remove(StorageKey::RecentlyViewed)
    }

    // =========================================================================
    // Appearance
    // =========================================================================

    #[must_use]
    pub fn theme(&self) -> ThemeMode {
        self.store.get_or(StorageKey::ThemeMode, ThemeMode::default())
    }

    pub fn set_theme(&self, mode: ThemeMode) -> bool {
        self.store.set(StorageKey::ThemeMode, &mode)
    }

    /// Flip between light and dark. Returns the new mode.
    pub fn toggle_theme(&self) -> ThemeMode {
        let mode = self.theme().toggled();
        self.set_theme(mode);
        mode
    }

    /// The saved accent color, if any.
    #[must_use]
    pub fn accent_color(&self) -> Option<AccentColor> {
        self.store.get(StorageKey::PrimaryColor)
    }

    pub fn set_accent_color(&self, color: &AccentColor) -> bool {
        self.store.set(StorageKey::PrimaryColor, color)
    }

    pub fn reset_accent_color(&self) -> bool {
        self.store.remove(StorageKey::PrimaryColor)
    }
}
