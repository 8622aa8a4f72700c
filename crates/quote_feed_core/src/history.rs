//! crates/quote_feed_core/src/history.rs
//!
//! The two memories of what a user has already been shown: the durable,
//! grow-only `SeenHistory` and the short `RecentWindow` sent to the generator.

use crate::domain::{Quote, QuoteId};
use crate::ports::{KeyValueStore, PortResult};
use std::collections::{HashSet, VecDeque};
use tracing::warn;

/// Store key under which the seen identifiers are persisted.
pub const SEEN_HISTORY_KEY: &str = "seenQuotesHistory";

/// Default bound of the recent window.
pub const RECENT_WINDOW_CAPACITY: usize = 20;

//=========================================================================================
// SeenHistory
//=========================================================================================

/// Every quote identifier ever delivered to this user. Entries are never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenHistory {
    ids: HashSet<QuoteId>,
}

impl SeenHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &QuoteId) -> bool {
        self.ids.contains(id)
    }

    pub fn has_seen(&self, quote: &Quote) -> bool {
        self.contains(&quote.id())
    }

    /// Adds `ids` and returns how many were not present before.
    pub fn extend<I: IntoIterator<Item = QuoteId>>(&mut self, ids: I) -> usize {
        let before = self.ids.len();
        self.ids.extend(ids);
        self.ids.len() - before
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Reads the history from `store`. A missing, unreadable or malformed blob yields an empty history.
    pub async fn load(store: &dyn KeyValueStore) -> Self {
        let raw = match store.load(SEEN_HISTORY_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::new(),
            Err(e) => {
                warn!("Failed to read seen history, starting empty: {}", e);
                return Self::new();
            }
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(ids) => Self {
                ids: ids.into_iter().map(QuoteId::from).collect(),
            },
            Err(e) => {
                warn!("Stored seen history is malformed, starting empty: {}", e);
                Self::new()
            }
        }
    }

    /// Writes the whole history back to `store`.
    pub async fn persist(&self, store: &dyn KeyValueStore) -> PortResult<()> {
        let mut ids: Vec<&str> = self.ids.iter().map(QuoteId::as_str).collect();
        ids.sort_unstable();
        let raw = serde_json::to_string(&ids)
            .map_err(|e| crate::ports::PortError::Unexpected(e.to_string()))?;
        store.save(SEEN_HISTORY_KEY, &raw).await
    }
}

//=========================================================================================
// RecentWindow
//=========================================================================================

/// The most recently delivered quotes, oldest first, bounded in size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentWindow {
    quotes: VecDeque<Quote>,
    capacity: usize,
}

impl Default for RecentWindow {
    fn default() -> Self {
        Self::with_capacity(RECENT_WINDOW_CAPACITY)
    }
}

impl RecentWindow {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            quotes: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `quotes` in order, evicting the oldest entries past capacity.
    pub fn extend<'a, I: IntoIterator<Item = &'a Quote>>(&mut self, quotes: I) {
        for quote in quotes {
            self.quotes.push_back(quote.clone());
            while self.quotes.len() > self.capacity {
                self.quotes.pop_front();
            }
        }
    }

    pub fn clear(&mut self) {
        self.quotes.clear();
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Quote> {
        self.quotes.iter()
    }

    pub fn to_vec(&self) -> Vec<Quote> {
        self.quotes.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PortError;
    use crate::store::InMemoryStore;
    use async_trait::async_trait;

    fn quote(n: usize) -> Quote {
        Quote::new(format!("text {n}"), format!("author {n}"), "译文", None)
    }

    #[test]
    fn recent_window_evicts_oldest_first() {
        let mut window = RecentWindow::default();
        let quotes: Vec<Quote> = (0..25).map(quote).collect();
        window.extend(&quotes);

        assert_eq!(window.len(), RECENT_WINDOW_CAPACITY);
        let kept: Vec<Quote> = window.to_vec();
        assert_eq!(kept.first(), Some(&quote(5)));
        assert_eq!(kept.last(), Some(&quote(24)));
    }

    #[test]
    fn seen_history_reports_only_new_ids() {
        let mut seen = SeenHistory::new();
        assert_eq!(seen.extend([quote(1).id(), quote(2).id()]), 2);
        assert_eq!(seen.extend([quote(2).id(), quote(3).id()]), 1);
        assert_eq!(seen.len(), 3);
        assert!(seen.has_seen(&quote(1)));
    }

    #[tokio::test]
    async fn seen_history_round_trips_through_store() {
        let store = InMemoryStore::new();
        let mut seen = SeenHistory::new();
        seen.extend([quote(1).id(), quote(2).id()]);
        seen.persist(&store).await.unwrap();

        let loaded = SeenHistory::load(&store).await;
        assert_eq!(loaded, seen);
    }

    #[tokio::test]
    async fn malformed_blob_loads_as_empty() {
        let store = InMemoryStore::with_entries([(SEEN_HISTORY_KEY, "{not json")]);
        assert!(SeenHistory::load(&store).await.is_empty());
    }

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn load(&self, _key: &str) -> PortResult<Option<String>> {
            Err(PortError::Unavailable("disk gone".to_string()))
        }

        async fn save(&self, _key: &str, _value: &str) -> PortResult<()> {
            Err(PortError::Unavailable("disk gone".to_string()))
        }
    }

    #[tokio::test]
    async fn unreadable_store_loads_as_empty() {
        assert!(SeenHistory::load(&BrokenStore).await.is_empty());
    }
}
