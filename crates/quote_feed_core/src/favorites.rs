//! crates/quote_feed_core/src/favorites.rs
//!
//! The user's favorite quotes, kept in insertion order and written back to
//! the store as a whole after every change.

use crate::domain::{Quote, QuoteId};
use crate::ports::{KeyValueStore, PortError, PortResult};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// Store key under which the favorites list is persisted.
pub const FAVORITES_KEY: &str = "favoriteQuotes";

pub struct Favorites {
    store: Arc<dyn KeyValueStore>,
    quotes: RwLock<Vec<Quote>>,
}

impl Favorites {
    /// Reads the list from `store`. Anything unreadable starts an empty list.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let quotes = match store.load(FAVORITES_KEY).await {
            Ok(Some(raw)) => serde_json::from_str::<Vec<Quote>>(&raw).unwrap_or_else(|e| {
                warn!("Stored favorites are malformed, starting empty: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read favorites, starting empty: {}", e);
                Vec::new()
            }
        };

        Self {
            store,
            quotes: RwLock::new(quotes),
        }
    }

    pub async fn list(&self) -> Vec<Quote> {
        self.quotes.read().await.clone()
    }

    pub async fn is_favorite(&self, quote: &Quote) -> bool {
        self.quotes.read().await.iter().any(|f| f.same_as(quote))
    }

    /// Adds `quote` if absent, removes it otherwise. Returns whether it is now a favorite.
    pub async fn toggle(&self, quote: &Quote) -> PortResult<bool> {
        let mut quotes = self.quotes.write().await;
        let mut updated = quotes.clone();
        let now_favorite = match updated.iter().position(|f| f.same_as(quote)) {
            Some(index) => {
                updated.remove(index);
                false
            }
            None => {
                updated.push(quote.clone());
                true
            }
        };
        self.persist(&updated).await?;
        *quotes = updated;
        Ok(now_favorite)
    }

    pub async fn remove(&self, id: &QuoteId) -> PortResult<Quote> {
        let mut quotes = self.quotes.write().await;
        let index = quotes
            .iter()
            .position(|f| &f.id() == id)
            .ok_or_else(|| PortError::NotFound(format!("Favorite {} not found", id)))?;
        let mut updated = quotes.clone();
        let removed = updated.remove(index);
        self.persist(&updated).await?;
        *quotes = updated;
        Ok(removed)
    }

    /// Removes every favorite. Returns how many were dropped.
    pub async fn clear(&self) -> PortResult<usize> {
        let mut quotes = self.quotes.write().await;
        self.persist(&[]).await?;
        Ok(std::mem::take(&mut *quotes).len())
    }

    /// The in-memory list only changes after the store accepted the new one.
    async fn persist(&self, quotes: &[Quote]) -> PortResult<()> {
        let raw =
            serde_json::to_string(quotes).map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.store.save(FAVORITES_KEY, &raw).await
    }
}
