//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use quote_feed_core::{
    Favorites, KeyValueStore, QuoteFeed, QuoteGenerationService, ServiceBatchFetcher,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub feed: Arc<QuoteFeed>,
    pub favorites: Arc<Favorites>,
}

impl AppState {
    /// Wires the feed and the favorites onto the given ports.
    ///
    /// Both the seen history and the favorites are read from `store` here, once.
    pub async fn build(
        config: Arc<Config>,
        generator: Arc<dyn QuoteGenerationService>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let fetcher = Arc::new(ServiceBatchFetcher::new(
            generator,
            config.feed.batch_size,
            config.feed.fallback,
        ));
        let feed = QuoteFeed::load(fetcher, store.clone(), &config.feed).await;
        let favorites = Favorites::load(store).await;

        Self {
            config,
            feed: Arc::new(feed),
            favorites: Arc::new(favorites),
        }
    }
}
