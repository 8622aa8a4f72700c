//! crates/quote_feed_core/src/freshness.rs
//!
//! The freshness filter: the only retrying logic in the feed. It keeps asking
//! the fetcher for batches until one contains a quote the user has never seen.

use crate::domain::{Category, Quote, QuoteId};
use crate::fetcher::{BatchFetcher, FetchError};
use crate::history::SeenHistory;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Default number of fetch attempts before giving up on a stale category.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Errors a feed operation can end with.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    /// Every attempt returned only quotes the user has already seen.
    #[error("No new quotes found after {attempts} attempts. Try again later or pick another category.")]
    NoFreshQuotes { attempts: usize },

    /// The fetcher failed; no retry was attempted.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Another fetch is already in flight.
    #[error("A quote request is already in progress.")]
    Busy,

    /// The task running the fetch died before reporting back.
    #[error("The quote request was interrupted: {0}")]
    Interrupted(String),
}

/// The result of a successful freshness pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreshBatch {
    pub first: Quote,
    pub remainder: Vec<Quote>,
    /// Identifiers of every fresh quote in the batch, `first` included.
    pub newly_seen: HashSet<QuoteId>,
}

impl FreshBatch {
    /// All fresh quotes in delivery order.
    pub fn quotes(&self) -> impl Iterator<Item = &Quote> {
        std::iter::once(&self.first).chain(self.remainder.iter())
    }
}

/// Drops every quote already in `seen`, and repeats within the batch itself.
pub fn filter_fresh(batch: Vec<Quote>, seen: &SeenHistory) -> Vec<Quote> {
    let mut in_batch = HashSet::new();
    batch
        .into_iter()
        .filter(|q| {
            let id = q.id();
            !seen.contains(&id) && in_batch.insert(id)
        })
        .collect()
}

/// Fetches until a batch holds at least one unseen quote.
///
/// A fetch error aborts at once. `max_retries` stale batches in a row end
/// with `FeedError::NoFreshQuotes`. `seen` is not modified here.
pub async fn fetch_fresh_batch(
    fetcher: &dyn BatchFetcher,
    category: Category,
    recent: &[Quote],
    seen: &SeenHistory,
    max_retries: usize,
) -> Result<FreshBatch, FeedError> {
    for attempt in 1..=max_retries {
        let batch = fetcher.request_batch(category, recent).await?;
        let total = batch.len();
        let mut fresh = filter_fresh(batch, seen).into_iter();

        if let Some(first) = fresh.next() {
            let remainder: Vec<Quote> = fresh.collect();
            let newly_seen = std::iter::once(&first)
                .chain(remainder.iter())
                .map(Quote::id)
                .collect();
            debug!(
                "Attempt {}: {} of {} quotes are fresh",
                attempt,
                remainder.len() + 1,
                total
            );
            return Ok(FreshBatch {
                first,
                remainder,
                newly_seen,
            });
        }

        debug!("Attempt {}: all {} quotes already seen", attempt, total);
    }

    warn!(
        "Category {} produced no fresh quotes after {} attempts",
        category, max_retries
    );
    Err(FeedError::NoFreshQuotes {
        attempts: max_retries,
    })
}
