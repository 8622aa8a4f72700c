//! crates/quote_feed_core/src/feed.rs
//!
//! The quote feed manager: the cache/cursor over fetched batches.
//!
//! `next()` serves from the pending queue while it lasts and only then goes
//! back to the freshness filter. Every fetch moves the feed through
//! `Idle -> Loading -> {Ready, Error}`; observers follow that through a
//! `watch` channel instead of locking the cursor.

use crate::domain::{Category, Quote};
use crate::fetcher::{BatchFetcher, FallbackPolicy, DEFAULT_BATCH_SIZE};
use crate::freshness::{fetch_fresh_batch, FeedError, DEFAULT_MAX_RETRIES};
use crate::history::{RecentWindow, SeenHistory, RECENT_WINDOW_CAPACITY};
use crate::ports::KeyValueStore;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tracing::{error, info};

//=========================================================================================
// Configuration
//=========================================================================================

/// Tunables for the feed and its fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub batch_size: usize,
    pub max_retries: usize,
    pub recent_window_size: usize,
    pub fallback: FallbackPolicy,
    pub default_category: Category,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            recent_window_size: RECENT_WINDOW_CAPACITY,
            fallback: FallbackPolicy::default(),
            default_category: Category::default(),
        }
    }
}

//=========================================================================================
// Observable State
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    Idle,
    Loading,
    Ready,
    Error,
}

/// A read-only view of the feed, published after every state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedSnapshot {
    pub category: Category,
    pub status: FeedStatus,
    pub current: Option<Quote>,
    /// Number of quotes waiting in the pending queue.
    pub pending: usize,
    /// Size of the seen history.
    pub seen: usize,
    /// The message of the last failed fetch, kept until the next one succeeds.
    pub error: Option<String>,
}

//=========================================================================================
// The Cursor (mutable state behind the single-flight lock)
//=========================================================================================

struct Cursor {
    category: Category,
    current: Option<Quote>,
    pending: VecDeque<Quote>,
    recent: RecentWindow,
    seen: SeenHistory,
}

//=========================================================================================
// QuoteFeed
//=========================================================================================

/// The ports and the status channel. Shared with the task that runs a fetch.
struct FeedShared {
    fetcher: Arc<dyn BatchFetcher>,
    store: Arc<dyn KeyValueStore>,
    max_retries: usize,
    status: watch::Sender<FeedSnapshot>,
}

/// Fetches run on their own task holding the cursor lock, so a caller that
/// goes away mid-fetch (a dropped request future) cannot leave the feed stuck
/// in `Loading`. The fetch still completes and publishes `Ready` or `Error`.
pub struct QuoteFeed {
    shared: Arc<FeedShared>,
    cursor: Arc<Mutex<Cursor>>,
}

impl QuoteFeed {
    /// Creates the feed, loading the seen history from `store`.
    pub async fn load(
        fetcher: Arc<dyn BatchFetcher>,
        store: Arc<dyn KeyValueStore>,
        config: &FeedConfig,
    ) -> Self {
        let seen = SeenHistory::load(store.as_ref()).await;
        info!("Loaded seen history with {} quotes.", seen.len());

        let cursor = Cursor {
            category: config.default_category,
            current: None,
            pending: VecDeque::new(),
            recent: RecentWindow::with_capacity(config.recent_window_size),
            seen,
        };
        let (status, _) = watch::channel(FeedSnapshot {
            category: cursor.category,
            status: FeedStatus::Idle,
            current: None,
            pending: 0,
            seen: cursor.seen.len(),
            error: None,
        });

        Self {
            shared: Arc::new(FeedShared {
                fetcher,
                store,
                max_retries: config.max_retries,
                status,
            }),
            cursor: Arc::new(Mutex::new(cursor)),
        }
    }

    /// The latest published state. Never waits on an in-flight fetch.
    pub fn snapshot(&self) -> FeedSnapshot {
        self.shared.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.shared.status.subscribe()
    }

    /// Advances to the next quote.
    ///
    /// Served from the pending queue without any fetch when possible.
    pub async fn next(&self) -> Result<Quote, FeedError> {
        let cursor = self.acquire()?;
        self.advance(cursor).await
    }

    /// Switches category. The current quote, the pending queue and the recent
    /// window all belong to the old category and are dropped before the first
    /// fetch for the new one.
    ///
    /// Selecting the active category only fetches when nothing is displayed.
    pub async fn change_category(&self, category: Category) -> Result<Quote, FeedError> {
        let mut cursor = self.acquire()?;

        if cursor.category == category {
            if let Some(current) = cursor.current.clone() {
                return Ok(current);
            }
        } else {
            info!("Switching category from {} to {}", cursor.category, category);
            cursor.category = category;
            cursor.current = None;
            cursor.pending.clear();
            cursor.recent.clear();
            self.shared.publish(&cursor, FeedStatus::Idle, None);
        }

        self.refill_detached(cursor).await
    }

    /// The retry affordance after an error. Queued quotes are already in the
    /// seen history and would never come back, so they are served first; a
    /// fetch only happens once the queue is empty.
    pub async fn retry(&self) -> Result<Quote, FeedError> {
        let cursor = self.acquire()?;
        if !cursor.pending.is_empty() {
            info!("Retry served from {} queued quotes.", cursor.pending.len());
        }
        self.advance(cursor).await
    }

    fn acquire(&self) -> Result<OwnedMutexGuard<Cursor>, FeedError> {
        self.cursor.clone().try_lock_owned().map_err(|_| FeedError::Busy)
    }

    async fn advance(&self, mut cursor: OwnedMutexGuard<Cursor>) -> Result<Quote, FeedError> {
        if let Some(quote) = cursor.pending.pop_front() {
            cursor.current = Some(quote.clone());
            self.shared.publish(&cursor, FeedStatus::Ready, None);
            return Ok(quote);
        }

        self.refill_detached(cursor).await
    }

    /// Runs the refill on a spawned task that owns the lock until it is done.
    async fn refill_detached(
        &self,
        mut cursor: OwnedMutexGuard<Cursor>,
    ) -> Result<Quote, FeedError> {
        let shared = self.shared.clone();
        let task = tokio::spawn(async move { shared.refill(&mut cursor).await });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                let message = e.to_string();
                error!("Quote fetch task failed: {}", message);
                self.shared.status.send_modify(|snapshot| {
                    snapshot.status = FeedStatus::Error;
                    snapshot.current = None;
                    snapshot.error = Some(message.clone());
                });
                Err(FeedError::Interrupted(message))
            }
        }
    }
}

impl FeedShared {
    async fn refill(&self, cursor: &mut Cursor) -> Result<Quote, FeedError> {
        self.publish(cursor, FeedStatus::Loading, None);

        let recent = cursor.recent.to_vec();
        let result = fetch_fresh_batch(
            self.fetcher.as_ref(),
            cursor.category,
            &recent,
            &cursor.seen,
            self.max_retries,
        )
        .await;

        let batch = match result {
            Ok(batch) => batch,
            Err(e) => {
                error!("Failed to fetch quotes for {}: {}", cursor.category, e);
                cursor.current = None;
                self.publish(cursor, FeedStatus::Error, Some(e.to_string()));
                return Err(e);
            }
        };

        cursor.recent.extend(batch.quotes());
        let added = cursor.seen.extend(batch.newly_seen);
        cursor.current = Some(batch.first.clone());
        cursor.pending = batch.remainder.into();

        if added > 0 {
            if let Err(e) = cursor.seen.persist(self.store.as_ref()).await {
                error!("Failed to persist seen history: {}", e);
            }
        }

        self.publish(cursor, FeedStatus::Ready, None);
        Ok(batch.first)
    }

    fn publish(&self, cursor: &Cursor, status: FeedStatus, error: Option<String>) {
        self.status.send_replace(FeedSnapshot {
            category: cursor.category,
            status,
            current: cursor.current.clone(),
            pending: cursor.pending.len(),
            seen: cursor.seen.len(),
            error,
        });
    }
}
