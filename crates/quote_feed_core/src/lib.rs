pub mod domain;
pub mod favorites;
pub mod feed;
pub mod fetcher;
pub mod freshness;
pub mod history;
pub mod ports;
pub mod store;

pub use domain::{Category, Quote, QuoteId, UnknownCategory};
pub use favorites::{Favorites, FAVORITES_KEY};
pub use feed::{FeedConfig, FeedSnapshot, FeedStatus, QuoteFeed};
pub use fetcher::{
    BatchFetcher, BatchValidation, FallbackPolicy, FetchError, ServiceBatchFetcher,
};
pub use freshness::{fetch_fresh_batch, FeedError, FreshBatch};
pub use history::{RecentWindow, SeenHistory};
pub use ports::{GenerationRequest, KeyValueStore, PortError, PortResult, QuoteGenerationService};
pub use store::InMemoryStore;
