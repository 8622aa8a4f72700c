//! crates/quote_feed_core/src/ports.rs
//!
//! Defines the service contracts (traits) the quote feed depends on.
//! These traits form the boundary of the hexagonal architecture, so the feed
//! never talks to a concrete AI client or database directly.

use async_trait::async_trait;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// A single request to the text-generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// The natural-language instruction sent to the model.
    pub prompt: String,
    /// How many quotes the prompt asks for.
    pub count: usize,
}

#[async_trait]
pub trait QuoteGenerationService: Send + Sync {
    /// Sends the prompt and returns the raw JSON text the service produced.
    /// Implementations ask the service for the quote batch schema but do not validate it.
    async fn generate_quotes(&self, request: &GenerationRequest) -> PortResult<String>;
}

/// A durable string key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn load(&self, key: &str) -> PortResult<Option<String>>;

    /// Overwrites the whole value stored under `key`.
    async fn save(&self, key: &str, value: &str) -> PortResult<()>;
}
