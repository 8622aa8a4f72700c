//! services/api/src/error.rs
//!
//! Failures that can stop one of the service binaries. Request-level errors
//! never reach this type; handlers map them to status codes directly.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Connecting to Postgres failed.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The OpenAPI document could not be rendered as JSON.
    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Binding or serving the listener, or writing the generated document.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
