//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use quote_feed_core::FeedConfig;
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// When absent the service keeps favorites and history in memory only.
    pub database_url: Option<String>,
    pub log_level: Level,
    pub openai_api_key: Option<String>,
    pub quote_model: String,
    pub feed: FeedConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Storage Settings ---
        let bind_address = parse_or(
            &lookup,
            "BIND_ADDRESS",
            SocketAddr::from(([0, 0, 0, 0], 3000)),
        )?;
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Generation Service Settings ---
        let openai_api_key = lookup("OPENAI_API_KEY");
        let quote_model = lookup("QUOTE_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());

        // --- Feed Settings ---
        let defaults = FeedConfig::default();
        let feed = FeedConfig {
            batch_size: parse_or(&lookup, "QUOTE_BATCH_SIZE", defaults.batch_size)?,
            max_retries: parse_or(&lookup, "QUOTE_MAX_RETRIES", defaults.max_retries)?,
            recent_window_size: parse_or(
                &lookup,
                "RECENT_WINDOW_SIZE",
                defaults.recent_window_size,
            )?,
            fallback: parse_or(&lookup, "QUOTE_FALLBACK", defaults.fallback)?,
            default_category: parse_or(&lookup, "DEFAULT_CATEGORY", defaults.default_category)?,
        };
        if feed.batch_size == 0 || feed.max_retries == 0 {
            return Err(ConfigError::InvalidValue(
                "QUOTE_BATCH_SIZE/QUOTE_MAX_RETRIES".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            openai_api_key,
            quote_model,
            feed,
        })
    }

    /// The API key, or an error naming the missing variable.
    pub fn require_openai_key(&self) -> Result<&str, ConfigError> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))
    }
}

/// Parses `name` when set, otherwise returns `default`.
fn parse_or<T, F>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote_feed_core::{Category, FallbackPolicy};
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(config.database_url, None);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.quote_model, "gpt-4o-mini");
        assert_eq!(config.feed, FeedConfig::default());
        assert!(config.require_openai_key().is_err());
    }

    #[test]
    fn feed_settings_are_read() {
        let config = Config::from_lookup(lookup_from(&[
            ("QUOTE_BATCH_SIZE", "5"),
            ("QUOTE_MAX_RETRIES", "2"),
            ("QUOTE_FALLBACK", "surface"),
            ("DEFAULT_CATEGORY", "勇气"),
            ("OPENAI_API_KEY", "sk-test"),
        ]))
        .unwrap();
        assert_eq!(config.feed.batch_size, 5);
        assert_eq!(config.feed.max_retries, 2);
        assert_eq!(config.feed.fallback, FallbackPolicy::Surface);
        assert_eq!(config.feed.default_category, Category::Courage);
        assert_eq!(config.require_openai_key().unwrap(), "sk-test");
    }

    #[test]
    fn invalid_values_are_reported_by_name() {
        let err = Config::from_lookup(lookup_from(&[("QUOTE_FALLBACK", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(name, _) if name == "QUOTE_FALLBACK"));

        let err = Config::from_lookup(lookup_from(&[("QUOTE_MAX_RETRIES", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_, _)));
    }
}
