//! crates/quote_feed_core/src/store.rs
//!
//! An in-memory `KeyValueStore`, used when no database is configured and by the tests.

use crate::ports::{KeyValueStore, PortResult};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Keeps every value in a process-local map. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries`.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn load(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> PortResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_overwrites_previous_value() {
        let store = InMemoryStore::with_entries([("k", "old")]);
        assert_eq!(store.load("k").await.unwrap().as_deref(), Some("old"));

        store.save("k", "new").await.unwrap();
        assert_eq!(store.load("k").await.unwrap().as_deref(), Some("new"));
        assert_eq!(store.load("missing").await.unwrap(), None);
    }
}
