//! In-memory session storage using the dashmap crate.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use orgsession_core::result::AppResult;
use orgsession_core::traits::storage::SessionStorage;

/// Process-local session storage.
///
/// Clones share the same map, so every instance in the process that is
/// handed a clone rendezvous through the same slots.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStorage {
    /// Stored items.
    entries: Arc<DashMap<String, String>>,
}

impl MemorySessionStorage {
    /// Create an empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn get_item(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set_item(&self, key: &str, value: &str) -> AppResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> AppResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn clear_prefix(&self, prefix: &str) -> AppResult<u64> {
        // Collect first; removing while iterating would deadlock the shard.
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();

        let count = keys.len() as u64;
        for key in keys {
            self.entries.remove(&key);
        }

        debug!(prefix, count, "Cleared keys with prefix");
        Ok(count)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
