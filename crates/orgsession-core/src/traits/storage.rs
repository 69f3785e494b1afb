//! Session-scoped storage trait for pluggable durable backends.

use async_trait::async_trait;

use crate::result::AppResult;

/// Trait for durable, session-scoped key-value storage (in-memory, file, or Redis).
///
/// Values are opaque strings (JSON in practice). Every instance that should
/// rendezvous with another must be handed a storage that resolves the same
/// keys to the same slots.
#[async_trait]
pub trait SessionStorage: Send + Sync + std::fmt::Debug + 'static {
    /// Short name of the backend (`"memory"`, `"file"`, `"redis"`).
    fn provider_type(&self) -> &str;

    /// Get a value by key. Returns `None` if the key does not exist.
    async fn get_item(&self, key: &str) -> AppResult<Option<String>>;

    /// Replace the value stored under a key.
    async fn set_item(&self, key: &str, value: &str) -> AppResult<()>;

    /// Remove a key. Removing a missing key is not an error.
    async fn remove_item(&self, key: &str) -> AppResult<()>;

    /// Remove every key starting with `prefix`. Returns the number removed.
    async fn clear_prefix(&self, prefix: &str) -> AppResult<u64>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Get a typed value by deserializing from JSON.
    async fn get_json<T: serde::de::DeserializeOwned + Send>(
        &self,
        key: &str,
    ) -> AppResult<Option<T>>
    where
        Self: Sized,
    {
        match self.get_item(key).await? {
            Some(value) => {
                let parsed = serde_json::from_str(&value)?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    /// Set a typed value by serializing to JSON.
    async fn set_json<T: serde::Serialize + Send + Sync>(&self, key: &str, value: &T) -> AppResult<()>
    where
        Self: Sized,
    {
        let json = serde_json::to_string(value)?;
        self.set_item(key, &json).await
    }
}
