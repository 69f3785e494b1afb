//! Storage manager that dispatches to the configured backend.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use orgsession_core::config::StorageConfig;
use orgsession_core::error::AppError;
use orgsession_core::result::AppResult;
use orgsession_core::traits::storage::SessionStorage;

/// Storage manager that wraps the configured session storage backend.
///
/// The backend is selected at construction time based on configuration.
#[derive(Debug, Clone)]
pub struct StorageManager {
    /// The inner storage backend.
    inner: Arc<dyn SessionStorage>,
}

impl StorageManager {
    /// Create a new storage manager from configuration.
    pub async fn new(config: &StorageConfig) -> AppResult<Self> {
        let inner: Arc<dyn SessionStorage> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis session storage");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                let storage =
                    crate::redis::RedisSessionStorage::new(client, config.redis.session_ttl_seconds);
                Arc::new(storage)
            }
            #[cfg(feature = "file")]
            "file" => {
                info!(path = %config.file.path, "Initializing file session storage");
                Arc::new(crate::file::FileSessionStorage::new(&config.file.path))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory session storage");
                Arc::new(crate::memory::MemorySessionStorage::new())
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown storage provider: '{other}'. Supported: memory, file, redis"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a storage manager from an existing backend (for testing).
    pub fn from_storage(storage: Arc<dyn SessionStorage>) -> Self {
        Self { inner: storage }
    }

    /// Get a shared handle to the inner backend.
    pub fn storage(&self) -> Arc<dyn SessionStorage> {
        Arc::clone(&self.inner)
    }
}

#[async_trait]
impl SessionStorage for StorageManager {
    fn provider_type(&self) -> &str {
        self.inner.provider_type()
    }

    async fn get_item(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.get_item(key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> AppResult<()> {
        self.inner.set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> AppResult<()> {
        self.inner.remove_item(key).await
    }

    async fn clear_prefix(&self, prefix: &str) -> AppResult<u64> {
        self.inner.clear_prefix(prefix).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}
