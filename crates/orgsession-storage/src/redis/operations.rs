//! Redis session storage implementation.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use orgsession_core::error::{AppError, ErrorKind};
use orgsession_core::result::AppResult;
use orgsession_core::traits::storage::SessionStorage;

use super::client::RedisClient;

/// Redis-backed session storage.
///
/// Every write refreshes the item's TTL, so a browsing session's keys
/// disappear once no instance has written for `session_ttl`.
#[derive(Debug, Clone)]
pub struct RedisSessionStorage {
    /// Redis client.
    client: RedisClient,
    /// Sliding lifetime of stored items.
    session_ttl: Duration,
}

impl RedisSessionStorage {
    /// Create a new Redis session storage.
    pub fn new(client: RedisClient, session_ttl_seconds: u64) -> Self {
        Self {
            client,
            session_ttl: Duration::from_secs(session_ttl_seconds.max(1)),
        }
    }

    /// Map a Redis error to an AppError.
    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(ErrorKind::Storage, format!("Redis error: {e}"), e)
    }
}

#[async_trait]
impl SessionStorage for RedisSessionStorage {
    fn provider_type(&self) -> &str {
        "redis"
    }

    async fn get_item(&self, key: &str) -> AppResult<Option<String>> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let result: Option<String> = conn.get(&full_key).await.map_err(Self::map_err)?;
        Ok(result)
    }

    async fn set_item(&self, key: &str, value: &str) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = conn
            .set_ex(&full_key, value, self.session_ttl.as_secs())
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = conn.del(&full_key).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn clear_prefix(&self, prefix: &str) -> AppResult<u64> {
        let full_pattern = format!("{}*", self.client.prefixed_key(prefix));
        let mut conn = self.client.conn_mut();

        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(&full_pattern)
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;

        if keys.is_empty() {
            return Ok(0);
        }

        let count = keys.len() as u64;
        for key in &keys {
            let _: () = conn.del(key).await.map_err(Self::map_err)?;
        }

        debug!(prefix, count, "Cleared keys with prefix");
        Ok(count)
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }
}
