//! Durable session storage configuration.

use serde::{Deserialize, Serialize};

/// Top-level storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage provider type: `"memory"`, `"file"`, or `"redis"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Key under which the instance status table is stored.
    #[serde(default = "default_status_key")]
    pub status_key: String,
    /// Browsing-session namespace. Instances only see each other's status
    /// when they share a session id.
    #[serde(default)]
    pub session_id: Option<String>,
    /// File backend configuration.
    #[serde(default)]
    pub file: FileStorageConfig,
    /// Redis backend configuration.
    #[serde(default)]
    pub redis: RedisStorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            status_key: default_status_key(),
            session_id: None,
            file: FileStorageConfig::default(),
            redis: RedisStorageConfig::default(),
        }
    }
}

/// File-backed storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStorageConfig {
    /// Path of the JSON file holding every stored item.
    #[serde(default = "default_file_path")]
    pub path: String,
}

impl Default for FileStorageConfig {
    fn default() -> Self {
        Self {
            path: default_file_path(),
        }
    }
}

/// Redis-backed storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisStorageConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Key prefix for all OrgSession keys.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Sliding lifetime of stored items. Refreshed on every write.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: u64,
}

impl Default for RedisStorageConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
            session_ttl_seconds: default_session_ttl(),
        }
    }
}

fn default_provider() -> String {
    "memory".to_string()
}

fn default_status_key() -> String {
    "instance-status".to_string()
}

fn default_file_path() -> String {
    "data/session-storage.json".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "orgsession:".to_string()
}

fn default_session_ttl() -> u64 {
    8 * 60 * 60
}
