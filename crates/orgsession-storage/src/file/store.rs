//! JSON file session storage.
//!
//! All items live in one JSON object. Every read loads the file and every
//! write replaces it through a temporary file and a rename, so separate
//! processes on the same host observe whole-file replacement.

use std::collections::BTreeMap;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use orgsession_core::error::{AppError, ErrorKind};
use orgsession_core::result::AppResult;
use orgsession_core::traits::storage::SessionStorage;

/// Session storage persisted to a single JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    /// Path of the backing file.
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Arc<Mutex<()>>,
}

impl FileSessionStorage {
    /// Create a file storage rooted at `path`. The file is created lazily.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> AppResult<BTreeMap<String, String>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to read {}", self.path.display()),
                    e,
                ));
            }
        };

        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&raw).map_err(|e| {
            AppError::with_source(
                ErrorKind::Serialization,
                format!("Corrupt storage file {}", self.path.display()),
                e,
            )
        })
    }

    async fn persist(&self, items: &BTreeMap<String, String>) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(items)?;
        let tmp = self.path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));

        tokio::fs::write(&tmp, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            warn!(path = %self.path.display(), error = %e, "Failed to replace storage file");
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStorage for FileSessionStorage {
    fn provider_type(&self) -> &str {
        "file"
    }

    async fn get_item(&self, key: &str) -> AppResult<Option<String>> {
        let items = self.load().await?;
        Ok(items.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.load().await?;
        items.insert(key.to_string(), value.to_string());
        self.persist(&items).await
    }

    async fn remove_item(&self, key: &str) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.load().await?;
        if items.remove(key).is_some() {
            self.persist(&items).await?;
        }
        Ok(())
    }

    async fn clear_prefix(&self, prefix: &str) -> AppResult<u64> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.load().await?;
        let before = items.len();
        items.retain(|key, _| !key.starts_with(prefix));
        let count = (before - items.len()) as u64;

        if count > 0 {
            self.persist(&items).await?;
        }

        debug!(prefix, count, path = %self.path.display(), "Cleared keys with prefix");
        Ok(count)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self.load().await.is_ok())
    }
}
