//! Instance status table persisted in session storage.
//!
//! The whole table lives under one key and every write replaces it. Each
//! instance only ever writes its own record, so a lost update between two
//! instances costs at most one poll cycle before the owner rewrites it.

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};
use tracing::{debug, warn};

use orgsession_core::config::StorageConfig;
use orgsession_core::error::ErrorKind;
use orgsession_core::events::StatusEvent;
use orgsession_core::result::AppResult;
use orgsession_core::traits::storage::SessionStorage;
use orgsession_core::types::{InstanceId, InstanceRecord, InstanceStatus, InstanceStatusTable};
use orgsession_storage::keys;

/// Capacity of the in-process status event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Durable record of each instance's authentication lifecycle state.
///
/// Storage failures never reach the caller: reads degrade to "no status"
/// and writes are logged and dropped, so coordination cannot break sign-in.
#[derive(Debug, Clone)]
pub struct InstanceStatusStore {
    /// Backing session storage.
    storage: Arc<dyn SessionStorage>,
    /// Key the table is stored under.
    key: String,
    /// Serializes read-modify-write cycles made through this handle and its clones.
    write_lock: Arc<Mutex<()>>,
    /// In-process change notifications.
    events: broadcast::Sender<StatusEvent>,
}

impl InstanceStatusStore {
    /// Create a store that keeps its table under `key`.
    pub fn new(storage: Arc<dyn SessionStorage>, key: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            storage,
            key: key.into(),
            write_lock: Arc::new(Mutex::new(())),
            events,
        }
    }

    /// Create a store whose key is derived from the storage configuration.
    pub fn from_config(storage: Arc<dyn SessionStorage>, config: &StorageConfig) -> Self {
        let key = keys::status_table(&config.status_key, config.session_id.as_deref());
        Self::new(storage, key)
    }

    /// Storage key of the table.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Subscribe to status changes written through this store.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.events.subscribe()
    }

    /// Publish `status` for `instance_id`, stamped with the current time.
    pub async fn set_status(&self, instance_id: InstanceId, status: InstanceStatus) {
        self.put_record(InstanceRecord::new(instance_id, status)).await;
    }

    /// Write a complete record, replacing the instance's previous one.
    ///
    /// Used directly by tooling that needs to control the timestamp.
    pub async fn put_record(&self, record: InstanceRecord) {
        let _guard = self.write_lock.lock().await;

        let mut table = match self.load_for_update().await {
            Some(table) => table,
            None => return,
        };
        table.insert(record.instance_id, record);

        match self.save_table(&table).await {
            Ok(()) => {
                debug!(
                    instance_id = %record.instance_id,
                    status = %record.status,
                    "Instance status written"
                );
                let _ = self.events.send(StatusEvent::Changed { record });
            }
            Err(e) => {
                warn!(
                    instance_id = %record.instance_id,
                    status = %record.status,
                    error = %e,
                    "Failed to persist instance status"
                );
            }
        }
    }

    /// Latest record of `instance_id`, if any.
    pub async fn get_status(&self, instance_id: InstanceId) -> Option<InstanceRecord> {
        self.get_all_statuses().await.remove(&instance_id)
    }

    /// Every instance's latest record. Empty if the table is missing or unreadable.
    pub async fn get_all_statuses(&self) -> InstanceStatusTable {
        match self.load_table().await {
            Ok(table) => table,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read instance status table");
                InstanceStatusTable::new()
            }
        }
    }

    /// Remove the record of `instance_id`.
    pub async fn clear_status(&self, instance_id: InstanceId) {
        let _guard = self.write_lock.lock().await;

        let mut table = match self.load_for_update().await {
            Some(table) => table,
            None => return,
        };
        if table.remove(&instance_id).is_none() {
            return;
        }

        let result = if table.is_empty() {
            self.storage.remove_item(&self.key).await
        } else {
            self.save_table(&table).await
        };

        match result {
            Ok(()) => {
                debug!(instance_id = %instance_id, "Instance status cleared");
                let _ = self.events.send(StatusEvent::Cleared { instance_id });
            }
            Err(e) => {
                warn!(instance_id = %instance_id, error = %e, "Failed to clear instance status");
            }
        }
    }

    /// Remove the whole table.
    pub async fn clear_all(&self) {
        let _guard = self.write_lock.lock().await;

        match self.storage.remove_item(&self.key).await {
            Ok(()) => {
                debug!(key = %self.key, "Instance status table cleared");
                let _ = self.events.send(StatusEvent::AllCleared);
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to clear instance status table");
            }
        }
    }

    async fn load_table(&self) -> AppResult<InstanceStatusTable> {
        match self.storage.get_item(&self.key).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(InstanceStatusTable::new()),
        }
    }

    /// Load the table for a write. A corrupt table is replaced; an
    /// unreachable backend aborts the write.
    async fn load_for_update(&self) -> Option<InstanceStatusTable> {
        match self.load_table().await {
            Ok(table) => Some(table),
            Err(e) if e.kind == ErrorKind::Serialization => {
                warn!(key = %self.key, error = %e, "Discarding corrupt instance status table");
                Some(InstanceStatusTable::new())
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Instance status table unavailable");
                None
            }
        }
    }

    async fn save_table(&self, table: &InstanceStatusTable) -> AppResult<()> {
        let json = serde_json::to_string(table)?;
        self.storage.set_item(&self.key, &json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use orgsession_core::error::AppError;
    use orgsession_storage::memory::MemorySessionStorage;

    /// Storage whose every operation fails.
    #[derive(Debug)]
    struct UnavailableStorage;

    #[async_trait]
    impl SessionStorage for UnavailableStorage {
        fn provider_type(&self) -> &str {
            "unavailable"
        }

        async fn get_item(&self, _key: &str) -> AppResult<Option<String>> {
            Err(AppError::storage("quota exceeded"))
        }

        async fn set_item(&self, _key: &str, _value: &str) -> AppResult<()> {
            Err(AppError::storage("quota exceeded"))
        }

        async fn remove_item(&self, _key: &str) -> AppResult<()> {
            Err(AppError::storage("quota exceeded"))
        }

        async fn clear_prefix(&self, _prefix: &str) -> AppResult<u64> {
            Err(AppError::storage("quota exceeded"))
        }

        async fn health_check(&self) -> AppResult<bool> {
            Ok(false)
        }
    }

    fn memory_store() -> (MemorySessionStorage, InstanceStatusStore) {
        let storage = MemorySessionStorage::new();
        let store = InstanceStatusStore::new(Arc::new(storage.clone()), "orgsession:status");
        (storage, store)
    }

    #[tokio::test]
    async fn test_one_entry_per_instance_with_latest_status() {
        let (_, store) = memory_store();
        store.set_status(InstanceId(0), InstanceStatus::Initializing).await;
        store.set_status(InstanceId(1), InstanceStatus::Initializing).await;
        store.set_status(InstanceId(0), InstanceStatus::Authenticating).await;
        store.set_status(InstanceId(2), InstanceStatus::Idle).await;
        store.set_status(InstanceId(0), InstanceStatus::Authenticated).await;
        store.set_status(InstanceId(1), InstanceStatus::Failed).await;

        let table = store.get_all_statuses().await;
        assert_eq!(table.len(), 3);
        assert_eq!(table[&InstanceId(0)].status, InstanceStatus::Authenticated);
        assert_eq!(table[&InstanceId(1)].status, InstanceStatus::Failed);
        assert_eq!(table[&InstanceId(2)].status, InstanceStatus::Idle);
        for (id, record) in &table {
            assert_eq!(*id, record.instance_id);
        }
    }

    #[tokio::test]
    async fn test_table_is_stored_under_one_key() {
        let (storage, store) = memory_store();
        store.set_status(InstanceId(0), InstanceStatus::Authenticating).await;
        store.set_status(InstanceId(3), InstanceStatus::Idle).await;

        assert_eq!(storage.len(), 1);
        let raw = storage.get_item("orgsession:status").await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["3"]["status"], "idle");
        assert_eq!(value["0"]["instanceId"], 0);
    }

    #[tokio::test]
    async fn test_clear_status_and_clear_all() {
        let (storage, store) = memory_store();
        store.set_status(InstanceId(0), InstanceStatus::Authenticated).await;
        store.set_status(InstanceId(1), InstanceStatus::Authenticated).await;

        store.clear_status(InstanceId(0)).await;
        assert!(store.get_status(InstanceId(0)).await.is_none());
        assert!(store.get_status(InstanceId(1)).await.is_some());

        store.clear_all().await;
        assert!(store.get_all_statuses().await.is_empty());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_clearing_last_record_removes_key() {
        let (storage, store) = memory_store();
        store.set_status(InstanceId(4), InstanceStatus::Idle).await;
        store.clear_status(InstanceId(4)).await;
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_storage_degrades_silently() {
        let store = InstanceStatusStore::new(Arc::new(UnavailableStorage), "k");
        let mut events = store.subscribe();

        store.set_status(InstanceId(0), InstanceStatus::Authenticated).await;
        store.clear_status(InstanceId(0)).await;
        store.clear_all().await;

        assert!(store.get_status(InstanceId(0)).await.is_none());
        assert!(store.get_all_statuses().await.is_empty());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_corrupt_table_reads_empty_and_is_replaced() {
        let (storage, store) = memory_store();
        storage.set_item("orgsession:status", "not json").await.unwrap();

        assert!(store.get_all_statuses().await.is_empty());

        store.set_status(InstanceId(1), InstanceStatus::Authenticating).await;
        let record = store.get_status(InstanceId(1)).await.unwrap();
        assert_eq!(record.status, InstanceStatus::Authenticating);
    }

    #[tokio::test]
    async fn test_writes_publish_events() {
        let (_, store) = memory_store();
        let mut events = store.subscribe();

        store.set_status(InstanceId(0), InstanceStatus::Authenticated).await;
        store.clear_status(InstanceId(0)).await;
        store.clear_all().await;

        match events.recv().await.unwrap() {
            StatusEvent::Changed { record } => {
                assert_eq!(record.instance_id, InstanceId(0));
                assert_eq!(record.status, InstanceStatus::Authenticated);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(
            events.recv().await.unwrap(),
            StatusEvent::Cleared { instance_id } if instance_id == InstanceId(0)
        ));
        assert!(matches!(events.recv().await.unwrap(), StatusEvent::AllCleared));
    }

    #[tokio::test]
    async fn test_from_config_namespaces_by_session() {
        let storage: Arc<dyn SessionStorage> = Arc::new(MemorySessionStorage::new());
        let config = StorageConfig {
            session_id: Some("tab-7".to_string()),
            ..StorageConfig::default()
        };
        let store = InstanceStatusStore::from_config(storage, &config);
        assert_eq!(store.key(), "orgsession:tab-7:instance-status");
    }
}
