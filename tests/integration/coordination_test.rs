//! Integration tests for cross-instance status coordination.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

use orgsession::InstanceRuntime;
use orgsession_coord::{WaitOptions, WaitOutcome};
use orgsession_core::config::AppConfig;
use orgsession_core::types::{InstanceId, InstanceStatus};
use orgsession_storage::file::FileSessionStorage;
use orgsession_storage::memory::MemorySessionStorage;

const PARENT: InstanceId = InstanceId::ROOT;
const CHILD: InstanceId = InstanceId(1);

#[tokio::test(start_paused = true)]
async fn test_child_sees_parent_through_shared_storage() {
    // Two runtimes stand in for two isolated contexts: no shared events, only storage.
    let storage = MemorySessionStorage::new();
    let parent_side = helpers::runtime_on(&storage);
    let child_side = helpers::runtime_on(&storage);
    let t0 = Instant::now();

    parent_side
        .status_store()
        .set_status(PARENT, InstanceStatus::Authenticating)
        .await;
    let parent_store = parent_side.status_store().clone();
    let writer = tokio::spawn(async move {
        sleep(Duration::from_millis(50)).await;
        parent_store.set_status(PARENT, InstanceStatus::Authenticated).await;
    });

    sleep(Duration::from_millis(5)).await;
    child_side
        .status_store()
        .set_status(CHILD, InstanceStatus::Initializing)
        .await;
    let ready = child_side
        .wait_protocol()
        .wait_for_parent(PARENT, WaitOptions::from_millis(5000, 10))
        .await;
    let elapsed = t0.elapsed();
    writer.await.unwrap();

    assert!(ready);
    assert!(elapsed >= Duration::from_millis(50), "{elapsed:?}");
    assert!(elapsed <= Duration::from_millis(60), "{elapsed:?}");

    let table = child_side.status_store().get_all_statuses().await;
    assert_eq!(table.len(), 2);
    assert_eq!(table[&PARENT].status, InstanceStatus::Authenticated);
    assert_eq!(table[&CHILD].status, InstanceStatus::Initializing);
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_silent_parent_times_out() {
    let runtime = helpers::memory_runtime();
    let t0 = Instant::now();

    let ready = runtime
        .wait_protocol()
        .wait_for_parent(PARENT, WaitOptions::from_millis(200, 50))
        .await;

    assert!(!ready);
    assert_eq!(t0.elapsed(), Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn test_lost_update_is_healed_by_owners_next_write() {
    let storage = MemorySessionStorage::new();
    let a = helpers::runtime_on(&storage);
    let b = helpers::runtime_on(&storage);
    let key = a.status_store().key().to_string();

    b.status_store().set_status(CHILD, InstanceStatus::Authenticating).await;
    let stale_snapshot = orgsession_core::traits::SessionStorage::get_item(&storage, &key)
        .await
        .unwrap()
        .unwrap();

    a.status_store().set_status(PARENT, InstanceStatus::Authenticated).await;
    // B re-writes the table it read before A's write landed.
    orgsession_core::traits::SessionStorage::set_item(&storage, &key, &stale_snapshot)
        .await
        .unwrap();
    assert!(b.status_store().get_status(PARENT).await.is_none());

    a.status_store().set_status(PARENT, InstanceStatus::Authenticated).await;
    let table = b.status_store().get_all_statuses().await;
    assert_eq!(table[&PARENT].status, InstanceStatus::Authenticated);
    assert_eq!(table[&CHILD].status, InstanceStatus::Authenticating);
}

#[tokio::test]
async fn test_file_storage_rendezvous_between_runtimes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let parent_side =
        InstanceRuntime::with_storage(AppConfig::default(), Arc::new(FileSessionStorage::new(&path)));
    let child_side =
        InstanceRuntime::with_storage(AppConfig::default(), Arc::new(FileSessionStorage::new(&path)));

    let parent_store = parent_side.status_store().clone();
    tokio::spawn(async move {
        parent_store.set_status(PARENT, InstanceStatus::Authenticating).await;
        sleep(Duration::from_millis(30)).await;
        parent_store.set_status(PARENT, InstanceStatus::Authenticated).await;
    });

    let outcome = child_side
        .wait_protocol()
        .wait_for_parent_until(PARENT, WaitOptions::from_millis(5000, 10), &CancellationToken::new())
        .await;

    assert_eq!(outcome, WaitOutcome::Ready);
    assert!(child_side.wait_protocol().is_parent_ready(PARENT).await);
}

#[tokio::test(start_paused = true)]
async fn test_failed_parent_fails_waiting_child() {
    let runtime = helpers::memory_runtime();
    let store = runtime.status_store().clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(20)).await;
        store.set_status(PARENT, InstanceStatus::Failed).await;
    });

    let outcome = runtime
        .wait_protocol()
        .wait_for_parent_until(PARENT, runtime.wait_options(), &CancellationToken::new())
        .await;
    assert_eq!(outcome, WaitOutcome::Failed);
}
