//! Integration tests for sub-organization registration and sign-out.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use orgsession_core::error::ErrorKind;
use orgsession_core::events::SubOrgEvent;
use orgsession_core::types::{InstanceId, InstanceStatus, OrganizationId};
use orgsession_http::PipelineRequest;

use helpers::{TestExchanger, TestParent};

const PARENT: InstanceId = InstanceId::ROOT;
const SUB_A: InstanceId = InstanceId(1);
const SUB_B: InstanceId = InstanceId(2);

fn org(id: &str) -> OrganizationId {
    OrganizationId::new(id)
}

#[tokio::test]
async fn test_mounted_sub_instance_sends_exchanged_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/o/org-a/scim2/Me"))
        .and(header("authorization", "Bearer exchanged-org-a"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let runtime = helpers::memory_runtime();
    let parent = TestParent::signed_in();
    let exchanger = Arc::new(TestExchanger::default());
    runtime
        .status_store()
        .set_status(PARENT, InstanceStatus::Authenticated)
        .await;

    let coordinator = runtime.coordinator(parent, exchanger.clone());
    let bootstrap = runtime.bootstrap(PARENT, coordinator.clone());
    let token = runtime
        .mount_sub_instance(&bootstrap, SUB_A, &org("org-a"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(token.access_token, "exchanged-org-a");

    let client = runtime.http_client(SUB_A).unwrap().with_base_url(server.uri());
    client
        .send(PipelineRequest::get("/o/org-a/scim2/Me"))
        .await
        .unwrap();

    let record = runtime.status_store().get_status(SUB_A).await.unwrap();
    assert_eq!(record.status, InstanceStatus::Authenticated);
    assert_eq!(coordinator.active_sessions().await.len(), 1);
    assert_eq!(exchanger.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_registration_before_parent_sign_in_fails() {
    let runtime = helpers::memory_runtime();
    runtime
        .status_store()
        .set_status(PARENT, InstanceStatus::Authenticated)
        .await;
    let coordinator = runtime.coordinator(TestParent::signed_out(), Arc::new(TestExchanger::default()));
    let bootstrap = runtime.bootstrap(PARENT, coordinator);

    let err = runtime
        .mount_sub_instance(&bootstrap, SUB_A, &org("org-a"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::NotSignedIn);
    let record = runtime.status_store().get_status(SUB_A).await.unwrap();
    assert_eq!(record.status, InstanceStatus::Failed);
}

#[tokio::test]
async fn test_parent_sign_out_idles_every_sub_instance() {
    let runtime = helpers::memory_runtime();
    runtime
        .status_store()
        .set_status(PARENT, InstanceStatus::Authenticated)
        .await;
    let coordinator = runtime.coordinator(TestParent::signed_in(), Arc::new(TestExchanger::default()));
    let bootstrap = runtime.bootstrap(PARENT, coordinator.clone());
    let mut events = coordinator.subscribe();

    for (sub, id) in [(SUB_A, "org-a"), (SUB_B, "org-b")] {
        runtime
            .mount_sub_instance(&bootstrap, sub, &org(id), &CancellationToken::new())
            .await
            .unwrap();
    }

    let report = coordinator.sign_out_all_sub_orgs().await;
    assert_eq!(report.notified, 2);
    assert_eq!(report.failed, 0);
    assert!(coordinator.sessions().await.is_empty());
    assert!(!bootstrap.is_mounted(SUB_A));
    assert!(!bootstrap.is_mounted(SUB_B));

    // Sub-instances flip to idle from spawned tasks.
    for _ in 0..50 {
        let a = runtime.status_store().get_status(SUB_A).await.unwrap().status;
        let b = runtime.status_store().get_status(SUB_B).await.unwrap().status;
        if a == InstanceStatus::Idle && b == InstanceStatus::Idle {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(
        runtime.status_store().get_status(SUB_A).await.unwrap().status,
        InstanceStatus::Idle
    );
    assert_eq!(
        runtime.status_store().get_status(SUB_B).await.unwrap().status,
        InstanceStatus::Idle
    );

    let mut saw_sign_out = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, SubOrgEvent::ParentSignedOut { notified: 2, .. }) {
            saw_sign_out = true;
        }
    }
    assert!(saw_sign_out);
}

#[tokio::test]
async fn test_unmount_allows_fresh_registration() {
    let runtime = helpers::memory_runtime();
    runtime
        .status_store()
        .set_status(PARENT, InstanceStatus::Authenticated)
        .await;
    let exchanger = Arc::new(TestExchanger::default());
    let coordinator = runtime.coordinator(TestParent::signed_in(), exchanger.clone());
    let bootstrap = runtime.bootstrap(PARENT, coordinator.clone());

    runtime
        .mount_sub_instance(&bootstrap, SUB_A, &org("org-a"), &CancellationToken::new())
        .await
        .unwrap();

    let duplicate = runtime
        .mount_sub_instance(&bootstrap, SUB_B, &org("org-a"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(duplicate.kind, ErrorKind::AlreadyExists);

    bootstrap.unmount(SUB_A, &org("org-a")).await;
    runtime.teardown(SUB_A).await;
    assert!(runtime.status_store().get_status(SUB_A).await.is_none());
    assert!(runtime.pipelines().get(SUB_A).is_none());

    runtime
        .mount_sub_instance(&bootstrap, SUB_B, &org("org-a"), &CancellationToken::new())
        .await
        .unwrap();
    let session = coordinator.session(&org("org-a")).await.unwrap();
    assert!(session.is_active);
    assert_eq!(session.instance_id, SUB_B);
    assert_eq!(exchanger.calls.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_sub_instance_waits_for_parent_to_authenticate() {
    let runtime = helpers::memory_runtime();
    let coordinator = runtime.coordinator(TestParent::signed_in(), Arc::new(TestExchanger::default()));
    let bootstrap = runtime.bootstrap(PARENT, coordinator);

    let store = runtime.status_store().clone();
    tokio::spawn(async move {
        store.set_status(PARENT, InstanceStatus::Authenticating).await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        store.set_status(PARENT, InstanceStatus::Authenticated).await;
    });

    let started = tokio::time::Instant::now();
    runtime
        .mount_sub_instance(&bootstrap, SUB_A, &org("org-b"), &CancellationToken::new())
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(300));
    assert_eq!(
        runtime.status_store().get_status(SUB_A).await.unwrap().status,
        InstanceStatus::Authenticated
    );
}
