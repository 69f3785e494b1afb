//! Integration tests for per-instance request pipelines.

mod helpers;

use std::sync::{Arc, Mutex};

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use orgsession_core::types::InstanceId;
use orgsession_http::{LifecycleCallbacks, PipelineRequest, PipelineSettings, StaticTokenAttacher};

use helpers::TestParent;

fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> LifecycleCallbacks {
    let (start, finish) = (log.clone(), log.clone());
    LifecycleCallbacks::new()
        .on_start(move |_| {
            start.lock().unwrap().push(format!("{tag}:start"));
            Ok(())
        })
        .on_finish(move || {
            finish.lock().unwrap().push(format!("{tag}:finish"));
            Ok(())
        })
}

#[tokio::test]
async fn test_instances_never_share_tokens_or_callbacks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let runtime = helpers::memory_runtime();
    let log = Arc::new(Mutex::new(Vec::new()));

    runtime
        .pipeline(InstanceId(0))
        .init(
            PipelineSettings::new(true)
                .with_attacher(Arc::new(StaticTokenAttacher::new("token-zero").unwrap()))
                .with_callbacks(recorder(&log, "zero")),
        )
        .await;
    runtime
        .pipeline(InstanceId(1))
        .init(
            PipelineSettings::new(true)
                .with_attacher(Arc::new(StaticTokenAttacher::new("token-one").unwrap()))
                .with_callbacks(recorder(&log, "one")),
        )
        .await;

    let zero = runtime.http_client(InstanceId(0)).unwrap().with_base_url(server.uri());
    let one = runtime.http_client(InstanceId(1)).unwrap().with_base_url(server.uri());
    zero.send(PipelineRequest::get("/me")).await.unwrap();
    one.send(PipelineRequest::get("/me")).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let tokens: Vec<String> = requests
        .iter()
        .map(|r| {
            r.headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        })
        .collect();
    assert_eq!(tokens, vec!["Bearer token-zero", "Bearer token-one"]);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["zero:start", "zero:finish", "one:start", "one:finish"]
    );
}

#[tokio::test]
async fn test_parent_token_is_read_on_every_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer parent-token-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer parent-token-2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let runtime = helpers::memory_runtime();
    let parent = TestParent::signed_in();
    runtime
        .attach_parent_session(InstanceId(0), parent.clone(), LifecycleCallbacks::new())
        .await;
    let client = runtime.http_client(InstanceId(0)).unwrap().with_base_url(server.uri());

    client.send(PipelineRequest::get("/orgs")).await.unwrap();
    parent.rotate_token("parent-token-2");
    client.send(PipelineRequest::get("/orgs")).await.unwrap();
}

#[tokio::test]
async fn test_disabled_handler_still_authenticates_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer parent-token-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let runtime = helpers::memory_runtime();
    let log = Arc::new(Mutex::new(Vec::new()));
    runtime
        .attach_parent_session(InstanceId(0), TestParent::signed_in(), recorder(&log, "parent"))
        .await;
    runtime.pipeline(InstanceId(0)).disable_handler();

    let client = runtime.http_client(InstanceId(0)).unwrap().with_base_url(server.uri());
    client.send(PipelineRequest::get("/orgs")).await.unwrap();

    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_signed_out_parent_blocks_dispatch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let runtime = helpers::memory_runtime();
    runtime
        .attach_parent_session(InstanceId(0), TestParent::signed_out(), LifecycleCallbacks::new())
        .await;
    let client = runtime.http_client(InstanceId(0)).unwrap().with_base_url(server.uri());

    let err = client.send(PipelineRequest::get("/orgs")).await.unwrap_err();
    assert_eq!(err.kind, orgsession_core::error::ErrorKind::NotSignedIn);
}
