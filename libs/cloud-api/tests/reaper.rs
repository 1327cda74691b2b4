//! Reaper behaviour against a mock cloud API.
//!
//! Every test mounts the list endpoints the reap touches and sets an exact
//! expectation on each delete; wiremock verifies the counts when the server
//! is dropped.

use fixture_api::{
    cleanup_accounts, AccountOutcome, ApiClient, ApiConfig, FailurePolicy, ReapError, ReapTarget,
    Reaper,
};
use fixture_pool::CredentialRecord;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fixture_api=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

fn page(items: Value) -> ResponseTemplate {
    let results = items.as_array().map(Vec::len).unwrap_or(0);
    ResponseTemplate::new(200).set_body_json(json!({
        "data": items,
        "page": 1,
        "pages": 1,
        "results": results,
    }))
}

async fn mount_list(server: &MockServer, endpoint: &str, items: Value) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(page(items))
        .mount(server)
        .await;
}

async fn expect_delete(server: &MockServer, resource_path: &str, status: u16, times: u64) {
    Mock::given(method("DELETE"))
        .and(path(resource_path))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({})))
        .expect(times)
        .mount(server)
        .await;
}

fn reaper_for(server: &MockServer, token: &str) -> Reaper {
    let config = ApiConfig::new(server.uri(), token);
    Reaper::new(ApiClient::new(&config).unwrap())
}

#[tokio::test]
async fn delete_all_removes_only_private_images() {
    init_tracing();
    let server = MockServer::start().await;

    mount_list(&server, "/domains", json!([])).await;
    mount_list(&server, "/nodebalancers", json!([])).await;
    mount_list(&server, "/account/users", json!([])).await;
    mount_list(
        &server,
        "/images",
        json!([
            { "id": "private/1", "is_public": false },
            { "id": "linode/debian9", "is_public": true },
            { "id": "private/2", "is_public": false },
            { "id": "linode/arch", "is_public": true },
        ]),
    )
    .await;

    expect_delete(&server, "/images/private/1", 200, 1).await;
    expect_delete(&server, "/images/private/2", 200, 1).await;
    expect_delete(&server, "/images/linode/debian9", 200, 0).await;
    expect_delete(&server, "/images/linode/arch", 200, 0).await;

    let report = reaper_for(&server, "token").delete_all(Some("root")).await;

    assert!(report.is_clean());
    let images = report.endpoint("/images").unwrap();
    assert_eq!(images.listed, 4);
    assert_eq!(images.skipped, 2);
    assert_eq!(images.deleted, ["private/1", "private/2"]);
}

#[tokio::test]
async fn delete_all_never_deletes_the_callers_user() {
    init_tracing();

    for position in 0..3 {
        let server = MockServer::start().await;
        let mut users = vec![json!({ "username": "child-a" }), json!({ "username": "child-b" })];
        users.insert(position, json!({ "username": "root" }));

        mount_list(&server, "/domains", json!([])).await;
        mount_list(&server, "/nodebalancers", json!([])).await;
        mount_list(&server, "/images", json!([])).await;
        mount_list(&server, "/account/users", Value::Array(users)).await;

        expect_delete(&server, "/account/users/root", 204, 0).await;
        expect_delete(&server, "/account/users/child-a", 204, 1).await;
        expect_delete(&server, "/account/users/child-b", 204, 1).await;

        let report = reaper_for(&server, "token").delete_all(Some("root")).await;
        assert_eq!(report.endpoint("/account/users").unwrap().skipped, 1);
        assert_eq!(report.total_deleted(), 2);
    }
}

#[tokio::test]
async fn failed_delete_is_reported_without_stopping_siblings() {
    init_tracing();
    let server = MockServer::start().await;

    mount_list(
        &server,
        "/domains",
        json!([{ "id": 1 }, { "id": 2 }, { "id": 3 }]),
    )
    .await;
    mount_list(&server, "/nodebalancers", json!([{ "id": 10 }])).await;
    mount_list(&server, "/images", json!([])).await;
    mount_list(&server, "/account/users", json!([])).await;

    expect_delete(&server, "/domains/1", 200, 1).await;
    expect_delete(&server, "/domains/2", 500, 1).await;
    expect_delete(&server, "/domains/3", 200, 1).await;
    expect_delete(&server, "/nodebalancers/10", 200, 1).await;

    let report = reaper_for(&server, "token").delete_all(None).await;

    assert!(!report.is_clean());
    assert_eq!(report.total_deleted(), 3);
    assert_eq!(report.total_failed(), 1);

    let domains = report.endpoint("/domains").unwrap();
    assert_eq!(domains.deleted, ["1", "3"]);
    assert_eq!(domains.failures[0].key, "2");
    assert_eq!(domains.failures[0].status, Some(500));
    assert!(report.endpoint("/nodebalancers").unwrap().is_clean());

    // Collect policy: nothing escalates.
    assert!(report.into_result().is_ok());
}

#[tokio::test]
async fn list_failure_is_recorded_per_endpoint() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/domains"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;
    mount_list(&server, "/nodebalancers", json!([])).await;
    mount_list(&server, "/images", json!([])).await;
    mount_list(&server, "/account/users", json!([])).await;

    let report = reaper_for(&server, "token").delete_all(Some("root")).await;

    let domains = report.endpoint("/domains").unwrap();
    let message = domains.list_error.as_deref().unwrap();
    assert!(message.contains("503"), "{message}");
    assert!(message.contains("maintenance"), "{message}");
    assert_eq!(report.total_failed(), 1);
}

#[tokio::test]
async fn remove_all_linodes_follows_pagination() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/linode/instances"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": 100 }, { "id": 101 }],
            "page": 1,
            "pages": 2,
            "results": 3,
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/linode/instances"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": 102 }],
            "page": 2,
            "pages": 2,
            "results": 3,
        })))
        .expect(1)
        .mount(&server)
        .await;

    for id in [100, 101, 102] {
        expect_delete(&server, &format!("/linode/instances/{id}"), 200, 1).await;
    }

    let report = reaper_for(&server, "token").remove_all_linodes().await;
    assert!(report.is_clean());
    assert_eq!(report.total_deleted(), 3);
}

#[tokio::test]
async fn remove_all_volumes_waits_for_every_delete_then_fails() {
    init_tracing();
    let server = MockServer::start().await;

    mount_list(
        &server,
        "/volumes",
        json!([{ "id": 1 }, { "id": 2 }, { "id": 3 }]),
    )
    .await;
    expect_delete(&server, "/volumes/1", 200, 1).await;
    expect_delete(&server, "/volumes/2", 400, 1).await;
    expect_delete(&server, "/volumes/3", 200, 1).await;

    let failed = reaper_for(&server, "token")
        .remove_all_volumes()
        .await
        .unwrap_err();

    match &failed.error {
        ReapError::Delete { endpoint, key, .. } => {
            assert_eq!(endpoint, "/volumes");
            assert_eq!(key, "2");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(failed.report.endpoints[0].deleted, ["1", "3"]);
}

#[tokio::test]
async fn remove_all_volumes_reports_failures_in_listing_order() {
    init_tracing();
    let server = MockServer::start().await;

    mount_list(
        &server,
        "/volumes",
        json!([{ "id": 9 }, { "id": 10 }, { "id": 11 }]),
    )
    .await;
    expect_delete(&server, "/volumes/9", 400, 1).await;
    expect_delete(&server, "/volumes/10", 400, 1).await;
    expect_delete(&server, "/volumes/11", 200, 1).await;

    let failed = reaper_for(&server, "token")
        .remove_all_volumes()
        .await
        .unwrap_err();

    assert!(matches!(&failed.error, ReapError::Delete { key, .. } if key == "9"));

    let volumes = failed.report.endpoint("/volumes").unwrap();
    assert_eq!(volumes.deleted, ["11"]);
    let failed_keys: Vec<_> = volumes.failures.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(failed_keys, ["9", "10"]);
    assert_eq!(failed.report.total_failed(), 2);
}

#[tokio::test]
async fn remove_all_volumes_succeeds_when_clean() {
    init_tracing();
    let server = MockServer::start().await;

    mount_list(&server, "/volumes", json!([{ "id": 9 }])).await;
    expect_delete(&server, "/volumes/9", 200, 1).await;

    let report = reaper_for(&server, "token")
        .remove_all_volumes()
        .await
        .unwrap();
    assert_eq!(report.endpoints[0].policy, FailurePolicy::FirstError);
    assert_eq!(report.total_deleted(), 1);
}

#[tokio::test]
async fn custom_targets_are_reported_in_order() {
    init_tracing();
    let server = MockServer::start().await;

    mount_list(&server, "/profile/sshkeys", json!([{ "id": 5 }])).await;
    mount_list(&server, "/linode/stackscripts", json!([])).await;
    expect_delete(&server, "/profile/sshkeys/5", 200, 1).await;

    let report = reaper_for(&server, "token")
        .reap(vec![
            ReapTarget::new("/profile/sshkeys"),
            ReapTarget::new("/linode/stackscripts"),
        ])
        .await;

    let order: Vec<_> = report.endpoints.iter().map(|e| e.endpoint.as_str()).collect();
    assert_eq!(order, ["/profile/sshkeys", "/linode/stackscripts"]);
    assert_eq!(report.total_deleted(), 1);
}

#[tokio::test]
async fn cleanup_accounts_uses_each_token_and_spares_each_owner() {
    init_tracing();
    let server = MockServer::start().await;

    for endpoint in ["/domains", "/nodebalancers", "/images"] {
        mount_list(&server, endpoint, json!([])).await;
    }
    Mock::given(method("GET"))
        .and(path("/account/users"))
        .and(header("authorization", "Bearer token-a"))
        .respond_with(page(json!([{ "username": "alice" }, { "username": "alice-child" }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/account/users"))
        .and(header("authorization", "Bearer token-b"))
        .respond_with(page(json!([{ "username": "bob" }])))
        .expect(1)
        .mount(&server)
        .await;
    expect_delete(&server, "/account/users/alice-child", 204, 1).await;
    expect_delete(&server, "/account/users/alice", 204, 0).await;
    expect_delete(&server, "/account/users/bob", 204, 0).await;

    let mut alice = CredentialRecord::new("alice", "pw", None);
    alice.token = "token-a".to_string();
    let bob = CredentialRecord::new("bob", "pw", Some("token-b".to_string()));
    let tokenless = CredentialRecord::new("carol", "pw", None);

    let config = ApiConfig::new(server.uri(), "unused");
    let results = cleanup_accounts(&config, &[alice, bob, tokenless]).await;

    let names: Vec<_> = results.iter().map(|r| r.username.as_str()).collect();
    assert_eq!(names, ["alice", "bob", "carol"]);
    for result in &results[..2] {
        match &result.outcome {
            AccountOutcome::Reaped(report) => assert!(report.is_clean()),
            other => panic!("unexpected outcome for {}: {other:?}", result.username),
        }
    }
    assert!(matches!(results[2].outcome, AccountOutcome::SkippedNoToken));
}
