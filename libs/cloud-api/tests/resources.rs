//! Endpoint calls against a mock cloud API.

use fixture_api::{ApiClient, ApiConfig, ApiError, CreateLinode};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(&ApiConfig::new(server.uri(), "test-token")).unwrap()
}

#[tokio::test]
async fn create_linode_posts_harness_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/linode/instances"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({
            "backups_enabled": false,
            "booted": true,
            "image": "linode/debian9",
            "region": "us-east",
            "root_pass": "s3cret!",
            "type": "g6-standard-1",
            "label": "e2e-fixture",
            "tags": ["e2e"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 77, "label": "e2e-fixture" })))
        .expect(1)
        .mount(&server)
        .await;

    let request = CreateLinode::new("s3cret!")
        .label("e2e-fixture")
        .tags(["e2e".to_string()]);
    let linode = client_for(&server).create_linode(&request).await.unwrap();
    assert_eq!(linode["id"], 77);
}

#[tokio::test]
async fn allocate_private_ip_requests_ipv4() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/linode/instances/77/ips"))
        .and(body_json(json!({ "public": false, "type": "ipv4" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "address": "192.168.1.5" })))
        .expect(1)
        .mount(&server)
        .await;

    let ip = client_for(&server).allocate_private_ip(77).await.unwrap();
    assert_eq!(ip["address"], "192.168.1.5");
}

#[tokio::test]
async fn private_images_are_filtered_server_side() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/images"))
        .and(query_param("page", "1"))
        .and(header("x-filter", r#"{"is_public":false}"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "private/3", "is_public": false }],
            "page": 1,
            "pages": 1,
            "results": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let images = client_for(&server).list_private_images().await.unwrap();
    assert_eq!(images.results, 1);
    assert_eq!(images.data[0]["id"], "private/3");
}

#[tokio::test]
async fn update_profile_puts_partial_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/profile"))
        .and(body_json(json!({ "timezone": "UTC" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "username": "alice", "timezone": "UTC" })))
        .expect(1)
        .mount(&server)
        .await;

    let profile = client_for(&server)
        .update_profile(&json!({ "timezone": "UTC" }))
        .await
        .unwrap();
    assert_eq!(profile["timezone"], "UTC");
}

#[tokio::test]
async fn error_status_carries_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/domains/9"))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"errors":[{"reason":"Not found"}]}"#))
        .mount(&server)
        .await;

    let err = client_for(&server).remove_domain("9").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    match err {
        ApiError::Status { method, path, body, .. } => {
            assert_eq!(method, "DELETE");
            assert_eq!(path, "/domains/9");
            assert!(body.contains("Not found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn non_json_success_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).get_profile().await.unwrap_err();
    assert!(matches!(err, ApiError::Decode { .. }));
}
