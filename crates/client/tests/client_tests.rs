//! Integration tests for the CareOps HTTP client

mod common;

use async_trait::async_trait;
use careops_client::{
    CareOpsClient, ClientError, FederatedSession, IdentityError, IdentityProvider,
    MemoryNavigator, MemoryStore, RequestOptions, SESSION_EXPIRED_MESSAGE, StoreKey, TokenStore,
};
use common::{harness, session, signed_in, wait_for_redirect};
use reqwest::Method;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token_expired() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({ "success": false, "message": "Token expired" }))
}

fn refreshed(token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(json!({ "success": true, "data": { "accessToken": token } }))
}

#[tokio::test]
async fn test_client_builder() {
    let client = CareOpsClient::builder()
        .base_url("http://localhost:5000/api/")
        .build()
        .unwrap();
    assert_eq!(client.base_url(), "http://localhost:5000/api");
}

#[tokio::test]
async fn test_client_builder_rejects_invalid_base_url() {
    let result = CareOpsClient::builder().base_url("not a url").build();
    assert!(matches!(result, Err(ClientError::Configuration(_))));
}

#[tokio::test]
async fn test_attaches_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/workspaces"))
        .and(header("authorization", "Bearer old-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let h = signed_in(&server);
    let body: Value = h.client.get("/workspaces").await.unwrap();
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_no_header_without_stored_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let h = harness(&server);
    let _: Value = h.client.get("/health").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_skip_auth_never_attaches_token_or_refreshes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/forms/intake/submissions"))
        .respond_with(token_expired())
        .mount(&server)
        .await;
    Mock::given(path("/auth/refresh"))
        .respond_with(refreshed("new123"))
        .expect(0)
        .mount(&server)
        .await;

    let h = signed_in(&server);
    let result: Result<Value, _> = h
        .client
        .post_public("/forms/intake/submissions", &json!({ "name": "Jo" }))
        .await;

    match result {
        Err(ClientError::Unauthorized { message }) => assert_eq!(message, "Token expired"),
        other => panic!("expected Unauthorized, got {other:?}"),
    }

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
    assert_eq!(h.store.get(StoreKey::AccessToken).unwrap().as_deref(), Some("old-token"));
    assert!(h.navigator.redirects().is_empty());
}

#[tokio::test]
async fn test_validation_error_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/staff"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "success": false,
            "message": "Validation failed",
            "errors": [{ "field": "email", "message": "Email is required" }]
        })))
        .mount(&server)
        .await;

    let h = signed_in(&server);
    let err = h
        .client
        .post::<Value, _>("/staff", &json!({ "firstName": "Sam" }))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Validation { status: 422, .. }));
    assert_eq!(err.to_string(), "Email is required");
}

#[tokio::test]
async fn test_not_found_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/workspaces/ws_404"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Workspace not found" })),
        )
        .mount(&server)
        .await;

    let h = signed_in(&server);
    let err = h.client.get::<Value>("/workspaces/ws_404").await.unwrap_err();

    assert!(matches!(err, ClientError::NotFound { .. }));
    assert_eq!(err.to_string(), "Workspace not found");
}

#[tokio::test]
async fn test_non_json_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/bookings/b_1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/integrations"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let h = signed_in(&server);

    let empty: Value = h.client.delete("/bookings/b_1").await.unwrap();
    assert_eq!(empty, json!({}));

    let err = h.client.get::<Value>("/integrations").await.unwrap_err();
    assert!(matches!(err, ClientError::Server { status: 502, .. }));
    assert_eq!(err.to_string(), "Request failed with status 502");
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/conversations"))
        .and(header("authorization", "Bearer old-token"))
        .respond_with(token_expired())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/conversations"))
        .and(header("authorization", "Bearer new123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": ["c_1"] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({ "refreshToken": "refresh-1" })))
        .respond_with(refreshed("new123"))
        .expect(1)
        .mount(&server)
        .await;

    let h = signed_in(&server);
    let body: Value = h.client.get("/conversations").await.unwrap();

    assert_eq!(body["data"][0], "c_1");
    assert_eq!(h.store.get(StoreKey::AccessToken).unwrap().as_deref(), Some("new123"));
    assert_eq!(h.store.get(StoreKey::RefreshToken).unwrap().as_deref(), Some("refresh-1"));
    assert!(h.navigator.redirects().is_empty());
}

#[tokio::test]
async fn test_failed_refresh_expires_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bookings"))
        .respond_with(token_expired())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid refresh token" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let h = signed_in(&server);
    let err = h.client.get::<Value>("/bookings").await.unwrap_err();

    assert!(err.is_auth_expired());
    assert_eq!(err.to_string(), SESSION_EXPIRED_MESSAGE);
    for key in StoreKey::ALL {
        assert!(h.store.get(key).unwrap().is_none(), "{} not cleared", key.as_str());
    }
    assert_eq!(wait_for_redirect(&h.navigator).await, vec!["/login".to_string()]);
}

#[tokio::test]
async fn test_retry_is_attempted_only_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/staff"))
        .respond_with(token_expired())
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(refreshed("new123"))
        .expect(1)
        .mount(&server)
        .await;

    let h = signed_in(&server);
    let err = h.client.get::<Value>("/staff").await.unwrap_err();

    match err {
        ClientError::Unauthorized { message } => assert_eq!(message, "Token expired"),
        other => panic!("expected Unauthorized, got {other:?}"),
    }
    assert!(h.navigator.redirects().is_empty());
}

#[tokio::test]
async fn test_unclassified_401_is_not_refreshed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/integrations/calendar/connect"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error": "Calendar access denied" })),
        )
        .mount(&server)
        .await;
    Mock::given(path("/auth/refresh"))
        .respond_with(refreshed("new123"))
        .expect(0)
        .mount(&server)
        .await;

    let h = signed_in(&server);
    let err = h
        .client
        .request::<Value>(
            Method::POST,
            "/integrations/calendar/connect",
            RequestOptions::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Unauthorized { .. }));
    assert_eq!(err.to_string(), "Calendar access denied");
    assert_eq!(h.store.get(StoreKey::AccessToken).unwrap().as_deref(), Some("old-token"));
}

#[tokio::test]
async fn test_missing_refresh_token_skips_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/workspaces"))
        .respond_with(token_expired())
        .mount(&server)
        .await;
    Mock::given(path("/auth/refresh"))
        .respond_with(refreshed("new123"))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(&server);
    h.store.set(StoreKey::AccessToken, "orphan-token").unwrap();

    let err = h.client.get::<Value>("/workspaces").await.unwrap_err();
    assert!(matches!(err, ClientError::SessionExpired));
    assert!(h.store.get(StoreKey::AccessToken).unwrap().is_none());
}

#[tokio::test]
async fn test_malformed_refresh_payload_expires_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/workspaces"))
        .respond_with(token_expired())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let h = signed_in(&server);
    let err = h.client.get::<Value>("/workspaces").await.unwrap_err();
    assert!(matches!(err, ClientError::SessionExpired));
}

#[tokio::test]
async fn test_concurrent_expired_calls_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer old-token"))
        .respond_with(token_expired())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer new123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(4)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(refreshed("new123").set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let h = signed_in(&server);
    let c = &h.client;
    let (a, b, d, e) = tokio::join!(
        c.get::<Value>("/workspaces"),
        c.get::<Value>("/bookings"),
        c.get::<Value>("/conversations"),
        c.get::<Value>("/staff"),
    );

    for result in [a, b, d, e] {
        assert_eq!(result.unwrap()["ok"], true);
    }
    assert!(!c.refresher().is_refreshing());
}

#[tokio::test]
async fn test_concurrent_failed_refresh_logs_out_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(token_expired())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(500).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let h = signed_in(&server);
    let c = &h.client;
    let (a, b, d) = tokio::join!(
        c.get::<Value>("/workspaces"),
        c.get::<Value>("/bookings"),
        c.get::<Value>("/conversations"),
    );

    for result in [a, b, d] {
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), SESSION_EXPIRED_MESSAGE);
    }
    assert_eq!(wait_for_redirect(&h.navigator).await, vec!["/login".to_string()]);
    assert!(c.logout_sequence().in_progress());
}

/// Identity provider whose sign-out hangs far longer than any caller waits
struct SlowIdentity;

#[async_trait]
impl IdentityProvider for SlowIdentity {
    async fn current_session(&self) -> Result<Option<FederatedSession>, IdentityError> {
        Ok(Some(FederatedSession {
            provider: "google".to_string(),
            subject: None,
        }))
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(())
    }
}

#[tokio::test]
async fn test_session_expired_does_not_wait_for_federated_sign_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contacts"))
        .respond_with(token_expired())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let navigator = Arc::new(MemoryNavigator::new("/contacts"));
    let client = CareOpsClient::builder()
        .base_url(server.uri())
        .token_store(store.clone())
        .identity_provider(Arc::new(SlowIdentity))
        .navigator(navigator.clone())
        .build()
        .unwrap();
    client
        .session_store()
        .save_session(&session("old-token", "refresh-1"))
        .unwrap();

    let err = tokio::time::timeout(Duration::from_secs(1), client.get::<Value>("/contacts"))
        .await
        .expect("request blocked on federated sign-out")
        .unwrap_err();

    assert!(matches!(err, ClientError::SessionExpired));
    for key in StoreKey::ALL {
        assert!(store.get(key).unwrap().is_none(), "{} not cleared", key.as_str());
    }
    assert!(navigator.redirects().is_empty());
}
