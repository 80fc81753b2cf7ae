//! Shared fixtures for client integration tests

#![allow(dead_code)]

use careops_client::{CareOpsClient, MemoryNavigator, MemoryStore, Session, UserProfile};
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

pub struct Harness {
    pub client: CareOpsClient,
    pub store: Arc<MemoryStore>,
    pub navigator: Arc<MemoryNavigator>,
}

/// Client pointed at `server`, parked on an authenticated page
pub fn harness(server: &MockServer) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let navigator = Arc::new(MemoryNavigator::new("/dashboard"));
    let client = CareOpsClient::builder()
        .base_url(server.uri())
        .token_store(store.clone())
        .navigator(navigator.clone())
        .build()
        .unwrap();

    Harness {
        client,
        store,
        navigator,
    }
}

pub fn user() -> UserProfile {
    UserProfile {
        id: "u_1".to_string(),
        email: "owner@clinic.test".to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        role: "owner".to_string(),
    }
}

pub fn session(access: &str, refresh: &str) -> Session {
    Session {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        user: user(),
    }
}

/// Harness with `old-token` / `refresh-1` already stored
pub fn signed_in(server: &MockServer) -> Harness {
    let h = harness(server);
    h.client
        .session_store()
        .save_session(&session("old-token", "refresh-1"))
        .unwrap();
    h
}

/// Logout finishes in the background; wait until it has redirected
pub async fn wait_for_redirect(navigator: &MemoryNavigator) -> Vec<String> {
    for _ in 0..100 {
        let redirects = navigator.redirects();
        if !redirects.is_empty() {
            return redirects;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    navigator.redirects()
}
