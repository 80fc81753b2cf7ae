//! Single-flight access token refresh
//!
//! At most one refresh exchange is in flight at a time. Callers that arrive
//! while one is pending await the same shared future and observe the same
//! result, success or not. The slot is cleared when the exchange finishes, so
//! the next caller starts a fresh attempt.

use crate::session::{ApiEnvelope, RefreshData, RefreshRequest};
use crate::store::SessionStore;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, info, warn};

type RefreshFuture = Shared<BoxFuture<'static, Option<String>>>;

/// Coordinates refresh-token exchanges for one client
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    http: Client,
    url: String,
    store: SessionStore,
    in_flight: Mutex<Option<InFlight>>,
    next_id: AtomicU64,
}

struct InFlight {
    id: u64,
    future: RefreshFuture,
}

impl RefreshCoordinator {
    /// `url` is the absolute refresh endpoint, e.g. `{base}/auth/refresh`
    pub fn new(http: Client, url: impl Into<String>, store: SessionStore) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                url: url.into(),
                store,
                in_flight: Mutex::new(None),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Returns `None` on any failure; errors are logged, never returned.
    pub async fn refresh(&self) -> Option<String> {
        let future = {
            let mut slot = self.inner.slot();
            if let Some(flight) = slot.as_ref() {
                debug!("joining in-flight token refresh");
                flight.future.clone()
            } else {
                let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                let future = self.start(id);
                *slot = Some(InFlight {
                    id,
                    future: future.clone(),
                });
                future
            }
        };

        future.await
    }

    /// Whether an exchange is currently pending
    pub fn is_refreshing(&self) -> bool {
        self.inner.slot().is_some()
    }

    fn start(&self, id: u64) -> RefreshFuture {
        let http = self.inner.http.clone();
        let url = self.inner.url.clone();
        let store = self.inner.store.clone();
        let owner: Weak<Inner> = Arc::downgrade(&self.inner);

        async move {
            let outcome = exchange(&http, &url, &store).await;
            if let Some(inner) = owner.upgrade() {
                inner.finish(id);
            }
            outcome
        }
        .boxed()
        .shared()
    }
}

impl Inner {
    fn slot(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self, id: u64) {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|flight| flight.id == id) {
            *slot = None;
        }
    }
}

async fn exchange(http: &Client, url: &str, store: &SessionStore) -> Option<String> {
    let refresh_token = match store.refresh_token() {
        Ok(Some(token)) => token,
        Ok(None) => {
            debug!("no refresh token stored, skipping refresh");
            return None;
        }
        Err(err) => {
            warn!(error = %err, "failed to read refresh token");
            return None;
        }
    };

    let response = match http
        .post(url)
        .json(&RefreshRequest {
            refresh_token: &refresh_token,
        })
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, "token refresh request failed");
            return None;
        }
    };

    let status = response.status();
    if !status.is_success() {
        warn!(%status, "token refresh rejected");
        return None;
    }

    let access_token = match response.json::<ApiEnvelope<RefreshData>>().await {
        Ok(envelope) => match envelope.into_data() {
            Some(data) => data.access_token,
            None => {
                warn!("token refresh response did not report success");
                return None;
            }
        },
        Err(err) => {
            warn!(error = %err, "malformed token refresh response");
            return None;
        }
    };
    if access_token.is_empty() {
        warn!("token refresh returned an empty access token");
        return None;
    }

    if let Err(err) = store.set_access_token(&access_token) {
        warn!(error = %err, "failed to persist refreshed access token");
        return None;
    }

    info!("access token refreshed");
    Some(access_token)
}
