//! Logout after an unrecoverable authentication failure

use crate::identity::IdentityProvider;
use crate::navigation::{Navigator, is_public_path};
use crate::store::SessionStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// Default window during which further logouts are ignored
pub const DEFAULT_LOGOUT_COOLDOWN: Duration = Duration::from_secs(1);

/// Clears the session, ends any federated session and sends the user to
/// the login page. Runs at most once per cooldown window.
///
/// The cooldown timer needs a tokio runtime; without one the guard is
/// released as soon as the sequence ends.
#[derive(Clone)]
pub struct LogoutSequence {
    inner: Arc<Inner>,
}

struct Inner {
    store: SessionStore,
    identity: Arc<dyn IdentityProvider>,
    navigator: Arc<dyn Navigator>,
    login_path: String,
    public_paths: Vec<String>,
    cooldown: Duration,
    in_progress: AtomicBool,
}

impl LogoutSequence {
    pub fn new(
        store: SessionStore,
        identity: Arc<dyn IdentityProvider>,
        navigator: Arc<dyn Navigator>,
        login_path: impl Into<String>,
        public_paths: Vec<String>,
        cooldown: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                identity,
                navigator,
                login_path: login_path.into(),
                public_paths,
                cooldown,
                in_progress: AtomicBool::new(false),
            }),
        }
    }

    /// Whether a logout started within the current cooldown window
    pub fn in_progress(&self) -> bool {
        self.inner.in_progress.load(Ordering::Acquire)
    }

    /// Tear down the session and wait for every step to finish.
    ///
    /// Never fails; every step is best-effort. Outside a tokio runtime the
    /// guard is released immediately instead of after the cooldown.
    pub async fn handle_unauthorized(&self) {
        if !self.begin() {
            return;
        }
        self.finish().await;
    }

    /// Clear the stored session now and run the rest of the logout in the
    /// background.
    ///
    /// Callers see an empty store as soon as this returns; federated
    /// sign-out and the redirect never hold them up. Without a tokio
    /// runtime the federated sign-out is skipped and the redirect happens
    /// inline.
    pub fn trigger_unauthorized(&self) {
        if !self.begin() {
            return;
        }

        match Handle::try_current() {
            Ok(handle) => {
                let this = self.clone();
                handle.spawn(async move { this.finish().await });
            }
            Err(_) => {
                warn!("no async runtime, skipping federated sign-out");
                self.redirect_unless_public();
                self.inner.in_progress.store(false, Ordering::Release);
            }
        }
    }

    /// Take the guard and clear the store. `false` if a logout is running.
    fn begin(&self) -> bool {
        if self
            .inner
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("logout already in progress, skipping");
            return false;
        }

        info!("session expired, logging out");
        if let Err(err) = self.inner.store.clear() {
            warn!(error = %err, "failed to clear stored session");
        }
        true
    }

    async fn finish(&self) {
        self.sign_out_federated().await;
        self.redirect_unless_public();
        self.release_after_cooldown();
    }

    fn redirect_unless_public(&self) {
        let current = self.inner.navigator.current_path();
        if is_public_path(&current, &self.inner.public_paths) {
            debug!(path = %current, "already on a public page, not redirecting");
        } else {
            self.inner.navigator.redirect(&self.inner.login_path);
        }
    }

    /// Absorb near-simultaneous 401s before allowing another logout
    fn release_after_cooldown(&self) {
        let inner = Arc::clone(&self.inner);
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(inner.cooldown).await;
                    inner.in_progress.store(false, Ordering::Release);
                });
            }
            Err(_) => inner.in_progress.store(false, Ordering::Release),
        }
    }

    async fn sign_out_federated(&self) {
        match self.inner.identity.current_session().await {
            Ok(Some(session)) => {
                if let Err(err) = self.inner.identity.sign_out().await {
                    warn!(provider = %session.provider, error = %err, "federated sign-out failed");
                }
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "could not read federated session"),
        }
    }
}
