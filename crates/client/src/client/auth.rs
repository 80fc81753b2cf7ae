//! Authentication API client methods

use super::{CareOpsClient, RequestOptions};
use crate::error::ClientError;
use crate::session::{ApiEnvelope, LoginRequest, RegisterRequest, Session, UserProfile};
use reqwest::Method;
use serde_json::{Value, json};
use tracing::{info, warn};

impl CareOpsClient {
    /// Sign in with email and password and store the issued session
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let envelope: ApiEnvelope<Session> = self
            .post_public("/auth/login", &LoginRequest { email, password })
            .await?;
        let session = session_from(envelope, "login")?;

        self.store.save_session(&session)?;
        info!(user_id = %session.user.id, "logged in");
        Ok(session)
    }

    /// Create an account and store the issued session
    pub async fn register(&self, request: &RegisterRequest) -> Result<Session, ClientError> {
        let envelope: ApiEnvelope<Session> = self.post_public("/auth/register", request).await?;
        let session = session_from(envelope, "register")?;

        self.store.save_session(&session)?;
        info!(user_id = %session.user.id, "registered");
        Ok(session)
    }

    /// Fetch the signed-in user's profile and update the cached copy
    pub async fn me(&self) -> Result<UserProfile, ClientError> {
        let envelope: ApiEnvelope<UserProfile> = self.get("/auth/me").await?;
        let user = envelope
            .into_data()
            .ok_or_else(|| ClientError::UnexpectedResponse("missing user profile".into()))?;

        self.store.set_user(&user)?;
        Ok(user)
    }

    /// Cached profile, without a network call
    pub fn current_user(&self) -> Result<Option<UserProfile>, ClientError> {
        Ok(self.store.user()?)
    }

    /// Whether an access token is stored
    pub fn is_authenticated(&self) -> Result<bool, ClientError> {
        Ok(self.store.is_authenticated()?)
    }

    /// User-initiated sign-out.
    ///
    /// Tells the server to revoke the refresh token, then clears the local
    /// session whatever the server said.
    pub async fn logout(&self) -> Result<(), ClientError> {
        if let Some(refresh_token) = self.store.refresh_token()? {
            let options = RequestOptions::new().json(json!({ "refreshToken": refresh_token }));
            if let Err(err) = self
                .request::<Value>(Method::POST, "/auth/logout", options)
                .await
            {
                warn!(error = %err, "server-side logout failed, clearing local session anyway");
            }
        }

        self.store.clear()?;
        info!("logged out");
        Ok(())
    }
}

fn session_from(envelope: ApiEnvelope<Session>, action: &str) -> Result<Session, ClientError> {
    let message = envelope.message.clone();
    envelope.into_data().ok_or_else(|| {
        ClientError::UnexpectedResponse(
            message.unwrap_or_else(|| format!("{action} response did not include a session")),
        )
    })
}
