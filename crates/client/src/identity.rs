//! Federated identity provider boundary
//!
//! Social sign-in and similar providers keep their own session underneath
//! ours. The client only needs to look it up and end it during logout.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Session held by an external identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedSession {
    pub provider: String,
    pub subject: Option<String>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("Sign-out failed: {0}")]
    SignOut(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_session(&self) -> Result<Option<FederatedSession>, IdentityError>;
    async fn sign_out(&self) -> Result<(), IdentityError>;
}

/// Provider used when no federated sign-in is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFederatedIdentity;

#[async_trait]
impl IdentityProvider for NoFederatedIdentity {
    async fn current_session(&self) -> Result<Option<FederatedSession>, IdentityError> {
        Ok(None)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        Ok(())
    }
}
