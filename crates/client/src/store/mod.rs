//! Client-side token storage
//!
//! Three string keys hold the session: access token, refresh token and the
//! JSON-serialized user profile. Backends are plain key/value stores; the
//! session semantics live in [`SessionStore`].

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::session::{Session, UserProfile};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Keys persisted by a [`TokenStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreKey {
    AccessToken,
    RefreshToken,
    User,
}

impl StoreKey {
    pub const ALL: [Self; 3] = [Self::AccessToken, Self::RefreshToken, Self::User];

    /// Storage key name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccessToken => "accessToken",
            Self::RefreshToken => "refreshToken",
            Self::User => "user",
        }
    }
}

/// Token store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid stored data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistent key/value storage for session data
pub trait TokenStore: Send + Sync {
    /// Stored value for `key`, or `None` if it was never set
    fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError>;

    /// Insert or overwrite `key`
    fn set(&self, key: StoreKey, value: &str) -> Result<(), StoreError>;

    /// Delete `key`. Removing an absent key succeeds.
    fn remove(&self, key: StoreKey) -> Result<(), StoreError>;
}

/// Typed session access over a [`TokenStore`]
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn TokenStore>,
}

impl SessionStore {
    /// Wrap a storage backend
    pub fn new(backend: Arc<dyn TokenStore>) -> Self {
        Self { backend }
    }

    /// Bearer token sent with authenticated requests
    pub fn access_token(&self) -> Result<Option<String>, StoreError> {
        self.backend.get(StoreKey::AccessToken)
    }

    /// Token exchanged for a new access token on expiry
    pub fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        self.backend.get(StoreKey::RefreshToken)
    }

    /// Cached user profile. A corrupt entry reads as no user.
    pub fn user(&self) -> Result<Option<UserProfile>, StoreError> {
        let Some(raw) = self.backend.get(StoreKey::User)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(err) => {
                warn!(error = %err, "discarding unreadable cached user profile");
                Ok(None)
            }
        }
    }

    /// Cache the user profile as JSON
    pub fn set_user(&self, user: &UserProfile) -> Result<(), StoreError> {
        let raw = serde_json::to_string(user)?;
        self.backend.set(StoreKey::User, &raw)
    }

    /// Store a freshly issued session. Both tokens are replaced together.
    pub fn save_session(&self, session: &Session) -> Result<(), StoreError> {
        self.backend
            .set(StoreKey::AccessToken, &session.access_token)?;
        self.backend
            .set(StoreKey::RefreshToken, &session.refresh_token)?;
        self.set_user(&session.user)
    }

    /// Replace only the access token (refresh path)
    pub fn set_access_token(&self, token: &str) -> Result<(), StoreError> {
        self.backend.set(StoreKey::AccessToken, token)
    }

    /// Remove all session keys, attempting every key even if one fails
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut first_error = None;
        for key in StoreKey::ALL {
            if let Err(err) = self.backend.remove(key) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Whether an access token is stored. Says nothing about its validity.
    pub fn is_authenticated(&self) -> Result<bool, StoreError> {
        Ok(self.access_token()?.is_some())
    }
}
