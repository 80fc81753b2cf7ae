//! CareOps API client
//!
//! Session-aware HTTP client for the CareOps backend. Requests carry the
//! stored access token; an expired token is refreshed once (shared by all
//! concurrent callers) and the request retried. When the refresh fails the
//! session is cleared and the user is sent back to the login page.

pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod logout;
pub mod navigation;
pub mod refresh;
pub mod session;
pub mod store;

pub use client::{CareOpsClient, CareOpsClientBuilder, RequestOptions};
pub use config::ClientConfig;
pub use error::{ClientError, SESSION_EXPIRED_MESSAGE};
pub use identity::{FederatedSession, IdentityError, IdentityProvider, NoFederatedIdentity};
pub use logout::LogoutSequence;
pub use navigation::{MemoryNavigator, Navigator};
pub use refresh::RefreshCoordinator;
pub use session::{RegisterRequest, Session, UserProfile};
pub use store::{FileStore, MemoryStore, SessionStore, StoreError, StoreKey, TokenStore};
