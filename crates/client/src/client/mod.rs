//! CareOps HTTP client
//!
//! Every request goes through [`CareOpsClient::request`]: attach the stored
//! bearer token, send, and on a 401 that names a token problem refresh once
//! and retry once. An unrecoverable 401 logs the user out.

pub mod auth;

use crate::config::ClientConfig;
use crate::error::{ClientError, error_message, is_auth_error};
use crate::identity::{IdentityProvider, NoFederatedIdentity};
use crate::logout::LogoutSequence;
use crate::navigation::{MemoryNavigator, Navigator};
use crate::refresh::RefreshCoordinator;
use crate::store::{MemoryStore, SessionStore, TokenStore};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-request options
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    body: Option<Value>,
    headers: HeaderMap,
    skip_auth: bool,
}

impl RequestOptions {
    /// Authenticated request with no body and no extra headers
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for endpoints that must not see the access token
    pub fn public() -> Self {
        Self {
            skip_auth: true,
            ..Self::default()
        }
    }

    /// Send `body` as JSON
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add an extra header
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Never attach the bearer token, never refresh or log out
    pub fn skip_auth(mut self, skip: bool) -> Self {
        self.skip_auth = skip;
        self
    }
}

/// Result of a single HTTP exchange
enum Attempt {
    Success(Value),
    Failure { status: StatusCode, body: Value },
}

/// CareOps API client
#[derive(Clone)]
pub struct CareOpsClient {
    http: Client,
    base_url: String,
    store: SessionStore,
    refresher: RefreshCoordinator,
    logout: LogoutSequence,
}

impl CareOpsClient {
    /// Create a new client with default configuration
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> CareOpsClientBuilder {
        CareOpsClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stored session data
    pub const fn session_store(&self) -> &SessionStore {
        &self.store
    }

    /// Coordinator shared by every request on this client
    pub const fn refresher(&self) -> &RefreshCoordinator {
        &self.refresher
    }

    /// Sequence run when the session cannot be recovered
    pub const fn logout_sequence(&self) -> &LogoutSequence {
        &self.logout
    }

    /// Send a request and decode the JSON response into `T`.
    ///
    /// A 401 whose message points at the token triggers one shared refresh
    /// and one retry with the new token. If the refresh fails the stored
    /// session is cleared, the rest of the logout runs in the background and
    /// [`ClientError::SessionExpired`] is returned right away.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        let token = if options.skip_auth {
            None
        } else {
            self.store.access_token()?
        };

        let (status, body) = match self.send(&method, path, &options, token.as_deref()).await? {
            Attempt::Success(body) => return decode(body),
            Attempt::Failure { status, body } => (status, body),
        };

        if status == StatusCode::UNAUTHORIZED
            && !options.skip_auth
            && is_auth_error(&error_message(status, &body))
        {
            return self.retry_after_refresh(&method, path, &options).await;
        }

        Err(ClientError::from_response(status, &body))
    }

    /// Second and final phase of [`Self::request`]
    async fn retry_after_refresh<T: DeserializeOwned>(
        &self,
        method: &Method,
        path: &str,
        options: &RequestOptions,
    ) -> Result<T, ClientError> {
        let Some(token) = self.refresher.refresh().await else {
            self.logout.trigger_unauthorized();
            return Err(ClientError::SessionExpired);
        };

        debug!(%method, path, "retrying with refreshed token");
        match self.send(method, path, options, Some(&token)).await? {
            Attempt::Success(body) => decode(body),
            Attempt::Failure { status, body } => Err(ClientError::from_response(status, &body)),
        }
    }

    async fn send(
        &self,
        method: &Method,
        path: &str,
        options: &RequestOptions,
        token: Option<&str>,
    ) -> Result<Attempt, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http
            .request(method.clone(), url)
            .headers(options.headers.clone());

        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let body = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::Object(Map::new()));

        debug!(%method, path, status = status.as_u16(), "api response");
        if status.is_success() {
            Ok(Attempt::Success(body))
        } else {
            if status.is_server_error() {
                warn!(%method, path, status = status.as_u16(), "server error");
            }
            Ok(Attempt::Failure { status, body })
        }
    }

    /// GET with authentication
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.request(Method::GET, path, RequestOptions::new()).await
    }

    /// POST a JSON body with authentication
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let options = RequestOptions::new().json(serde_json::to_value(body)?);
        self.request(Method::POST, path, options).await
    }

    /// PUT a JSON body with authentication
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let options = RequestOptions::new().json(serde_json::to_value(body)?);
        self.request(Method::PUT, path, options).await
    }

    /// PATCH a JSON body with authentication
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let options = RequestOptions::new().json(serde_json::to_value(body)?);
        self.request(Method::PATCH, path, options).await
    }

    /// DELETE with authentication
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.request(Method::DELETE, path, RequestOptions::new())
            .await
    }

    /// GET a public endpoint (booking pages, forms)
    pub async fn get_public<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.request(Method::GET, path, RequestOptions::public())
            .await
    }

    /// POST to a public endpoint
    pub async fn post_public<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let options = RequestOptions::public().json(serde_json::to_value(body)?);
        self.request(Method::POST, path, options).await
    }
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, ClientError> {
    Ok(serde_json::from_value(body)?)
}

/// Builder for CareOpsClient
#[derive(Default)]
pub struct CareOpsClientBuilder {
    config: ClientConfig,
    base_url: Option<String>,
    store: Option<Arc<dyn TokenStore>>,
    identity: Option<Arc<dyn IdentityProvider>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl CareOpsClientBuilder {
    /// Start from a loaded configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_secs = Some(timeout.as_secs());
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Set where the session is persisted (defaults to memory)
    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the federated identity provider signed out on logout
    pub fn identity_provider(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Set the navigator used for the login redirect
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Set the cooldown between logouts
    pub fn logout_cooldown(mut self, cooldown: Duration) -> Self {
        self.config.logout_cooldown_ms = u64::try_from(cooldown.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<CareOpsClient, ClientError> {
        let config = self.config;
        let base_url = self.base_url.unwrap_or_else(|| config.base_url.clone());
        url::Url::parse(&base_url)
            .map_err(|e| ClientError::Configuration(format!("invalid base_url {base_url:?}: {e}")))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut client_builder = ClientBuilder::new()
            .cookie_store(true)
            .user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout() {
            client_builder = client_builder.timeout(timeout);
        }
        let http = client_builder.build()?;

        let backend: Arc<dyn TokenStore> = match self.store {
            Some(store) => store,
            None => Arc::new(MemoryStore::new()),
        };
        let identity: Arc<dyn IdentityProvider> = match self.identity {
            Some(identity) => identity,
            None => Arc::new(NoFederatedIdentity),
        };
        let navigator: Arc<dyn Navigator> = match self.navigator {
            Some(navigator) => navigator,
            None => Arc::new(MemoryNavigator::default()),
        };

        let store = SessionStore::new(backend);
        let refresher = RefreshCoordinator::new(
            http.clone(),
            format!("{base_url}{}", config.refresh_path),
            store.clone(),
        );
        let logout = LogoutSequence::new(
            store.clone(),
            identity,
            navigator,
            config.login_path.clone(),
            config.public_paths.clone(),
            config.logout_cooldown(),
        );

        Ok(CareOpsClient {
            http,
            base_url,
            store,
            refresher,
            logout,
        })
    }
}
