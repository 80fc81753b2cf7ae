//! Client configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! file, then `CAREOPS_*` environment variables.

use crate::ClientError;
use crate::logout::DEFAULT_LOGOUT_COOLDOWN;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Connection and session settings for [`crate::CareOpsClient`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API base URL, e.g. `https://api.careops.app/api`
    pub base_url: String,

    /// Request timeout in seconds (unset = no timeout)
    pub timeout_secs: Option<u64>,

    /// User agent sent with every request
    pub user_agent: String,

    /// Refresh endpoint, relative to `base_url`
    pub refresh_path: String,

    /// Page the user is sent to after an unrecoverable auth failure
    pub login_path: String,

    /// Path prefixes that do not require a session
    pub public_paths: Vec<String>,

    /// How long a finished logout suppresses further logouts
    pub logout_cooldown_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            timeout_secs: None,
            user_agent: format!("careops-client/{}", env!("CARGO_PKG_VERSION")),
            refresh_path: "/auth/refresh".to_string(),
            login_path: "/login".to_string(),
            public_paths: vec![
                "/login".to_string(),
                "/register".to_string(),
                "/book".to_string(),
                "/form".to_string(),
            ],
            logout_cooldown_ms: u64::try_from(DEFAULT_LOGOUT_COOLDOWN.as_millis())
                .unwrap_or(1_000),
        }
    }
}

impl ClientConfig {
    /// Load configuration from file, with environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ClientError> {
        Self::load(Some(path.as_ref()))
    }

    /// Load configuration with defaults and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables cannot be parsed
    pub fn from_env() -> Result<Self, ClientError> {
        Self::load(None)
    }

    /// Defaults, then `file` (if any), then `CAREOPS_*` variables
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or the result does not
    /// deserialize
    pub fn load(file: Option<&Path>) -> Result<Self, ClientError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("CAREOPS")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("public_paths"),
            )
            .build()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| ClientError::Configuration(e.to_string()))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub const fn logout_cooldown(&self) -> Duration {
        Duration::from_millis(self.logout_cooldown_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_backend_routes() {
        let config = ClientConfig::default();
        assert_eq!(config.refresh_path, "/auth/refresh");
        assert_eq!(config.login_path, "/login");
        assert_eq!(config.logout_cooldown(), Duration::from_secs(1));
        assert!(config.timeout().is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("client.json");
        std::fs::write(
            &path,
            r#"{ "base_url": "https://api.careops.test", "timeout_secs": 15 }"#,
        )
        .unwrap();

        let config = ClientConfig::from_file(&path).unwrap();
        assert_eq!(config.base_url, "https://api.careops.test");
        assert_eq!(config.timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.login_path, "/login");
    }

    #[test]
    fn unreadable_file_is_a_configuration_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("client.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            ClientConfig::from_file(&path),
            Err(ClientError::Configuration(_))
        ));
    }
}
