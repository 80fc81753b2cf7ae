//! CLI commands

use crate::config;
use crate::state_dir::StateDir;
use crate::terminal::TerminalNavigator;
use anyhow::{Context, Result};
use careops_client::{CareOpsClient, FileStore, RequestOptions};
use clap::Subcommand;
use reqwest::Method;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session
    Login {
        /// Account email
        #[arg(long)]
        email: String,

        /// Account password
        #[arg(long, env = "CAREOPS_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami {
        /// Print the cached profile without contacting the server
        #[arg(long)]
        cached: bool,
    },

    /// Send a request to the API and print the JSON response
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        method: String,

        /// Path relative to the API base URL, e.g. /workspaces
        path: String,

        /// JSON request body
        #[arg(long)]
        data: Option<String>,

        /// Do not send the stored access token
        #[arg(long)]
        public: bool,
    },

    /// Configuration helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a default configuration file
    Generate {
        /// Output file path (defaults to <state-dir>/config.json)
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

/// A client wired to the state directory
struct CliSession {
    client: CareOpsClient,
    navigator: Arc<TerminalNavigator>,
}

impl CliSession {
    fn open(state: &StateDir, config_file: Option<&PathBuf>) -> Result<Self> {
        let config =
            config::load_client_config(config_file.map(PathBuf::as_path), &state.config_file())?;
        let session_file = state.session_file();
        let store = FileStore::open(&session_file).with_context(|| {
            format!("failed to open session file {}", session_file.display())
        })?;
        let navigator = Arc::new(TerminalNavigator::new());

        let client = CareOpsClient::builder()
            .config(config)
            .token_store(Arc::new(store))
            .navigator(navigator.clone())
            .build()?;

        Ok(Self { client, navigator })
    }

    /// Add a login hint to errors that ended the session
    fn explain(&self, err: careops_client::ClientError) -> anyhow::Error {
        if self.navigator.login_required() {
            anyhow::Error::new(err).context("signed out; run `careops login` to continue")
        } else {
            err.into()
        }
    }
}

impl Commands {
    pub async fn execute(self, state: &StateDir, config_file: Option<PathBuf>) -> Result<()> {
        match self {
            Self::Config { command } => command.execute(state, config_file.as_ref()),
            Self::Login { email, password } => {
                let session = CliSession::open(state, config_file.as_ref())?;
                let issued = session.client.login(&email, &password).await?;
                println!(
                    "Logged in as {} <{}>",
                    issued.user.display_name(),
                    issued.user.email
                );
                Ok(())
            }
            Self::Logout => {
                let session = CliSession::open(state, config_file.as_ref())?;
                if !session.client.is_authenticated()? {
                    println!("Not logged in");
                    return Ok(());
                }
                session.client.logout().await?;
                println!("Logged out");
                Ok(())
            }
            Self::Whoami { cached } => {
                let session = CliSession::open(state, config_file.as_ref())?;
                let user = if cached {
                    session.client.current_user()?
                } else if session.client.is_authenticated()? {
                    Some(session.client.me().await.map_err(|e| session.explain(e))?)
                } else {
                    None
                };

                match user {
                    Some(user) => println!(
                        "{} <{}> ({})",
                        user.display_name(),
                        user.email,
                        user.role
                    ),
                    None => println!("Not logged in"),
                }
                Ok(())
            }
            Self::Request {
                method,
                path,
                data,
                public,
            } => {
                let session = CliSession::open(state, config_file.as_ref())?;
                let method = Method::from_bytes(method.to_uppercase().as_bytes())
                    .with_context(|| format!("invalid HTTP method {method:?}"))?;

                let mut options = RequestOptions::new().skip_auth(public);
                if let Some(data) = data {
                    let body: Value =
                        serde_json::from_str(&data).context("--data must be valid JSON")?;
                    options = options.json(body);
                }

                info!(%method, path, "sending request");
                let response: Value = session
                    .client
                    .request(method, &path, options)
                    .await
                    .map_err(|e| session.explain(e))?;
                println!("{}", serde_json::to_string_pretty(&response)?);
                Ok(())
            }
        }
    }
}

impl ConfigCommands {
    pub fn execute(self, state: &StateDir, config_file: Option<&PathBuf>) -> Result<()> {
        match self {
            Self::Generate { output, force } => {
                let config_path = output.unwrap_or_else(|| state.config_file());
                anyhow::ensure!(
                    force || !config_path.exists(),
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                );

                // Create parent directory if it doesn't exist
                if let Some(parent) = config_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }

                config::generate_default_config(&config_path)?;
                println!("Generated configuration at: {}", config_path.display());
                Ok(())
            }
            Self::Show => {
                let config = config::load_client_config(
                    config_file.map(PathBuf::as_path),
                    &state.config_file(),
                )?;
                println!("{}", serde_json::to_string_pretty(&config)?);
                Ok(())
            }
        }
    }
}
