//! CLI configuration utilities

use anyhow::{Context, Result};
use careops_client::ClientConfig;
use std::path::Path;
use tracing::info;

/// Resolve the client configuration.
///
/// An explicit file must exist. Without one, `<state-dir>/config.json` is
/// used when present. Environment variables apply on top either way.
pub fn load_client_config(explicit: Option<&Path>, default_file: &Path) -> Result<ClientConfig> {
    let file = match explicit {
        Some(path) => {
            anyhow::ensure!(path.exists(), "config file {} not found", path.display());
            Some(path)
        }
        None => default_file.exists().then_some(default_file),
    };

    if let Some(path) = file {
        info!("Loading configuration from: {}", path.display());
    }
    ClientConfig::load(file).context("failed to load client configuration")
}

/// Save client configuration to a JSON file
pub fn save_client_config<P: AsRef<Path>>(config: &ClientConfig, path: P) -> Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Generate a default configuration file
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    save_client_config(&ClientConfig::default(), path)
}
