//! Platform-specific state directory management

use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Where the CLI keeps its session, configuration and log file
pub struct StateDir {
    root: PathBuf,
}

impl StateDir {
    /// Platform data directory, or `./.careops` when it cannot be determined
    pub fn new() -> Self {
        let root = ProjectDirs::from("app", "CareOps", "careops").map_or_else(
            || {
                warn!("Failed to determine platform-specific directories, will use fallback");
                PathBuf::from(".careops")
            },
            |dirs| dirs.data_dir().to_path_buf(),
        );
        Self { root }
    }

    /// Use `path` instead of the platform directory
    pub fn with_override(path: impl Into<PathBuf>) -> Self {
        Self { root: path.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn session_file(&self) -> PathBuf {
        self.root.join("session.json")
    }

    pub fn log_file(&self) -> PathBuf {
        self.root.join("cli.log")
    }
}

impl Default for StateDir {
    fn default() -> Self {
        Self::new()
    }
}
