//! Navigator for a terminal session

use careops_client::Navigator;
use std::sync::Mutex;
use tracing::warn;

/// There are no pages in a terminal; a redirect to the login page becomes a
/// hint to run `careops login`.
#[derive(Debug, Default)]
pub struct TerminalNavigator {
    redirected_to: Mutex<Option<String>>,
}

impl TerminalNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the client asked to send the user to the login page
    pub fn login_required(&self) -> bool {
        self.redirected_to
            .lock()
            .map(|path| path.is_some())
            .unwrap_or(false)
    }
}

impl Navigator for TerminalNavigator {
    fn current_path(&self) -> String {
        "/cli".to_string()
    }

    fn redirect(&self, path: &str) {
        warn!(to = path, "session ended, sign in again with `careops login`");
        if let Ok(mut redirected) = self.redirected_to.lock() {
            *redirected = Some(path.to_string());
        }
    }
}
