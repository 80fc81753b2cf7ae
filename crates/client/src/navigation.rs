//! Navigation target used by the logout sequence

use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Where the user currently is, and how to send them elsewhere
pub trait Navigator: Send + Sync {
    /// Path of the page the user is on, query string included
    fn current_path(&self) -> String;

    /// Send the user to `path`
    fn redirect(&self, path: &str);
}

/// Navigator that tracks the path in memory and records every redirect
#[derive(Debug)]
pub struct MemoryNavigator {
    state: Mutex<NavigationState>,
}

#[derive(Debug, Default)]
struct NavigationState {
    current: String,
    redirects: Vec<String>,
}

impl MemoryNavigator {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(NavigationState {
                current: path.into(),
                redirects: Vec::new(),
            }),
        }
    }

    /// Move to `path` without counting it as a redirect
    pub fn visit(&self, path: impl Into<String>) {
        self.state().current = path.into();
    }

    /// Redirects issued so far, oldest first
    pub fn redirects(&self) -> Vec<String> {
        self.state().redirects.clone()
    }

    fn state(&self) -> MutexGuard<'_, NavigationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.state().current.clone()
    }

    fn redirect(&self, path: &str) {
        debug!(to = path, "redirecting");
        let mut state = self.state();
        state.current = path.to_string();
        state.redirects.push(path.to_string());
    }
}

/// Whether `path` is reachable without a session.
///
/// A prefix matches the path itself and anything below it, so `/book`
/// matches `/book` and `/book/clinic-a` but not `/bookings`. The prefix `/`
/// matches the root page only.
pub fn is_public_path(path: &str, prefixes: &[String]) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    prefixes.iter().any(|prefix| {
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            // "/" only covers the root page
            return path.is_empty() || path == "/";
        }
        path == prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}
