//! In-memory token store

use super::{StoreError, StoreKey, TokenStore};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Token store that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<StoreKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<StoreKey, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenStore for MemoryStore {
    fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError> {
        Ok(self.entries().get(&key).cloned())
    }

    fn set(&self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        self.entries().insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: StoreKey) -> Result<(), StoreError> {
        self.entries().remove(&key);
        Ok(())
    }
}
