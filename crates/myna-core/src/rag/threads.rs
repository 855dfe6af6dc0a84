//! Session to conversation-thread mapping

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory map from session id to server-side thread id
#[derive(Debug, Default)]
pub struct ThreadRegistry {
    threads: RwLock<HashMap<String, String>>,
}

impl ThreadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Every update is a single map call, so a poisoned map is still consistent
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.threads.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.threads.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, session_id: &str) -> Option<String> {
        self.read().get(session_id).cloned()
    }

    pub fn insert(&self, session_id: &str, thread_id: String) {
        self.write().insert(session_id.to_string(), thread_id);
    }

    pub fn remove(&self, session_id: &str) -> Option<String> {
        self.write().remove(session_id)
    }

    /// Remove and return every mapping
    pub fn drain(&self) -> Vec<(String, String)> {
        self.write().drain().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
