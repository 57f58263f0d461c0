//! Process-wide registry of active vote sessions.
//!
//! Shared between the HTTP handlers and the reminder loop. The inner
//! collection is never exposed; iteration always goes through
//! [`SessionRegistry::snapshot`] so concurrent mutation cannot corrupt a
//! caller's pass over the sessions. Deduplication is the manager's job at
//! creation time, not this layer's.

use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<Vec<String>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, id: &str) {
        self.sessions.lock().unwrap().push(id.to_string());
    }

    pub fn remove_one(&self, id: &str) {
        self.sessions.lock().unwrap().retain(|s| s != id);
    }

    pub fn remove_all(&self) {
        self.sessions.lock().unwrap().clear();
    }

    /// Read-consistent copy of the registered session ids, in
    /// registration order.
    pub fn snapshot(&self) -> Vec<String> {
        self.sessions.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
