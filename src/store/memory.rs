//! In-memory store (default for tests and local development).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::common::Result;
use crate::store::{Ballot, VoteStore};

#[derive(Debug, Clone)]
struct SessionMeta {
    options: Vec<String>,
}

/// Mutex-held maps standing in for the `sessions` and `ballots` tables.
/// Ballots are kept as a `Vec` per session to preserve provisioning
/// order; eligible-user lists are small enough that linear lookup is
/// fine.
#[derive(Default)]
pub struct MemStore {
    sessions: Mutex<HashMap<String, SessionMeta>>,
    ballots: Mutex<HashMap<String, Vec<Ballot>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VoteStore for MemStore {
    async fn provision(&self, id: &str, options: &[String], users: &[String]) -> Result<()> {
        let now = Utc::now();
        let rows = users
            .iter()
            .map(|user| Ballot {
                user: user.clone(),
                choice: None,
                reminder_sent: false,
                created_at: now,
            })
            .collect();

        self.sessions.lock().unwrap().insert(
            id.to_string(),
            SessionMeta {
                options: options.to_vec(),
            },
        );
        self.ballots.lock().unwrap().insert(id.to_string(), rows);
        Ok(())
    }

    async fn session_exists(&self, id: &str) -> Result<bool> {
        Ok(self.sessions.lock().unwrap().contains_key(id))
    }

    async fn options_of(&self, id: &str) -> Result<Option<Vec<String>>> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(id)
            .map(|meta| meta.options.clone()))
    }

    async fn list_sessions(&self) -> Result<Vec<String>> {
        Ok(self.sessions.lock().unwrap().keys().cloned().collect())
    }

    async fn fetch_ballot(&self, id: &str, user: &str) -> Result<Option<Ballot>> {
        Ok(self
            .ballots
            .lock()
            .unwrap()
            .get(id)
            .and_then(|rows| rows.iter().find(|b| b.user == user).cloned()))
    }

    async fn set_choice_if_absent(&self, id: &str, user: &str, option: &str) -> Result<bool> {
        // Check and write under one lock hold, the in-memory equivalent
        // of the SQL `WHERE choice IS NULL` guard.
        let mut ballots = self.ballots.lock().unwrap();
        let row = ballots
            .get_mut(id)
            .and_then(|rows| rows.iter_mut().find(|b| b.user == user));
        match row {
            Some(b) if b.choice.is_none() => {
                b.choice = Some(option.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn scan_unvoted_unreminded(&self, id: &str, min_age_secs: i64) -> Result<Vec<String>> {
        let now = Utc::now();
        Ok(self
            .ballots
            .lock()
            .unwrap()
            .get(id)
            .map(|rows| {
                rows.iter()
                    .filter(|b| {
                        b.choice.is_none()
                            && !b.reminder_sent
                            && (now - b.created_at).num_seconds() >= min_age_secs
                    })
                    .map(|b| b.user.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn mark_reminded(&self, id: &str, user: &str) -> Result<()> {
        if let Some(rows) = self.ballots.lock().unwrap().get_mut(id) {
            if let Some(b) = rows.iter_mut().find(|b| b.user == user) {
                b.reminder_sent = true;
            }
        }
        Ok(())
    }

    async fn aggregate(&self, id: &str) -> Result<HashMap<String, i64>> {
        let mut counts = HashMap::new();
        if let Some(rows) = self.ballots.lock().unwrap().get(id) {
            for choice in rows.iter().filter_map(|b| b.choice.as_ref()) {
                *counts.entry(choice.clone()).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn drop_ballots(&self, id: &str) -> Result<()> {
        self.ballots.lock().unwrap().remove(id);
        Ok(())
    }

    async fn delete_session(&self, id: &str) -> Result<()> {
        self.sessions.lock().unwrap().remove(id);
        Ok(())
    }

    async fn purge_sessions(&self) -> Result<u64> {
        let mut sessions = self.sessions.lock().unwrap();
        let removed = sessions.len() as u64;
        sessions.clear();
        Ok(removed)
    }
}
