//! Ballot and session storage abstraction.
//!
//! Two backends implement [`VoteStore`]: [`MemStore`] keeps everything in
//! mutex-held maps and is the default for tests and local development;
//! [`MySqlStore`] persists to MySQL through an sqlx pool.
//!
//! The schema is two tables: `sessions` holds one metadata row per vote
//! session, `ballots` holds one row per (session, user) pair under a
//! composite primary key. A ballot's `choice` stays NULL until the user
//! casts; `set_choice_if_absent` is the only write path for it and is a
//! single conditional update, so a choice can never be overwritten.

mod memory;
mod mysql;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::common::Result;

pub use memory::MemStore;
pub use mysql::MySqlStore;

/// One user's voting record within a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Ballot {
    pub user: String,
    /// `None` until the user casts; never overwritten once set.
    pub choice: Option<String>,
    /// Monotonic false→true, flipped by `mark_reminded`.
    pub reminder_sent: bool,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Persist session metadata and one null-choice ballot row per user.
    async fn provision(&self, id: &str, options: &[String], users: &[String]) -> Result<()>;

    async fn session_exists(&self, id: &str) -> Result<bool>;

    /// Declared option labels for a session, `None` if the session is
    /// unknown.
    async fn options_of(&self, id: &str) -> Result<Option<Vec<String>>>;

    /// All known session ids, used to seed the registry at startup.
    async fn list_sessions(&self) -> Result<Vec<String>>;

    async fn fetch_ballot(&self, id: &str, user: &str) -> Result<Option<Ballot>>;

    /// Record `option` for `(id, user)` only if no choice is stored yet.
    /// Returns true iff this call performed the write.
    async fn set_choice_if_absent(&self, id: &str, user: &str, option: &str) -> Result<bool>;

    /// Users with no choice, no reminder sent, and a ballot row older
    /// than `min_age_secs`.
    async fn scan_unvoted_unreminded(&self, id: &str, min_age_secs: i64) -> Result<Vec<String>>;

    async fn mark_reminded(&self, id: &str, user: &str) -> Result<()>;

    /// Vote counts per option. Only cast ballots are visible here, so
    /// options nobody picked are absent rather than zero.
    async fn aggregate(&self, id: &str) -> Result<HashMap<String, i64>>;

    /// Remove every ballot row for a session.
    async fn drop_ballots(&self, id: &str) -> Result<()>;

    /// Remove one session metadata row.
    async fn delete_session(&self, id: &str) -> Result<()>;

    /// Remove all session metadata rows, returning how many were removed.
    async fn purge_sessions(&self) -> Result<u64>;
}
