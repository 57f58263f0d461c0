//! Vote session lifecycle: creation, casting, tallying, teardown.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{error, info};

use crate::common::{Error, Result};
use crate::notify::{NotifyJob, NotifyKind, NotifyPool};
use crate::registry::SessionRegistry;
use crate::store::VoteStore;

/// Result of a cast attempt. A repeat cast is a normal outcome, not an
/// error; the stored choice is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOutcome {
    Recorded,
    AlreadyVoted,
}

pub struct VoteManager {
    store: Arc<dyn VoteStore>,
    registry: Arc<SessionRegistry>,
    notifier: NotifyPool,
}

impl VoteManager {
    pub fn new(
        store: Arc<dyn VoteStore>,
        registry: Arc<SessionRegistry>,
        notifier: NotifyPool,
    ) -> Self {
        Self {
            store,
            registry,
            notifier,
        }
    }

    /// Create a session: dedup the option and user lists, provision one
    /// ballot row per user, register the session, and fan out one
    /// invitation per user. Invitations are fire-and-forget; a failed
    /// send never fails the creation.
    pub async fn create_session(
        &self,
        id: &str,
        options: &[String],
        users: &[String],
    ) -> Result<()> {
        validate_session_id(id)?;

        let options = dedup(options);
        let users = dedup(users);
        if options.is_empty() || users.is_empty() {
            return Err(Error::InvalidInput(
                "options and user_list must be non-empty".to_string(),
            ));
        }

        if self.store.session_exists(id).await? {
            return Err(Error::DuplicateSession(id.to_string()));
        }

        self.store.provision(id, &options, &users).await?;
        self.registry.add(id);
        info!(vote_id = %id, options = options.len(), users = users.len(), "session created");

        for user in &users {
            self.notifier.enqueue(NotifyJob {
                recipient: user.clone(),
                vote_id: id.to_string(),
                kind: NotifyKind::Invitation {
                    options: options.clone(),
                },
            });
        }

        Ok(())
    }

    /// Record a vote at most once per (session, user). The declared
    /// option set is enforced; the original service accepted any string.
    pub async fn cast_vote(&self, id: &str, user: &str, option: &str) -> Result<CastOutcome> {
        let declared = self
            .store
            .options_of(id)
            .await?
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
        if !declared.iter().any(|o| o == option) {
            return Err(Error::UnknownOption {
                session: id.to_string(),
                option: option.to_string(),
            });
        }

        let ballot = self
            .store
            .fetch_ballot(id, user)
            .await?
            .ok_or_else(|| Error::UserNotEligible {
                session: id.to_string(),
                user: user.to_string(),
            })?;
        if ballot.choice.is_some() {
            return Ok(CastOutcome::AlreadyVoted);
        }

        // The conditional write decides races the read above cannot see.
        if self.store.set_choice_if_absent(id, user, option).await? {
            info!(vote_id = %id, user = %user, "vote recorded");
            Ok(CastOutcome::Recorded)
        } else {
            Ok(CastOutcome::AlreadyVoted)
        }
    }

    /// Vote counts per option. Pure read; options without votes are
    /// omitted, not zero-filled.
    pub async fn tally(&self, id: &str) -> Result<HashMap<String, i64>> {
        if !self.store.session_exists(id).await? {
            return Err(Error::SessionNotFound(id.to_string()));
        }
        self.store.aggregate(id).await
    }

    /// Destroy one session: ballots, metadata, registry entry.
    pub async fn close_session(&self, id: &str) -> Result<()> {
        if !self.store.session_exists(id).await? {
            return Err(Error::SessionNotFound(id.to_string()));
        }
        self.store.drop_ballots(id).await?;
        self.store.delete_session(id).await?;
        self.registry.remove_one(id);
        info!(vote_id = %id, "session closed");
        Ok(())
    }

    /// Destroy every session. Ballot drops run concurrently and are
    /// best-effort; returns the number of metadata rows removed.
    pub async fn delete_all(&self) -> Result<u64> {
        let ids = self.registry.snapshot();
        let drops = join_all(ids.iter().map(|id| self.store.drop_ballots(id))).await;
        for (id, result) in ids.iter().zip(drops) {
            if let Err(e) = result {
                error!(vote_id = %id, "failed to drop ballots: {e}");
            }
        }

        let removed = self.store.purge_sessions().await?;
        self.registry.remove_all();
        info!(sessions = removed, "all sessions deleted");
        Ok(removed)
    }
}

/// Stable-order dedup, first occurrence wins.
fn dedup(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .filter(|v| seen.insert(v.as_str()))
        .cloned()
        .collect()
}

fn validate_session_id(id: &str) -> Result<()> {
    let ok = !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidSessionId(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_preserves_first_occurrence_order() {
        let input = vec![
            "b".to_string(),
            "a".to_string(),
            "b".to_string(),
            "c".to_string(),
            "a".to_string(),
        ];
        assert_eq!(dedup(&input), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_session_id_validation() {
        assert!(validate_session_id("admin-2024_v1").is_ok());
        assert!(validate_session_id("").is_err());
        assert!(validate_session_id("drop table; --").is_err());
        assert!(validate_session_id(&"x".repeat(65)).is_err());
    }
}
