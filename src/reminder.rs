//! Background reminder loop.
//!
//! Every tick the loop takes a registry snapshot and, for each session,
//! sends a reminder to every user who has not voted, has not been
//! reminded, and whose ballot row is older than the staleness threshold.
//! Each reminder is marked immediately after dispatch so a user is
//! reminded at most once.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::notify::{NotifyJob, NotifyKind, NotifyPool};
use crate::registry::SessionRegistry;
use crate::store::VoteStore;

pub struct ReminderLoop {
    store: Arc<dyn VoteStore>,
    registry: Arc<SessionRegistry>,
    notifier: NotifyPool,
    interval: Duration,
    min_age_secs: i64,
}

impl ReminderLoop {
    pub fn new(
        store: Arc<dyn VoteStore>,
        registry: Arc<SessionRegistry>,
        notifier: NotifyPool,
        interval: Duration,
        min_age_secs: i64,
    ) -> Self {
        Self {
            store,
            registry,
            notifier,
            interval,
            min_age_secs,
        }
    }

    /// Run until `shutdown` observes a true value or its sender drops.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval = ?self.interval, min_age_secs = self.min_age_secs, "reminder loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => self.scan_once().await,
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("reminder loop stopped");
    }

    /// One full pass over a registry snapshot.
    pub async fn scan_once(&self) {
        for id in self.registry.snapshot() {
            let users = match self.store.scan_unvoted_unreminded(&id, self.min_age_secs).await {
                Ok(users) => users,
                Err(e) => {
                    error!(vote_id = %id, "reminder scan failed: {e}");
                    continue;
                }
            };

            debug!(vote_id = %id, due = users.len(), "reminder scan");
            for user in users {
                self.notifier.enqueue(NotifyJob {
                    recipient: user.clone(),
                    vote_id: id.clone(),
                    kind: NotifyKind::Reminder,
                });
                if let Err(e) = self.store.mark_reminded(&id, &user).await {
                    error!(vote_id = %id, user = %user, "failed to mark reminder: {e}");
                }
            }
        }
    }
}
