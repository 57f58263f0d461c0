//! Shared test harness: in-memory store plus a recording mail transport.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use minivote::manager::VoteManager;
use minivote::notify::{Mailer, NotifyJob, NotifyPool};
use minivote::registry::SessionRegistry;
use minivote::store::MemStore;

/// Mailer that records every job and wakes waiters, so tests can await
/// fire-and-forget deliveries.
pub struct RecordingMailer {
    sent: Mutex<Vec<NotifyJob>>,
    notify: tokio::sync::Notify,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            notify: tokio::sync::Notify::new(),
        })
    }

    pub fn sent(&self) -> Vec<NotifyJob> {
        self.sent.lock().unwrap().clone()
    }

    pub async fn wait_for(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let notified = self.notify.notified();
                if self.sent.lock().unwrap().len() >= count {
                    return;
                }
                notified.await;
            }
        })
        .await
        .expect("timed out waiting for notifications");
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, job: &NotifyJob) -> minivote::Result<()> {
        self.sent.lock().unwrap().push(job.clone());
        self.notify.notify_waiters();
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<MemStore>,
    pub registry: Arc<SessionRegistry>,
    pub mailer: Arc<RecordingMailer>,
    pub notifier: NotifyPool,
    pub manager: Arc<VoteManager>,
}

/// Must run inside a tokio runtime; the notify pool spawns its
/// dispatcher task.
pub fn harness() -> Harness {
    let store = Arc::new(MemStore::new());
    let registry = Arc::new(SessionRegistry::new());
    let mailer = RecordingMailer::new();
    let notifier = NotifyPool::new(mailer.clone(), 4, 64, Duration::from_secs(1));
    let manager = Arc::new(VoteManager::new(
        store.clone(),
        registry.clone(),
        notifier.clone(),
    ));
    Harness {
        store,
        registry,
        mailer,
        notifier,
        manager,
    }
}
