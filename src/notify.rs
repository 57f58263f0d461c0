//! Email notifications: composition, transports, and the dispatch pool.
//!
//! Delivery is fire-and-forget. Handlers enqueue a [`NotifyJob`] and move
//! on; the [`NotifyPool`] sends with a bounded queue, a cap on in-flight
//! sends, and a per-send timeout. Transport failures are logged and never
//! reach an HTTP response.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, warn};

use crate::common::{Error, Result};

/// One outbound email.
#[derive(Debug, Clone, PartialEq)]
pub struct NotifyJob {
    pub recipient: String,
    pub vote_id: String,
    pub kind: NotifyKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotifyKind {
    Invitation { options: Vec<String> },
    Reminder,
}

/// Compose subject and body for a job.
pub fn compose(job: &NotifyJob) -> (String, String) {
    match &job.kind {
        NotifyKind::Invitation { options } => (
            "Added to voting system".to_string(),
            format!(
                "You have been added to the voting system with the following details:\n\
                 \n\
                 Vote ID: {id}\n\
                 Options: {options:?}\n\
                 \n\
                 Please cast your vote using the /vote endpoint, for example:\n\
                 curl -X POST http://localhost:4000/vote \
                 -H \"Content-Type: application/json\" \
                 -d '{{\"vote_id\": \"{id}\", \"email\": \"{to}\", \"option\": \"Option1\"}}'\n",
                id = job.vote_id,
                to = job.recipient,
                options = options,
            ),
        ),
        NotifyKind::Reminder => (
            "Reminder to vote".to_string(),
            format!(
                "This is a reminder to vote in the voting system {} that you \
                 have been nominated for.\n\
                 Please follow the instructions sent in the email with subject \
                 \"Added to voting system\".\n",
                job.vote_id,
            ),
        ),
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, job: &NotifyJob) -> Result<()>;
}

/// SMTP transport over STARTTLS (port 587).
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(host: &str, from: &str, password: &str) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| Error::Mail(e.to_string()))?
            .credentials(Credentials::new(from.to_string(), password.to_string()))
            .build();
        let from = from
            .parse()
            .map_err(|e| Error::InvalidConfig(format!("bad SMTP_FROM address: {e}")))?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, job: &NotifyJob) -> Result<()> {
        let (subject, body) = compose(job);
        let to = job
            .recipient
            .parse()
            .map_err(|e| Error::Mail(format!("bad recipient {:?}: {e}", job.recipient)))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .body(body)
            .map_err(|e| Error::Mail(e.to_string()))?;
        self.transport
            .send(message)
            .await
            .map_err(|e| Error::Mail(e.to_string()))?;
        Ok(())
    }
}

/// Log-only transport, used when no SMTP credentials are configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, job: &NotifyJob) -> Result<()> {
        let (subject, _) = compose(job);
        info!(recipient = %job.recipient, vote_id = %job.vote_id, %subject, "mail (log-only)");
        Ok(())
    }
}

/// Bounded fire-and-forget dispatcher in front of a [`Mailer`].
#[derive(Clone)]
pub struct NotifyPool {
    tx: mpsc::Sender<NotifyJob>,
}

impl NotifyPool {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        workers: usize,
        queue: usize,
        timeout: Duration,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<NotifyJob>(queue);
        let limiter = Arc::new(Semaphore::new(workers));

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let permit = match limiter.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                let mailer = mailer.clone();
                tokio::spawn(async move {
                    match tokio::time::timeout(timeout, mailer.send(&job)).await {
                        Ok(Ok(())) => {
                            info!(recipient = %job.recipient, vote_id = %job.vote_id, "notification sent");
                        }
                        Ok(Err(e)) => {
                            error!(recipient = %job.recipient, vote_id = %job.vote_id, "notification failed: {e}");
                        }
                        Err(_) => {
                            error!(recipient = %job.recipient, vote_id = %job.vote_id, "notification timed out");
                        }
                    }
                    drop(permit);
                });
            }
        });

        Self { tx }
    }

    /// Hand a job to the pool without blocking. Jobs are dropped with a
    /// warning when the queue is full.
    pub fn enqueue(&self, job: NotifyJob) {
        if let Err(e) = self.tx.try_send(job) {
            warn!("dropping notification: {e}");
        }
    }
}
