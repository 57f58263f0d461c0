//! Server wiring: store, mailer, registry, reminder loop, HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::common::{Config, Result};
use crate::http::{create_router, AppState};
use crate::manager::VoteManager;
use crate::notify::{LogMailer, Mailer, NotifyPool, SmtpMailer};
use crate::registry::SessionRegistry;
use crate::reminder::ReminderLoop;
use crate::store::{MySqlStore, VoteStore};

pub struct Server {
    config: Config,
    addr: SocketAddr,
}

impl Server {
    pub fn new(config: Config, addr: SocketAddr) -> Self {
        Self { config, addr }
    }

    pub async fn serve(self) -> Result<()> {
        info!("Starting minivote {}", crate::VERSION);
        info!("  HTTP API: {}", self.addr);
        info!("  Database: {}@{}/{}", self.config.db_user, self.config.db_host, self.config.db_name);

        let store: Arc<dyn VoteStore> =
            Arc::new(MySqlStore::connect(&self.config.database_url()).await?);

        let mailer: Arc<dyn Mailer> = match &self.config.email_password {
            Some(password) => Arc::new(SmtpMailer::new(
                &self.config.smtp_host,
                &self.config.smtp_from,
                password,
            )?),
            None => {
                warn!("EMAIL_PASSWORD not set, notifications will only be logged");
                Arc::new(LogMailer)
            }
        };
        let notifier = NotifyPool::new(
            mailer,
            self.config.notify_workers,
            self.config.notify_queue,
            self.config.mail_timeout,
        );

        // Sessions created by previous runs keep getting reminders.
        let registry = Arc::new(SessionRegistry::new());
        let existing = store.list_sessions().await?;
        if !existing.is_empty() {
            info!("found {} existing sessions: {}", existing.len(), existing.join(", "));
        }
        for id in existing {
            registry.add(&id);
        }

        let manager = Arc::new(VoteManager::new(
            store.clone(),
            registry.clone(),
            notifier.clone(),
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let reminder = ReminderLoop::new(
            store,
            registry,
            notifier,
            self.config.reminder_interval,
            self.config.reminder_min_age_secs,
        );
        let reminder_handle = tokio::spawn(reminder.run(shutdown_rx));

        let router = create_router(AppState { manager });
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!("✓ minivote ready on {}", self.addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("shutdown signal received");
            })
            .await?;

        let _ = shutdown_tx.send(true);
        let _ = reminder_handle.await;
        Ok(())
    }
}
