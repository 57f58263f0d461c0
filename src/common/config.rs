//! Configuration, loaded from the environment.
//!
//! The service is configured entirely through environment variables (a
//! `.env` file is honored by the binary). Database credentials are
//! required; everything else has a sensible default. When
//! `EMAIL_PASSWORD` is absent the server falls back to a log-only mail
//! transport, which keeps local development usable without SMTP access.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::common::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// MySQL credentials
    pub db_user: String,
    pub db_password: String,
    pub db_host: String,
    pub db_name: String,

    /// SMTP relay host
    pub smtp_host: String,
    /// Sender address, also used as the SMTP username
    pub smtp_from: String,
    /// SMTP password; `None` selects the log-only transport
    pub email_password: Option<String>,

    /// Pause between reminder scan passes
    pub reminder_interval: Duration,
    /// Minimum ballot-row age before a reminder is due, in seconds
    pub reminder_min_age_secs: i64,

    /// Concurrent notification sends
    pub notify_workers: usize,
    /// Queued notifications before the pool starts dropping
    pub notify_queue: usize,
    /// Per-send mail timeout
    pub mail_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            db_user: require("DB_USER")?,
            db_password: require("DB_PASSWORD")?,
            db_host: or_default("DB_HOST", "localhost"),
            db_name: require("DB_NAME")?,
            smtp_host: or_default("SMTP_HOST", "smtp.gmail.com"),
            smtp_from: or_default("SMTP_FROM", "minivote@localhost"),
            email_password: env::var("EMAIL_PASSWORD").ok(),
            reminder_interval: Duration::from_secs(parse_or("REMINDER_INTERVAL_SECS", 10u64)),
            reminder_min_age_secs: parse_or("REMINDER_MIN_AGE_SECS", 60i64),
            notify_workers: parse_or("NOTIFY_WORKERS", 8usize),
            notify_queue: parse_or("NOTIFY_QUEUE", 256usize),
            mail_timeout: Duration::from_secs(parse_or("MAIL_TIMEOUT_SECS", 10u64)),
        })
    }

    /// Connection string for the MySQL pool.
    pub fn database_url(&self) -> String {
        format!(
            "mysql://{}:{}@{}/{}",
            self.db_user, self.db_password, self.db_host, self.db_name
        )
    }
}

fn require(key: &str) -> Result<String> {
    env::var(key).map_err(|_| Error::InvalidConfig(format!("{key} must be set")))
}

fn or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Err(_) => default,
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("invalid {key} value {raw:?} ({e}), using default {default}");
            default
        }),
    }
}
