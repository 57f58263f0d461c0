//! # minivote
//!
//! A minimal voting service:
//! - Create a vote session with a set of options and an eligible-user list
//! - Invite every eligible user by email
//! - Accept at most one ballot per user per session
//! - Tally results per option
//! - Remind non-voters in the background after a staleness threshold
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 HTTP API (axum)              │
//! │  /create_vote /vote /vote_result             │
//! │  /delete_all_voters                          │
//! └──────────────┬───────────────────────────────┘
//!                │
//!        ┌───────▼────────┐     ┌───────────────┐
//!        │  VoteManager   │────▶│  NotifyPool   │──▶ SMTP
//!        └───┬────────┬───┘     └───────▲───────┘
//!            │        │                 │
//!    ┌───────▼──┐  ┌──▼────────┐  ┌─────┴────────┐
//!    │ VoteStore│  │ Session   │◀─│ ReminderLoop │
//!    │ (MySQL / │  │ Registry  │  │ (10s ticks)  │
//!    │  memory) │  └───────────┘  └──────────────┘
//!    └──────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! minivote --addr 0.0.0.0:4000
//! ```
//!
//! Database and SMTP credentials come from the environment (or a `.env`
//! file): `DB_USER`, `DB_PASSWORD`, `DB_NAME`, `EMAIL_PASSWORD`.

pub mod common;
pub mod http;
pub mod manager;
pub mod notify;
pub mod registry;
pub mod reminder;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use common::{Config, Error, Result};
pub use manager::{CastOutcome, VoteManager};
pub use registry::SessionRegistry;
pub use server::Server;

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
