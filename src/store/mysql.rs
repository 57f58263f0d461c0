//! MySQL-backed store.
//!
//! One `ballots` table keyed by `(vote_id, user_id)` serves every
//! session; session ids never reach the schema, only bind parameters.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySqlPool, Row};

use crate::common::Result;
use crate::store::{Ballot, VoteStore};

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Connect and make sure the schema exists.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sessions (
                 vote_id    VARCHAR(64) PRIMARY KEY,
                 options    TEXT NOT NULL,
                 user_list  TEXT NOT NULL,
                 created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
             )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS ballots (
                 vote_id       VARCHAR(64) NOT NULL,
                 user_id       VARCHAR(255) NOT NULL,
                 choice        VARCHAR(255) NULL,
                 reminder_sent BOOLEAN NOT NULL DEFAULT FALSE,
                 created_at    TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                 PRIMARY KEY (vote_id, user_id)
             )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl VoteStore for MySqlStore {
    async fn provision(&self, id: &str, options: &[String], users: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO sessions (vote_id, options, user_list) VALUES (?, ?, ?)")
            .bind(id)
            .bind(serde_json::to_string(options)?)
            .bind(serde_json::to_string(users)?)
            .execute(&mut *tx)
            .await?;

        for user in users {
            sqlx::query("INSERT INTO ballots (vote_id, user_id) VALUES (?, ?)")
                .bind(id)
                .bind(user)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn session_exists(&self, id: &str) -> Result<bool> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM sessions WHERE vote_id = ?) AS known")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>("known")? != 0)
    }

    async fn options_of(&self, id: &str) -> Result<Option<Vec<String>>> {
        let row = sqlx::query("SELECT options FROM sessions WHERE vote_id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            None => Ok(None),
            Some(row) => {
                let raw: String = row.try_get("options")?;
                Ok(Some(serde_json::from_str(&raw)?))
            }
        }
    }

    async fn list_sessions(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT vote_id FROM sessions")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| Ok(row.try_get("vote_id")?))
            .collect()
    }

    async fn fetch_ballot(&self, id: &str, user: &str) -> Result<Option<Ballot>> {
        let row = sqlx::query(
            "SELECT user_id, choice, reminder_sent, created_at
             FROM ballots WHERE vote_id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Ok(None),
            Some(row) => Ok(Some(Ballot {
                user: row.try_get("user_id")?,
                choice: row.try_get::<Option<String>, _>("choice")?,
                reminder_sent: row.try_get("reminder_sent")?,
                created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            })),
        }
    }

    async fn set_choice_if_absent(&self, id: &str, user: &str, option: &str) -> Result<bool> {
        // The NULL guard makes this a single compare-and-swap; under
        // concurrent casts for the same user only one update can match.
        let result = sqlx::query(
            "UPDATE ballots SET choice = ?
             WHERE vote_id = ? AND user_id = ? AND choice IS NULL",
        )
        .bind(option)
        .bind(id)
        .bind(user)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn scan_unvoted_unreminded(&self, id: &str, min_age_secs: i64) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT user_id FROM ballots
             WHERE vote_id = ? AND choice IS NULL AND reminder_sent = FALSE
               AND TIMESTAMPDIFF(SECOND, created_at, NOW()) >= ?",
        )
        .bind(id)
        .bind(min_age_secs)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| Ok(row.try_get("user_id")?))
            .collect()
    }

    async fn mark_reminded(&self, id: &str, user: &str) -> Result<()> {
        sqlx::query("UPDATE ballots SET reminder_sent = TRUE WHERE vote_id = ? AND user_id = ?")
            .bind(id)
            .bind(user)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn aggregate(&self, id: &str) -> Result<HashMap<String, i64>> {
        let rows = sqlx::query(
            "SELECT choice, COUNT(*) AS votes FROM ballots
             WHERE vote_id = ? AND choice IS NOT NULL
             GROUP BY choice",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = HashMap::new();
        for row in rows {
            let choice: String = row.try_get("choice")?;
            let votes: i64 = row.try_get("votes")?;
            counts.insert(choice, votes);
        }
        Ok(counts)
    }

    async fn drop_ballots(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM ballots WHERE vote_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_session(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE vote_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_sessions(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
