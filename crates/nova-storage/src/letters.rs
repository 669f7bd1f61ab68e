use chrono::Utc;
use futures::future::BoxFuture;
use rusqlite::params;
use tracing::debug;
use uuid::Uuid;

use nova_core::error::{NovaError, Result};
use nova_core::traits::FanLetterStore;
use nova_core::types::NewFanLetter;

use crate::db::Database;

/// Fan letter persistence. Unlike schedule reads, a failed write propagates
/// so the caller can report the letter as undelivered.
pub struct SqliteFanLetterStore {
    db: Database,
}

impl SqliteFanLetterStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Number of stored letters, for tests and diagnostics.
    pub fn count(&self) -> Result<i64> {
        let conn = self.db.conn()?;
        conn.query_row("SELECT count(*) FROM fan_letters", [], |row| row.get(0))
            .map_err(|e| NovaError::Database(e.to_string()))
    }
}

impl FanLetterStore for SqliteFanLetterStore {
    fn create(&self, letter: NewFanLetter) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let id = Uuid::new_v4().to_string();
            let created_at = Utc::now().to_rfc3339();

            let conn = self.db.conn()?;
            conn.execute(
                "INSERT INTO fan_letters (id, session_id, user_id, category, message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    letter.session_id,
                    letter.user_id,
                    letter.category,
                    letter.message,
                    created_at
                ],
            )
            .map_err(|e| NovaError::Database(e.to_string()))?;

            debug!(letter_id = %id, category = %letter.category, "Fan letter stored");
            Ok(id)
        })
    }
}
