use futures::future::BoxFuture;
use rusqlite::params_from_iter;
use tracing::error;

use nova_core::error::{NovaError, Result};
use nova_core::traits::ScheduleStore;
use nova_core::types::{Schedule, ScheduleFilter};

use crate::db::Database;

/// Schedule lookups against the shared SQLite database.
///
/// Reads degrade to an empty list on query failure so a broken table never
/// takes down a chat turn; the failure is still logged.
pub struct SqliteScheduleStore {
    db: Database,
}

impl SqliteScheduleStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a schedule row. Used by seeding and tests.
    pub fn insert(
        &self,
        title: &str,
        start_time: &str,
        event_type: &str,
        description: Option<&str>,
    ) -> Result<i64> {
        let conn = self.db.conn()?;
        conn.execute(
            "INSERT INTO schedules (title, start_time, event_type, description)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![title, start_time, event_type, description],
        )
        .map_err(|e| NovaError::Database(e.to_string()))?;
        Ok(conn.last_insert_rowid())
    }

    fn query(&self, filter: &ScheduleFilter) -> Result<Vec<Schedule>> {
        let conn = self.db.conn()?;

        let mut sql = String::from(
            "SELECT id, title, start_time, event_type, description FROM schedules",
        );
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(start) = &filter.start_date {
            clauses.push("start_time >= ?");
            args.push(start.clone());
        }
        if let Some(end) = &filter.end_date {
            clauses.push("start_time <= ?");
            args.push(end.clone());
        }
        if let Some(event_type) = &filter.event_type {
            // "all" is the unfiltered sentinel
            if event_type != "all" {
                clauses.push("event_type = ?");
                args.push(event_type.clone());
            }
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY start_time ASC");

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| NovaError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                Ok(Schedule {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    start_time: row.get(2)?,
                    event_type: row.get(3)?,
                    description: row.get(4)?,
                })
            })
            .map_err(|e| NovaError::Database(e.to_string()))?;

        let mut schedules = Vec::new();
        for row in rows {
            schedules.push(row.map_err(|e| NovaError::Database(e.to_string()))?);
        }
        Ok(schedules)
    }
}

impl ScheduleStore for SqliteScheduleStore {
    fn list(&self, filter: ScheduleFilter) -> BoxFuture<'_, Result<Vec<Schedule>>> {
        Box::pin(async move {
            match self.query(&filter) {
                Ok(schedules) => Ok(schedules),
                Err(e) => {
                    error!(error = %e, "Schedule lookup failed, returning empty list");
                    Ok(Vec::new())
                }
            }
        })
    }
}
