use futures::future::BoxFuture;
use rusqlite::params;

use nova_core::error::{NovaError, Result};
use nova_core::traits::DocIndex;

use crate::db::Database;

/// Full-text document index over the `documents_fts` virtual table.
pub struct SqliteDocIndex {
    db: Database,
}

impl SqliteDocIndex {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Add a document to the index. The FTS trigger mirrors it into
    /// `documents_fts` automatically.
    pub fn insert_document(&self, title: &str, content: &str) -> Result<i64> {
        let conn = self.db.conn()?;
        conn.execute(
            "INSERT INTO documents (title, content) VALUES (?1, ?2)",
            params![title, content],
        )
        .map_err(|e| NovaError::Database(e.to_string()))?;
        Ok(conn.last_insert_rowid())
    }
}

/// Turn free-form user text into an FTS5 MATCH expression.
///
/// Each whitespace-separated term is quoted so punctuation cannot be read as
/// FTS syntax, and terms are OR-ed so partial matches still rank.
fn fts_query(input: &str) -> String {
    input
        .split_whitespace()
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

impl DocIndex for SqliteDocIndex {
    fn search(&self, query: &str, limit: usize) -> BoxFuture<'_, Result<Vec<String>>> {
        let query = query.to_string();

        Box::pin(async move {
            let match_expr = fts_query(&query);
            if match_expr.is_empty() {
                return Ok(Vec::new());
            }

            let conn = self.db.conn()?;
            let mut stmt = conn
                .prepare(
                    "SELECT content FROM documents_fts
                     WHERE documents_fts MATCH ?1
                     ORDER BY rank
                     LIMIT ?2",
                )
                .map_err(|e| NovaError::Database(e.to_string()))?;

            let rows = stmt
                .query_map(params![match_expr, limit as i64], |row| {
                    row.get::<_, String>(0)
                })
                .map_err(|e| NovaError::Database(e.to_string()))?;

            let mut docs = Vec::new();
            for row in rows {
                docs.push(row.map_err(|e| NovaError::Database(e.to_string()))?);
            }
            Ok(docs)
        })
    }
}
