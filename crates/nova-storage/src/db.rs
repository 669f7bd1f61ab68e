use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::debug;

use nova_core::error::{NovaError, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS schedules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    start_time TEXT NOT NULL,
    event_type TEXT NOT NULL,
    description TEXT
);

CREATE INDEX IF NOT EXISTS idx_schedules_start
    ON schedules(start_time);

CREATE TABLE IF NOT EXISTS fan_letters (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    user_id TEXT,
    category TEXT NOT NULL,
    message TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT NOT NULL
);

CREATE VIRTUAL TABLE IF NOT EXISTS documents_fts USING fts5(
    content,
    title UNINDEXED,
    content_rowid=id,
    tokenize='porter unicode61'
);

CREATE TRIGGER IF NOT EXISTS documents_ai AFTER INSERT ON documents BEGIN
    INSERT INTO documents_fts(rowid, content, title)
    VALUES (new.id, new.content, new.title);
END;
";

/// Shared handle to the Nova SQLite database. Cheap to clone; all stores
/// built from the same handle share one connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the database file at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| NovaError::Database(format!("Failed to create db directory: {}", e)))?;
        }

        let conn =
            Connection::open(path).map_err(|e| NovaError::Database(e.to_string()))?;

        // WAL keeps readers unblocked while a writer holds the connection
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| NovaError::Database(e.to_string()))?;

        conn.execute_batch(SCHEMA)
            .map_err(|e| NovaError::Database(e.to_string()))?;

        debug!(path = %path.display(), "SQLite database opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database for tests.
    pub fn in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| NovaError::Database(e.to_string()))?;

        conn.execute_batch(SCHEMA)
            .map_err(|e| NovaError::Database(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Cheap liveness probe, used by the readiness endpoint.
    pub fn ping(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))
            .map_err(|e| NovaError::Database(e.to_string()))
    }

    /// Handle whose every operation fails. The connection lock is poisoned at
    /// construction, so callers see the same error surface as a dead database.
    #[cfg(feature = "test-util")]
    pub fn poisoned() -> Self {
        let conn = Arc::new(Mutex::new(
            Connection::open_in_memory().expect("open in-memory db"),
        ));
        let hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));
        let lock = conn.clone();
        let _ = std::thread::spawn(move || {
            let _guard = lock.lock();
            panic!("poison the connection lock");
        })
        .join();
        std::panic::set_hook(hook);
        Self { conn }
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| NovaError::Database(e.to_string()))
    }
}
