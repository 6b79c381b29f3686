//! SQLite-based session storage.
//!
//! Provides persistent storage for:
//! - Finished and skipped sessions
//! - Timer settings (JSON in the key-value table)
//! - Key-value store for host state, such as the persisted timer engine

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use uuid::Uuid;

use super::{data_dir, migrations};
use crate::collaborators::Persistence;
use crate::error::{DatabaseError, Result};
use crate::timer::{SessionType, TimerSession, TimerSettings};

const SETTINGS_KEY: &str = "timer_settings";

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data dir>/pomotimer.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("pomotimer.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Insert a session record. Saving the same id twice keeps the first.
    pub fn record_session(&self, session: &TimerSession) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO sessions (id, session_type, duration_secs, completed_at, was_completed)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.id.to_string(),
                session.session_type.as_str(),
                session.duration_secs,
                session.completed_at.to_rfc3339(),
                session.was_completed,
            ],
        )?;
        Ok(())
    }

    /// Sessions ordered by completion time, newest last.
    pub fn sessions(&self) -> Result<Vec<TimerSession>> {
        self.query_sessions(
            "SELECT id, session_type, duration_secs, completed_at, was_completed
             FROM sessions ORDER BY completed_at ASC",
            None,
        )
    }

    /// The `limit` most recent sessions, newest first.
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<TimerSession>> {
        self.query_sessions(
            "SELECT id, session_type, duration_secs, completed_at, was_completed
             FROM sessions ORDER BY completed_at DESC LIMIT ?1",
            Some(limit as i64),
        )
    }

    fn query_sessions(&self, sql: &str, limit: Option<i64>) -> Result<Vec<TimerSession>> {
        let mut stmt = self.conn.prepare(sql)?;
        let map_row = |row: &rusqlite::Row<'_>| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, bool>(4)?,
            ))
        };
        let rows = match limit {
            Some(limit) => stmt.query_map(params![limit], map_row)?.collect::<Vec<_>>(),
            None => stmt.query_map([], map_row)?.collect::<Vec<_>>(),
        };

        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            let (id, session_type, duration_secs, completed_at, was_completed) = row?;
            sessions.push(TimerSession {
                id: Uuid::parse_str(&id).map_err(|e| corrupt(e.to_string()))?,
                session_type: session_type.parse::<SessionType>().map_err(corrupt)?,
                duration_secs,
                completed_at: DateTime::parse_from_rfc3339(&completed_at)
                    .map_err(|e| corrupt(e.to_string()))?
                    .with_timezone(&Utc),
                was_completed,
            });
        }
        Ok(sessions)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<()> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

fn corrupt(message: String) -> DatabaseError {
    DatabaseError::CorruptRow {
        table: "sessions",
        message,
    }
}

impl Persistence for Database {
    fn save_session(&self, session: &TimerSession) -> Result<()> {
        self.record_session(session)
    }

    fn all_sessions(&self) -> Result<Vec<TimerSession>> {
        self.sessions()
    }

    /// Stored settings, or defaults when none were saved. Missing fields
    /// take their defaults.
    fn load_settings(&self) -> Result<TimerSettings> {
        match self.kv_get(SETTINGS_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(TimerSettings::default()),
        }
    }

    fn save_settings(&self, settings: &TimerSettings) -> Result<()> {
        self.kv_set(SETTINGS_KEY, &serde_json::to_string(settings)?)
    }
}
