//! Append-only, capacity-bounded event log.
//!
//! The pipeline and projector only see the `EventLog` capability, so the
//! in-process buffer and the SQLite-backed store are interchangeable. Both
//! keep the most recent N entries and return them oldest-first.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use rusqlite::Connection;

use super::error::EventLogError;
use crate::domain::LogEntry;

/// Default cap on retained entries.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Capability interface for the event log.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Append one entry, evicting the oldest entries past capacity.
    async fn append(&self, entry: LogEntry) -> Result<(), EventLogError>;

    /// All retained entries in insertion order (oldest first).
    async fn all(&self) -> Result<Vec<LogEntry>, EventLogError>;
}

/// In-process bounded buffer. Lost on restart.
pub struct MemoryEventLog {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl MemoryEventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }
}

impl Default for MemoryEventLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

#[async_trait]
impl EventLog for MemoryEventLog {
    async fn append(&self, entry: LogEntry) -> Result<(), EventLogError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        entries.push_back(entry);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
        Ok(())
    }

    async fn all(&self) -> Result<Vec<LogEntry>, EventLogError> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(entries.iter().cloned().collect())
    }
}

/// Durable variant backed by SQLite.
///
/// Entries are stored as JSON rows; `all` queries the most recent N by rowid
/// and reverses to oldest-first, so readers see the same shape as the memory
/// variant across restarts.
pub struct SqliteEventLog {
    conn: Mutex<Connection>,
    capacity: usize,
}

impl SqliteEventLog {
    pub fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self, EventLogError> {
        let conn = Connection::open(path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                entry TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            capacity,
        })
    }
}

#[async_trait]
impl EventLog for SqliteEventLog {
    async fn append(&self, entry: LogEntry) -> Result<(), EventLogError> {
        let json = serde_json::to_string(&entry)?;
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute("INSERT INTO logs (entry) VALUES (?1)", [&json])?;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<LogEntry>, EventLogError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt =
            conn.prepare("SELECT entry FROM logs ORDER BY id DESC LIMIT ?1")?;
        let rows = stmt.query_map([self.capacity], |row| row.get::<_, String>(0))?;

        let mut entries = Vec::new();
        for row in rows {
            let entry: LogEntry = serde_json::from_str(&row?)?;
            entries.push(entry);
        }
        entries.reverse();
        Ok(entries)
    }
}
