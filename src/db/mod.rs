//! Embedded SQLite store for boards, columns, tasks, subtasks and the activity log.
//!
//! `KanbanDb` owns the single connection. Every repository operation locks it for
//! the duration of its statements, so operations never interleave with each other.
//! Multi-statement operations (update + log, read + delete + log) are not wrapped
//! in transactions.

mod activity;
mod boards;
mod schema;
mod subtasks;
mod tasks;
mod types;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use thiserror::Error;

pub use activity::ActivityAction;
pub use schema::{DEFAULT_BOARD_NAME, DEFAULT_COLUMNS};
pub use types::*;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0}")]
    Validation(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Repository over the Kanban database.
pub struct KanbanDb {
    conn: Mutex<Connection>,
}

impl KanbanDb {
    /// Open (or create) the database file and bring its schema up to date.
    pub fn open<P: AsRef<Path>>(db_path: P) -> StoreResult<Self> {
        let conn = Connection::open(db_path.as_ref())?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Self::from_connection(conn)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        // Cascading deletes depend on this.
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the connection. A poisoned lock still holds a usable connection.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
