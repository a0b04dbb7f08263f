//! Schema creation, additive migrations and first-run seeding.

use rusqlite::{params, Connection};

pub const DEFAULT_BOARD_NAME: &str = "Main Board";
pub const DEFAULT_COLUMNS: [&str; 3] = ["To Do", "In Progress", "Done"];

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS boards (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS columns (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  board_id INTEGER NOT NULL,
  name TEXT NOT NULL,
  position INTEGER NOT NULL DEFAULT 0,
  FOREIGN KEY (board_id) REFERENCES boards(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS subtasks (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  task_id INTEGER NOT NULL,
  title TEXT NOT NULL,
  completed INTEGER DEFAULT 0,
  position INTEGER NOT NULL DEFAULT 0,
  created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
  updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
  FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS activity_log (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  task_id INTEGER NOT NULL,
  action TEXT NOT NULL,
  details TEXT,
  created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
  FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE
);
"#;

/// Latest shape of the `tasks` table. Older databases reach the same shape
/// through the additive migrations in [`migrate_tasks`].
const TASKS_TABLE: &str = r#"
CREATE TABLE tasks (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  column_id INTEGER NOT NULL,
  title TEXT NOT NULL,
  description TEXT,
  position INTEGER NOT NULL DEFAULT 0,
  priority TEXT DEFAULT 'medium',
  due_date DATETIME,
  tags TEXT,
  created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
  updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
  FOREIGN KEY (column_id) REFERENCES columns(id) ON DELETE CASCADE
);
"#;

const INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_columns_board ON columns(board_id);
CREATE INDEX IF NOT EXISTS idx_tasks_column ON tasks(column_id);
CREATE INDEX IF NOT EXISTS idx_subtasks_task ON subtasks(task_id);
CREATE INDEX IF NOT EXISTS idx_activity_log_task ON activity_log(task_id);
"#;

/// Columns added to `tasks` after the first release, in the order they shipped.
const TASK_MIGRATIONS: [(&str, &str); 2] = [
    ("due_date", "ALTER TABLE tasks ADD COLUMN due_date DATETIME"),
    ("tags", "ALTER TABLE tasks ADD COLUMN tags TEXT"),
];

/// Ensure every table exists with its full column set, then seed the default
/// board if the store has none. Safe to run on every start.
pub(super) fn initialize(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)?;
    migrate_tasks(conn)?;
    conn.execute_batch(INDEXES)?;
    seed_default_board(conn)?;
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

fn migrate_tasks(conn: &Connection) -> rusqlite::Result<()> {
    let columns = table_columns(conn, "tasks")?;

    if columns.is_empty() {
        conn.execute_batch(TASKS_TABLE)?;
        tracing::info!("Created tasks table");
        return Ok(());
    }

    for (column, alter) in TASK_MIGRATIONS {
        if !columns.iter().any(|c| c == column) {
            conn.execute_batch(alter)?;
            tracing::info!(column, "Added missing column to tasks table");
        }
    }

    Ok(())
}

fn seed_default_board(conn: &Connection) -> rusqlite::Result<()> {
    let boards: i64 = conn.query_row("SELECT COUNT(*) FROM boards", [], |row| row.get(0))?;
    if boards > 0 {
        return Ok(());
    }

    conn.execute(
        "INSERT INTO boards (name) VALUES (?1)",
        params![DEFAULT_BOARD_NAME],
    )?;
    let board_id = conn.last_insert_rowid();

    for (position, name) in DEFAULT_COLUMNS.iter().enumerate() {
        conn.execute(
            "INSERT INTO columns (board_id, name, position) VALUES (?1, ?2, ?3)",
            params![board_id, name, position as i64],
        )?;
    }

    tracing::info!(board_id, "Seeded default board");
    Ok(())
}
