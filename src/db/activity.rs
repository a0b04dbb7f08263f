//! Append-only activity log.

use rusqlite::{params, Connection, Row};

use super::{ActivityEntry, KanbanDb, StoreResult};

/// Tags recorded in `activity_log.action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityAction {
    TaskUpdated,
    SubtaskAdded,
    SubtaskCompleted,
    SubtaskUncompleted,
    SubtaskDeleted,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskUpdated => "task_updated",
            Self::SubtaskAdded => "subtask_added",
            Self::SubtaskCompleted => "subtask_completed",
            Self::SubtaskUncompleted => "subtask_uncompleted",
            Self::SubtaskDeleted => "subtask_deleted",
        }
    }
}

impl std::fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(super) fn insert_activity(
    conn: &Connection,
    task_id: i64,
    action: ActivityAction,
    details: Option<&str>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO activity_log (task_id, action, details) VALUES (?1, ?2, ?3)",
        params![task_id, action.as_str(), details.filter(|d| !d.is_empty())],
    )?;
    tracing::debug!(task_id, action = %action, "Recorded activity");
    Ok(())
}

fn row_to_activity(row: &Row) -> rusqlite::Result<ActivityEntry> {
    Ok(ActivityEntry {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        action: row.get("action")?,
        details: row.get("details")?,
        created_at: row.get("created_at")?,
    })
}

pub(super) fn activity_for_task(
    conn: &Connection,
    task_id: i64,
) -> rusqlite::Result<Vec<ActivityEntry>> {
    // created_at has one-second resolution; id breaks ties so the newest row stays first.
    let mut stmt = conn.prepare(
        "SELECT id, task_id, action, details, created_at FROM activity_log
         WHERE task_id = ?1 ORDER BY created_at DESC, id DESC",
    )?;
    let entries = stmt
        .query_map(params![task_id], row_to_activity)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

impl KanbanDb {
    /// Append one entry to a task's activity log.
    pub fn log_activity(
        &self,
        task_id: i64,
        action: ActivityAction,
        details: Option<&str>,
    ) -> StoreResult<()> {
        let conn = self.conn();
        insert_activity(&conn, task_id, action, details)?;
        Ok(())
    }

    /// Activity log of a task, most recent first.
    pub fn get_activity_log(&self, task_id: i64) -> StoreResult<Vec<ActivityEntry>> {
        let conn = self.conn();
        Ok(activity_for_task(&conn, task_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Priority, StoreError};

    #[test]
    fn test_log_is_returned_newest_first() {
        let db = KanbanDb::in_memory().unwrap();
        let task = db.create_task(1, "Logged", None, Priority::Medium).unwrap();

        db.log_activity(task.id, ActivityAction::SubtaskAdded, Some("first"))
            .unwrap();
        db.log_activity(task.id, ActivityAction::SubtaskDeleted, Some("second"))
            .unwrap();

        let log = db.get_activity_log(task.id).unwrap();
        let actions: Vec<&str> = log.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, vec!["subtask_deleted", "subtask_added"]);
        assert_eq!(log[0].details.as_deref(), Some("second"));
    }

    #[test]
    fn test_empty_details_are_stored_as_null() {
        let db = KanbanDb::in_memory().unwrap();
        let task = db.create_task(1, "Logged", None, Priority::Medium).unwrap();

        db.log_activity(task.id, ActivityAction::TaskUpdated, Some(""))
            .unwrap();

        let log = db.get_activity_log(task.id).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].details, None);
    }

    #[test]
    fn test_logging_against_missing_task_fails() {
        let db = KanbanDb::in_memory().unwrap();
        let err = db
            .log_activity(999, ActivityAction::TaskUpdated, None)
            .unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }
}
