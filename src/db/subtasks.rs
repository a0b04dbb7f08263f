use rusqlite::{params, Connection, OptionalExtension, Row};

use super::activity::{insert_activity, ActivityAction};
use super::{KanbanDb, StoreError, StoreResult, Subtask};

const SUBTASK_COLUMNS: &str = "id, task_id, title, completed, position, created_at, updated_at";

fn row_to_subtask(row: &Row) -> rusqlite::Result<Subtask> {
    let completed: Option<i64> = row.get("completed")?;
    Ok(Subtask {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        title: row.get("title")?,
        completed: completed.unwrap_or(0) != 0,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn subtask_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Subtask>> {
    conn.query_row(
        &format!("SELECT {} FROM subtasks WHERE id = ?1", SUBTASK_COLUMNS),
        params![id],
        row_to_subtask,
    )
    .optional()
}

pub(super) fn subtasks_of_task(conn: &Connection, task_id: i64) -> rusqlite::Result<Vec<Subtask>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM subtasks WHERE task_id = ?1 ORDER BY position ASC",
        SUBTASK_COLUMNS
    ))?;
    let subtasks = stmt
        .query_map(params![task_id], row_to_subtask)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(subtasks)
}

impl KanbanDb {
    /// Subtasks of a task ordered by position.
    pub fn get_subtasks(&self, task_id: i64) -> StoreResult<Vec<Subtask>> {
        let conn = self.conn();
        Ok(subtasks_of_task(&conn, task_id)?)
    }

    pub fn get_subtask(&self, id: i64) -> StoreResult<Option<Subtask>> {
        let conn = self.conn();
        Ok(subtask_by_id(&conn, id)?)
    }

    /// Append a subtask to a task and log `subtask_added`.
    ///
    /// The title is trimmed; a blank title is rejected before anything is written.
    pub fn create_subtask(&self, task_id: i64, title: &str) -> StoreResult<Subtask> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StoreError::Validation("Title is required".to_string()));
        }

        let conn = self.conn();
        let max_position: i64 = conn.query_row(
            "SELECT COALESCE(MAX(position), -1) FROM subtasks WHERE task_id = ?1",
            params![task_id],
            |row| row.get(0),
        )?;
        conn.execute(
            "INSERT INTO subtasks (task_id, title, position) VALUES (?1, ?2, ?3)",
            params![task_id, title, max_position + 1],
        )?;
        let id = conn.last_insert_rowid();
        let subtask = subtask_by_id(&conn, id)?
            .ok_or_else(|| StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows))?;

        insert_activity(
            &conn,
            task_id,
            ActivityAction::SubtaskAdded,
            Some(&format!("Added subtask: {}", title)),
        )?;
        Ok(subtask)
    }

    /// Flip a subtask's completion and log the transition away from its previous state.
    ///
    /// Returns the updated subtask, or `None` if it does not exist.
    pub fn toggle_subtask(&self, subtask_id: i64, task_id: i64) -> StoreResult<Option<Subtask>> {
        let conn = self.conn();
        let Some(before) = subtask_by_id(&conn, subtask_id)? else {
            return Ok(None);
        };

        conn.execute(
            "UPDATE subtasks SET completed = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
            params![(!before.completed) as i64, subtask_id],
        )?;

        let action = if before.completed {
            ActivityAction::SubtaskUncompleted
        } else {
            ActivityAction::SubtaskCompleted
        };
        insert_activity(&conn, task_id, action, Some(&before.title))?;

        Ok(subtask_by_id(&conn, subtask_id)?)
    }

    /// Delete a subtask and log `subtask_deleted` with its title.
    ///
    /// Returns false if the subtask does not exist.
    pub fn delete_subtask(&self, subtask_id: i64, task_id: i64) -> StoreResult<bool> {
        let conn = self.conn();
        // The title must be read before the row is gone.
        let title: Option<String> = conn
            .query_row(
                "SELECT title FROM subtasks WHERE id = ?1",
                params![subtask_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(title) = title else {
            return Ok(false);
        };

        conn.execute("DELETE FROM subtasks WHERE id = ?1", params![subtask_id])?;
        insert_activity(
            &conn,
            task_id,
            ActivityAction::SubtaskDeleted,
            Some(&format!("Deleted subtask: {}", title)),
        )?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Priority;

    fn db_with_task() -> (KanbanDb, i64) {
        let db = KanbanDb::in_memory().unwrap();
        let column = db.get_columns(1).unwrap()[0].id;
        let task = db.create_task(column, "parent", None, Priority::Medium).unwrap();
        (db, task.id)
    }

    #[test]
    fn test_create_appends_and_logs() {
        let (db, task_id) = db_with_task();

        let first = db.create_subtask(task_id, "  first  ").unwrap();
        let second = db.create_subtask(task_id, "second").unwrap();

        assert_eq!(first.title, "first");
        assert!(!first.completed);
        assert_eq!((first.position, second.position), (0, 1));

        let log = db.get_activity_log(task_id).unwrap();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|e| e.action == "subtask_added"));
        assert_eq!(log[0].details.as_deref(), Some("Added subtask: second"));
    }

    #[test]
    fn test_blank_title_is_rejected_without_insert() {
        let (db, task_id) = db_with_task();

        let err = db.create_subtask(task_id, "   ").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(db.get_subtasks(task_id).unwrap().is_empty());
        assert!(db.get_activity_log(task_id).unwrap().is_empty());
    }

    #[test]
    fn test_toggle_twice_restores_state_and_logs_both_ways() {
        let (db, task_id) = db_with_task();
        let sub = db.create_subtask(task_id, "flip").unwrap();

        let once = db.toggle_subtask(sub.id, task_id).unwrap().unwrap();
        assert!(once.completed);
        let twice = db.toggle_subtask(sub.id, task_id).unwrap().unwrap();
        assert_eq!(twice.completed, sub.completed);

        let log = db.get_activity_log(task_id).unwrap();
        let toggles: Vec<&str> = log
            .iter()
            .filter(|e| e.action != "subtask_added")
            .map(|e| e.action.as_str())
            .collect();
        assert_eq!(toggles, vec!["subtask_uncompleted", "subtask_completed"]);
        assert!(log[..2].iter().all(|e| e.details.as_deref() == Some("flip")));
    }

    #[test]
    fn test_toggle_refreshes_updated_at() {
        let (db, task_id) = db_with_task();
        let sub = db.create_subtask(task_id, "stale").unwrap();
        db.conn()
            .execute(
                "UPDATE subtasks SET updated_at = '2000-01-01 00:00:00' WHERE id = ?1",
                params![sub.id],
            )
            .unwrap();

        let toggled = db.toggle_subtask(sub.id, task_id).unwrap().unwrap();
        assert_ne!(toggled.updated_at, "2000-01-01 00:00:00");
        assert_eq!(toggled.created_at, sub.created_at);
    }

    #[test]
    fn test_toggle_missing_subtask_is_none() {
        let (db, task_id) = db_with_task();
        assert!(db.toggle_subtask(404, task_id).unwrap().is_none());
        assert!(db.get_activity_log(task_id).unwrap().is_empty());
    }

    #[test]
    fn test_delete_logs_title() {
        let (db, task_id) = db_with_task();
        let sub = db.create_subtask(task_id, "gone").unwrap();

        assert!(db.delete_subtask(sub.id, task_id).unwrap());
        assert!(db.get_subtask(sub.id).unwrap().is_none());
        assert!(!db.delete_subtask(sub.id, task_id).unwrap());

        let log = db.get_activity_log(task_id).unwrap();
        assert_eq!(log[0].action, "subtask_deleted");
        assert_eq!(log[0].details.as_deref(), Some("Deleted subtask: gone"));
    }
}
