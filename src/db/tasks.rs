use rusqlite::{params, Connection, OptionalExtension, Row};

use super::activity::{activity_for_task, insert_activity, ActivityAction};
use super::subtasks::subtasks_of_task;
use super::{
    KanbanDb, Priority, StoreError, StoreResult, Task, TaskChanges, TaskDetail, TaskEdit,
};

const TASK_COLUMNS: &str = "id, column_id, title, description, position, priority, \
                            due_date, tags, created_at, updated_at";

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    let priority: Option<String> = row.get("priority")?;
    Ok(Task {
        id: row.get("id")?,
        column_id: row.get("column_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        position: row.get("position")?,
        priority: priority
            .as_deref()
            .and_then(Priority::parse)
            .unwrap_or_default(),
        due_date: row.get("due_date")?,
        tags: row.get("tags")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(super) fn task_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Task>> {
    conn.query_row(
        &format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS),
        params![id],
        row_to_task,
    )
    .optional()
}

pub(super) fn tasks_in_column(conn: &Connection, column_id: i64) -> rusqlite::Result<Vec<Task>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM tasks WHERE column_id = ?1 ORDER BY position ASC",
        TASK_COLUMNS
    ))?;
    let tasks = stmt
        .query_map(params![column_id], row_to_task)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tasks)
}

/// Apply the provided fields and refresh `updated_at`. Returns the number of
/// rows touched (0 when the task does not exist).
fn apply_changes(conn: &Connection, id: i64, changes: &TaskChanges) -> rusqlite::Result<usize> {
    let assignments = changes.assignments();

    let mut fields: Vec<String> = assignments
        .iter()
        .map(|(column, _)| format!("{} = ?", column))
        .collect();
    fields.push("updated_at = CURRENT_TIMESTAMP".to_string());

    let sql = format!("UPDATE tasks SET {} WHERE id = ?", fields.join(", "));

    let mut values: Vec<&dyn rusqlite::ToSql> =
        assignments.iter().map(|(_, value)| value.as_ref()).collect();
    values.push(&id);

    conn.execute(&sql, values.as_slice())
}

impl KanbanDb {
    /// Tasks of a column ordered by position.
    pub fn get_tasks(&self, column_id: i64) -> StoreResult<Vec<Task>> {
        let conn = self.conn();
        Ok(tasks_in_column(&conn, column_id)?)
    }

    pub fn get_task(&self, id: i64) -> StoreResult<Option<Task>> {
        let conn = self.conn();
        Ok(task_by_id(&conn, id)?)
    }

    /// A task with its subtasks (by position) and activity log (newest first).
    pub fn get_task_detail(&self, id: i64) -> StoreResult<Option<TaskDetail>> {
        let conn = self.conn();
        let Some(task) = task_by_id(&conn, id)? else {
            return Ok(None);
        };
        let subtasks = subtasks_of_task(&conn, id)?;
        let activity_log = activity_for_task(&conn, id)?;
        Ok(Some(TaskDetail {
            task,
            subtasks,
            activity_log,
        }))
    }

    /// Append a task at the end of a column and return the stored row.
    ///
    /// An empty description is stored as NULL. Title validation is left to the caller.
    pub fn create_task(
        &self,
        column_id: i64,
        title: &str,
        description: Option<&str>,
        priority: Priority,
    ) -> StoreResult<Task> {
        let conn = self.conn();

        let max_position: i64 = conn.query_row(
            "SELECT COALESCE(MAX(position), -1) FROM tasks WHERE column_id = ?1",
            params![column_id],
            |row| row.get(0),
        )?;

        conn.execute(
            "INSERT INTO tasks (column_id, title, description, position, priority)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                column_id,
                title,
                description.filter(|d| !d.is_empty()),
                max_position + 1,
                priority.as_str(),
            ],
        )?;
        let id = conn.last_insert_rowid();

        task_by_id(&conn, id)?
            .ok_or_else(|| StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Overwrite the provided fields. Does not touch the activity log.
    pub fn update_task(&self, id: i64, changes: &TaskChanges) -> StoreResult<Option<Task>> {
        let conn = self.conn();
        if apply_changes(&conn, id, changes)? == 0 {
            return Ok(None);
        }
        Ok(task_by_id(&conn, id)?)
    }

    /// Overwrite the provided fields and record a `task_updated` entry.
    pub fn update_task_extended(
        &self,
        id: i64,
        changes: &TaskChanges,
    ) -> StoreResult<Option<Task>> {
        let conn = self.conn();
        if apply_changes(&conn, id, changes)? == 0 {
            return Ok(None);
        }
        let task = task_by_id(&conn, id)?;
        insert_activity(
            &conn,
            id,
            ActivityAction::TaskUpdated,
            Some("Task details updated"),
        )?;
        Ok(task)
    }

    /// Set a task's column and position verbatim.
    ///
    /// Other tasks are not re-ranked, so duplicate or gapped positions are possible.
    /// Returns false if the task does not exist.
    pub fn move_task(&self, id: i64, column_id: i64, position: i64) -> StoreResult<bool> {
        let conn = self.conn();
        let updated = conn.execute(
            "UPDATE tasks SET column_id = ?1, position = ?2, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?3",
            params![column_id, position, id],
        )?;
        Ok(updated > 0)
    }

    /// Apply an already-routed edit and return the task as stored afterwards.
    pub fn edit_task(&self, id: i64, edit: &TaskEdit) -> StoreResult<Option<Task>> {
        match edit {
            TaskEdit::Move {
                column_id,
                position,
            } => {
                if !self.move_task(id, *column_id, *position)? {
                    return Ok(None);
                }
                self.get_task(id)
            }
            TaskEdit::Update(changes) => self.update_task(id, changes),
            TaskEdit::UpdateExtended(changes) => self.update_task_extended(id, changes),
        }
    }

    /// Delete a task. Subtasks and activity rows go with it via cascade.
    pub fn delete_task(&self, id: i64) -> StoreResult<bool> {
        let conn = self.conn();
        let deleted = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_ids(db: &KanbanDb) -> Vec<i64> {
        db.get_columns(1)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect()
    }

    const STALE: &str = "2000-01-01 00:00:00";

    fn backdate(db: &KanbanDb, id: i64) {
        db.conn()
            .execute("UPDATE tasks SET updated_at = ?1 WHERE id = ?2", params![STALE, id])
            .unwrap();
    }

    #[test]
    fn test_every_task_mutation_refreshes_updated_at() {
        let db = KanbanDb::in_memory().unwrap();
        let columns = column_ids(&db);
        let task = db.create_task(columns[0], "stale", None, Priority::Low).unwrap();

        backdate(&db, task.id);
        let changes = TaskChanges {
            title: Some("fresh".to_string()),
            ..Default::default()
        };
        let updated = db.update_task(task.id, &changes).unwrap().unwrap();
        assert_ne!(updated.updated_at, STALE);

        backdate(&db, task.id);
        let changes = TaskChanges {
            tags: Some(Some("a,b".to_string())),
            ..Default::default()
        };
        let updated = db.update_task_extended(task.id, &changes).unwrap().unwrap();
        assert_ne!(updated.updated_at, STALE);

        backdate(&db, task.id);
        assert!(db.move_task(task.id, columns[1], 0).unwrap());
        let moved = db.get_task(task.id).unwrap().unwrap();
        assert_ne!(moved.updated_at, STALE);
        assert_eq!(moved.created_at, task.created_at);
    }

    #[test]
    fn test_sequential_creates_get_dense_positions() {
        let db = KanbanDb::in_memory().unwrap();
        let todo = column_ids(&db)[0];

        for i in 0..4 {
            db.create_task(todo, &format!("task {}", i), None, Priority::Medium)
                .unwrap();
        }

        let tasks = db.get_tasks(todo).unwrap();
        let positions: Vec<i64> = tasks.iter().map(|t| t.position).collect();
        let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(positions, vec![0, 1, 2, 3]);
        assert_eq!(titles, vec!["task 0", "task 1", "task 2", "task 3"]);
    }

    #[test]
    fn test_create_returns_stored_row() {
        let db = KanbanDb::in_memory().unwrap();
        let todo = column_ids(&db)[0];

        let task = db
            .create_task(todo, "Write docs", Some(""), Priority::High)
            .unwrap();
        assert_eq!(task.title, "Write docs");
        assert_eq!(task.description, None);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.due_date, None);
        assert_eq!(db.get_task(task.id).unwrap(), Some(task));
    }

    #[test]
    fn test_deleted_positions_leave_gaps() {
        let db = KanbanDb::in_memory().unwrap();
        let todo = column_ids(&db)[0];

        let _a = db.create_task(todo, "a", None, Priority::Medium).unwrap();
        let b = db.create_task(todo, "b", None, Priority::Medium).unwrap();
        assert!(db.delete_task(b.id).unwrap());
        let c = db.create_task(todo, "c", None, Priority::Medium).unwrap();
        assert_eq!(c.position, 1);

        let d = db.create_task(todo, "d", None, Priority::Medium).unwrap();
        db.delete_task(c.id).unwrap();
        assert_eq!(db.get_task(d.id).unwrap().unwrap().position, 2);
    }

    #[test]
    fn test_move_places_task_without_reranking() {
        let db = KanbanDb::in_memory().unwrap();
        let columns = column_ids(&db);
        let (todo, doing) = (columns[0], columns[1]);

        let existing = db.create_task(doing, "existing", None, Priority::Medium).unwrap();
        let task = db.create_task(todo, "Write docs", None, Priority::Medium).unwrap();

        assert!(db.move_task(task.id, doing, 0).unwrap());

        let data = db.get_board_data(1).unwrap().unwrap();
        assert!(data.columns[0].tasks.is_empty());
        let moved = data.columns[1]
            .tasks
            .iter()
            .find(|t| t.id == task.id)
            .unwrap();
        assert_eq!(moved.column_id, doing);
        assert_eq!(moved.position, 0);
        // Sibling keeps its position; duplicates are tolerated.
        assert_eq!(db.get_task(existing.id).unwrap().unwrap().position, 0);
    }

    #[test]
    fn test_move_missing_task_reports_false() {
        let db = KanbanDb::in_memory().unwrap();
        assert!(!db.move_task(404, column_ids(&db)[0], 0).unwrap());
    }

    #[test]
    fn test_plain_update_does_not_log() {
        let db = KanbanDb::in_memory().unwrap();
        let task = db.create_task(column_ids(&db)[0], "old", None, Priority::Medium).unwrap();

        let changes = TaskChanges {
            title: Some("x".to_string()),
            ..Default::default()
        };
        let updated = db
            .edit_task(task.id, &TaskEdit::for_changes(changes))
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "x");
        assert!(db.get_activity_log(task.id).unwrap().is_empty());
    }

    #[test]
    fn test_due_date_update_logs_task_updated() {
        let db = KanbanDb::in_memory().unwrap();
        let task = db.create_task(column_ids(&db)[0], "dated", None, Priority::Medium).unwrap();

        let changes = TaskChanges {
            due_date: Some(Some("2024-01-01".to_string())),
            ..Default::default()
        };
        let updated = db
            .edit_task(task.id, &TaskEdit::for_changes(changes))
            .unwrap()
            .unwrap();

        assert_eq!(updated.due_date.as_deref(), Some("2024-01-01"));
        let log = db.get_activity_log(task.id).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].action, "task_updated");
    }

    #[test]
    fn test_update_can_clear_nullable_fields() {
        let db = KanbanDb::in_memory().unwrap();
        let task = db
            .create_task(column_ids(&db)[0], "t", Some("desc"), Priority::Medium)
            .unwrap();

        let changes = TaskChanges {
            description: Some(None),
            tags: Some(Some("a,b".to_string())),
            priority: Some(Priority::Low),
            ..Default::default()
        };
        let updated = db.update_task_extended(task.id, &changes).unwrap().unwrap();
        assert_eq!(updated.description, None);
        assert_eq!(updated.tags.as_deref(), Some("a,b"));
        assert_eq!(updated.priority, Priority::Low);
        assert_eq!(updated.title, "t");
    }

    #[test]
    fn test_update_missing_task_is_none_and_unlogged() {
        let db = KanbanDb::in_memory().unwrap();
        let changes = TaskChanges {
            tags: Some(Some("x".to_string())),
            ..Default::default()
        };
        assert!(db.update_task_extended(404, &changes).unwrap().is_none());
        assert!(db.update_task(404, &TaskChanges::default()).unwrap().is_none());
    }

    #[test]
    fn test_delete_cascades_to_subtasks_and_activity() {
        let db = KanbanDb::in_memory().unwrap();
        let task = db.create_task(column_ids(&db)[0], "doomed", None, Priority::Medium).unwrap();
        let sub = db.create_subtask(task.id, "child").unwrap();
        db.toggle_subtask(sub.id, task.id).unwrap();

        assert!(db.delete_task(task.id).unwrap());
        assert!(!db.delete_task(task.id).unwrap());

        let conn = db.conn();
        let subtasks: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM subtasks WHERE task_id = ?1",
                params![task.id],
                |row| row.get(0),
            )
            .unwrap();
        let activity: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM activity_log WHERE task_id = ?1",
                params![task.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(subtasks, 0);
        assert_eq!(activity, 0);
    }

    #[test]
    fn test_create_in_missing_column_is_storage_error() {
        let db = KanbanDb::in_memory().unwrap();
        let err = db.create_task(999, "orphan", None, Priority::Medium).unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }

    #[test]
    fn test_task_detail_includes_children() {
        let db = KanbanDb::in_memory().unwrap();
        let task = db.create_task(column_ids(&db)[0], "parent", None, Priority::Medium).unwrap();
        db.create_subtask(task.id, "one").unwrap();
        db.create_subtask(task.id, "two").unwrap();

        let detail = db.get_task_detail(task.id).unwrap().unwrap();
        assert_eq!(detail.task, db.get_task(task.id).unwrap().unwrap());
        assert_eq!(detail.subtasks.len(), 2);
        assert_eq!(detail.subtasks[0].title, "one");
        assert_eq!(detail.activity_log.len(), 2);
        assert!(db.get_task_detail(404).unwrap().is_none());
    }
}
