//! Row types and edit inputs for the Kanban store.

use rusqlite::types::ToSql;
use serde::{Deserialize, Serialize};

/// Task priority. Stored as lowercase text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Board {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub id: i64,
    pub board_id: i64,
    pub name: String,
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: i64,
    pub column_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub position: i64,
    pub priority: Priority,
    pub due_date: Option<String>,
    pub tags: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subtask {
    pub id: i64,
    pub task_id: i64,
    pub title: String,
    pub completed: bool,
    pub position: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// One immutable row of a task's activity log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    pub id: i64,
    pub task_id: i64,
    pub action: String,
    pub details: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnWithTasks {
    #[serde(flatten)]
    pub column: Column,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardWithColumns {
    #[serde(flatten)]
    pub board: Board,
    pub columns: Vec<ColumnWithTasks>,
}

/// A task together with its subtasks and activity log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub subtasks: Vec<Subtask>,
    pub activity_log: Vec<ActivityEntry>,
}

/// Partial set of task fields to overwrite.
///
/// `None` leaves a field untouched. For nullable columns the inner `Option`
/// is the new value, so `Some(None)` clears the column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub column_id: Option<i64>,
    pub position: Option<i64>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<String>>,
    pub tags: Option<Option<String>>,
}

impl TaskChanges {
    /// Whether the change set names a field introduced by a later migration.
    pub fn touches_extended_fields(&self) -> bool {
        self.due_date.is_some() || self.tags.is_some()
    }

    /// `column = ?` pairs for every provided field. Column names come only
    /// from this fixed list, never from caller input.
    pub(crate) fn assignments(&self) -> Vec<(&'static str, Box<dyn ToSql>)> {
        let mut out: Vec<(&'static str, Box<dyn ToSql>)> = Vec::new();

        if let Some(ref v) = self.title {
            out.push(("title", Box::new(v.clone())));
        }
        if let Some(ref v) = self.description {
            out.push(("description", Box::new(v.clone())));
        }
        if let Some(v) = self.column_id {
            out.push(("column_id", Box::new(v)));
        }
        if let Some(v) = self.position {
            out.push(("position", Box::new(v)));
        }
        if let Some(v) = self.priority {
            out.push(("priority", Box::new(v.as_str())));
        }
        if let Some(ref v) = self.due_date {
            out.push(("due_date", Box::new(v.clone())));
        }
        if let Some(ref v) = self.tags {
            out.push(("tags", Box::new(v.clone())));
        }

        out
    }
}

/// A fully disambiguated task mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEdit {
    /// Place the task in `column_id` at `position`. Siblings keep their positions.
    Move { column_id: i64, position: i64 },
    /// Overwrite fields without touching the activity log.
    Update(TaskChanges),
    /// Overwrite fields and record a `task_updated` activity entry.
    UpdateExtended(TaskChanges),
}

impl TaskEdit {
    /// Pick the update flavor: change sets naming `due_date` or `tags` are logged.
    pub fn for_changes(changes: TaskChanges) -> Self {
        if changes.touches_extended_fields() {
            Self::UpdateExtended(changes)
        } else {
            Self::Update(changes)
        }
    }
}
