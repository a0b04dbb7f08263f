use rusqlite::{params, Connection, OptionalExtension, Row};

use super::tasks::tasks_in_column;
use super::{Board, BoardWithColumns, Column, ColumnWithTasks, KanbanDb, StoreResult};

fn row_to_board(row: &Row) -> rusqlite::Result<Board> {
    Ok(Board {
        id: row.get("id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
    })
}

fn row_to_column(row: &Row) -> rusqlite::Result<Column> {
    Ok(Column {
        id: row.get("id")?,
        board_id: row.get("board_id")?,
        name: row.get("name")?,
        position: row.get("position")?,
    })
}

fn board_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Board>> {
    conn.query_row(
        "SELECT id, name, created_at FROM boards WHERE id = ?1",
        params![id],
        row_to_board,
    )
    .optional()
}

fn columns_in_board(conn: &Connection, board_id: i64) -> rusqlite::Result<Vec<Column>> {
    let mut stmt = conn.prepare(
        "SELECT id, board_id, name, position FROM columns
         WHERE board_id = ?1 ORDER BY position ASC",
    )?;
    let columns = stmt
        .query_map(params![board_id], row_to_column)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

impl KanbanDb {
    /// All boards, newest first.
    pub fn list_boards(&self) -> StoreResult<Vec<Board>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT id, name, created_at FROM boards ORDER BY created_at DESC, id DESC")?;
        let boards = stmt
            .query_map([], row_to_board)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(boards)
    }

    pub fn get_board(&self, id: i64) -> StoreResult<Option<Board>> {
        let conn = self.conn();
        Ok(board_by_id(&conn, id)?)
    }

    /// Columns of a board ordered by position.
    pub fn get_columns(&self, board_id: i64) -> StoreResult<Vec<Column>> {
        let conn = self.conn();
        Ok(columns_in_board(&conn, board_id)?)
    }

    /// A board with every column and each column's tasks, all ordered by
    /// position. `None` if the board does not exist.
    pub fn get_board_data(&self, board_id: i64) -> StoreResult<Option<BoardWithColumns>> {
        let conn = self.conn();
        let Some(board) = board_by_id(&conn, board_id)? else {
            return Ok(None);
        };

        let mut columns = Vec::new();
        for column in columns_in_board(&conn, board_id)? {
            let tasks = tasks_in_column(&conn, column.id)?;
            columns.push(ColumnWithTasks { column, tasks });
        }

        Ok(Some(BoardWithColumns { board, columns }))
    }
}
