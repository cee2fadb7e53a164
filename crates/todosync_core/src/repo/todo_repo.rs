//! Collection store: per-user todos in creation order.
//!
//! # Invariants
//! - Enumeration is ordered by `seq ASC` (creation order).
//! - Inserting an id that already exists for the user changes nothing and
//!   reports zero affected rows.
//! - Update and delete never create rows.

use crate::model::todo::Todo;
use crate::repo::RepoResult;
use rusqlite::{params, Connection};

/// Repository interface for one user's todo collection.
pub trait TodoRepository {
    /// Lists todos in creation order.
    fn list_todos(&self, user_id: &str) -> RepoResult<Vec<Todo>>;
    /// Inserts an empty todo; returns the affected row count (0 on collision).
    fn insert_todo(&self, user_id: &str, todo_id: &str) -> RepoResult<usize>;
    /// Replaces one todo value; returns the affected row count.
    fn update_todo_value(&self, user_id: &str, todo_id: &str, value: &str) -> RepoResult<usize>;
    /// Removes one todo; returns the affected row count.
    fn delete_todo(&self, user_id: &str, todo_id: &str) -> RepoResult<usize>;
}

/// SQLite-backed todo repository.
pub struct SqliteTodoRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTodoRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TodoRepository for SqliteTodoRepository<'_> {
    fn list_todos(&self, user_id: &str) -> RepoResult<Vec<Todo>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT todo_id, value
             FROM todos
             WHERE user_id = ?1
             ORDER BY seq ASC;",
        )?;
        let mut rows = stmt.query([user_id])?;
        let mut todos = Vec::new();
        while let Some(row) = rows.next()? {
            todos.push(Todo {
                id: row.get("todo_id")?,
                value: row.get("value")?,
            });
        }
        Ok(todos)
    }

    fn insert_todo(&self, user_id: &str, todo_id: &str) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "INSERT INTO todos (user_id, todo_id, value)
             VALUES (?1, ?2, '')
             ON CONFLICT (user_id, todo_id) DO NOTHING;",
            params![user_id, todo_id],
        )?;
        Ok(changed)
    }

    fn update_todo_value(&self, user_id: &str, todo_id: &str, value: &str) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE todos
             SET value = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE user_id = ?1
               AND todo_id = ?2;",
            params![user_id, todo_id, value],
        )?;
        Ok(changed)
    }

    fn delete_todo(&self, user_id: &str, todo_id: &str) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "DELETE FROM todos
             WHERE user_id = ?1
               AND todo_id = ?2;",
            params![user_id, todo_id],
        )?;
        Ok(changed)
    }
}
