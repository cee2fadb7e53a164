//! Closed set of in-place mutations on an existing todo.

use crate::repo::todo_repo::TodoRepository;
use crate::repo::RepoResult;

/// A delete or update addressed to one existing todo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation<'a> {
    Delete { todo_id: &'a str },
    Update { todo_id: &'a str, value: &'a str },
}

impl<'a> Mutation<'a> {
    pub fn todo_id(&self) -> &'a str {
        match *self {
            Self::Delete { todo_id } | Self::Update { todo_id, .. } => todo_id,
        }
    }

    /// Log event name of the request this mutation serves.
    pub fn event(&self) -> &'static str {
        match self {
            Self::Delete { .. } => "todo_delete",
            Self::Update { .. } => "todo_update",
        }
    }

    /// Applies the mutation and returns the number of rows it touched.
    pub fn apply(&self, repo: &impl TodoRepository, user_id: &str) -> RepoResult<usize> {
        match *self {
            Self::Delete { todo_id } => repo.delete_todo(user_id, todo_id),
            Self::Update { todo_id, value } => repo.update_todo_value(user_id, todo_id, value),
        }
    }
}
