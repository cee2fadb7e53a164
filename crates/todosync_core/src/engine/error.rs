//! Engine error taxonomy.
//!
//! Version drift is not represented here: it is a regular outcome.

use crate::model::todo::{TodoId, TodoValidationError, UserId};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EngineResult<T> = Result<T, EngineError>;

/// Coarse classification used by the dispatch layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller sent something that can never succeed as-is.
    RequestInvalid,
    /// Store or consistency failure; details stay in the logs.
    Internal,
}

/// Errors from mutation engine operations.
#[derive(Debug)]
pub enum EngineError {
    /// User id handed in by the identity layer is empty.
    InvalidUserId,
    /// Client-supplied id for a new todo is malformed.
    InvalidTodoId(TodoValidationError),
    /// Fresh version but the referenced todo does not exist.
    TodoNotFound { todo_id: TodoId },
    /// Client-supplied id for a new todo is already in use.
    TodoIdTaken { todo_id: TodoId },
    /// No version row exists for the user.
    UnknownUser { user_id: UserId },
    /// A statement touched a number of rows the protocol does not allow.
    UnexpectedRowCount {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUserId
            | Self::InvalidTodoId(_)
            | Self::TodoNotFound { .. }
            | Self::TodoIdTaken { .. } => ErrorKind::RequestInvalid,
            Self::UnknownUser { .. } | Self::UnexpectedRowCount { .. } | Self::Repo(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Stable code for log lines.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidUserId => "invalid_user_id",
            Self::InvalidTodoId(_) => "invalid_todo_id",
            Self::TodoNotFound { .. } => "todo_not_found",
            Self::TodoIdTaken { .. } => "todo_id_taken",
            Self::UnknownUser { .. } => "unknown_user",
            Self::UnexpectedRowCount { .. } => "unexpected_row_count",
            Self::Repo(RepoError::Db(err)) if err.is_busy() => "db_busy",
            Self::Repo(RepoError::Db(_)) => "db_error",
            Self::Repo(RepoError::InvalidData(_)) => "invalid_data",
        }
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUserId => write!(f, "user id cannot be empty"),
            Self::InvalidTodoId(err) => write!(f, "{err}"),
            Self::TodoNotFound { todo_id } => write!(f, "todo not found: {todo_id}"),
            Self::TodoIdTaken { todo_id } => write!(f, "todo id already in use: {todo_id}"),
            Self::UnknownUser { user_id } => write!(f, "no version row for user: {user_id}"),
            Self::UnexpectedRowCount {
                operation,
                expected,
                actual,
            } => write!(
                f,
                "{operation} affected {actual} row(s); expected at most {expected}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidTodoId(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for EngineError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

impl From<TodoValidationError> for EngineError {
    fn from(value: TodoValidationError) -> Self {
        Self::InvalidTodoId(value)
    }
}
