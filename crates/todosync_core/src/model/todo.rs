//! Todo item model and client-supplied id validation.
//!
//! # Invariants
//! - A todo id is unique within one user's collection.
//! - A new todo always starts with an empty value.
//! - Client-supplied ids are opaque tokens of 1..=128 URL-safe characters.

use crate::model::version::Version;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque identifier of one todo.
pub type TodoId = String;

/// Opaque identifier of the user owning a collection.
pub type UserId = String;

const TODO_ID_MAX_CHARS: usize = 128;

static TODO_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._:\-]+$").expect("valid todo id regex"));

/// One entry of a user's collection.
///
/// Serialized as a two-element `[id, value]` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "(TodoId, String)")]
pub struct Todo {
    pub id: TodoId,
    pub value: String,
}

impl Todo {
    pub fn new(id: impl Into<TodoId>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
        }
    }
}

impl From<Todo> for (TodoId, String) {
    fn from(todo: Todo) -> Self {
        (todo.id, todo.value)
    }
}

/// A collection paired with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodosSnapshot {
    pub version: Version,
    pub todos: Vec<Todo>,
}

/// Rejection reasons for client-supplied todo ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoValidationError {
    EmptyId,
    IdTooLong { chars: usize },
    /// The offending id is not echoed back: it may carry control characters.
    InvalidIdCharacters,
}

impl Display for TodoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "todo id cannot be empty"),
            Self::IdTooLong { chars } => write!(
                f,
                "todo id has {chars} characters; at most {TODO_ID_MAX_CHARS} are allowed"
            ),
            Self::InvalidIdCharacters => write!(f, "todo id contains unsupported characters"),
        }
    }
}

impl Error for TodoValidationError {}

/// Validates an id supplied by a client for a new todo.
pub fn validate_todo_id(id: &str) -> Result<(), TodoValidationError> {
    if id.is_empty() {
        return Err(TodoValidationError::EmptyId);
    }
    let chars = id.chars().count();
    if chars > TODO_ID_MAX_CHARS {
        return Err(TodoValidationError::IdTooLong { chars });
    }
    if !TODO_ID_RE.is_match(id) {
        return Err(TodoValidationError::InvalidIdCharacters);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_todo_id, Todo, TodoValidationError};

    #[test]
    fn uuid_and_short_ids_are_accepted() {
        validate_todo_id("x").unwrap();
        validate_todo_id("0b7c9a52-3f0e-4e8b-9a57-1f9e6c2d8a10").unwrap();
    }

    #[test]
    fn empty_long_and_odd_ids_are_rejected() {
        assert_eq!(validate_todo_id(""), Err(TodoValidationError::EmptyId));
        assert!(matches!(
            validate_todo_id(&"a".repeat(129)),
            Err(TodoValidationError::IdTooLong { chars: 129 })
        ));
        assert_eq!(
            validate_todo_id("has space"),
            Err(TodoValidationError::InvalidIdCharacters)
        );
        assert_eq!(
            validate_todo_id("x\nevent=forged"),
            Err(TodoValidationError::InvalidIdCharacters)
        );
    }

    #[test]
    fn todo_serializes_as_pair() {
        let json = serde_json::to_string(&Todo::new("a", "todo A")).unwrap();
        assert_eq!(json, r#"["a","todo A"]"#);
    }
}
