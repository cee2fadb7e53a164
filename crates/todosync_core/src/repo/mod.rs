//! Repository layer: version store and collection store.
//!
//! # Responsibility
//! - Keep SQL details out of the mutation engine.
//! - Report affected-row counts verbatim so the engine decides what a
//!   missing row means.
//!
//! # Invariants
//! - Repositories never open or commit transactions; they run on whatever
//!   connection or transaction the caller hands them.
//! - Every query is scoped by user id.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod todo_repo;
pub mod version_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for version and collection persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
