//! Version store: one counter row per user.
//!
//! # Invariants
//! - A user row is created at version 0 and never deleted here.
//! - Writes are compare-and-set against the version read in the same
//!   transaction.

use crate::model::version::Version;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Repository interface for per-user version counters.
pub trait VersionRepository {
    /// Creates the counter row at version 0. Returns `false` if it exists.
    fn provision_user(&self, user_id: &str) -> RepoResult<bool>;
    /// Reads the current version, `None` when the user is unknown.
    fn read_version(&self, user_id: &str) -> RepoResult<Option<Version>>;
    /// Replaces `expected` with `next`; returns the affected row count.
    fn store_version(&self, user_id: &str, expected: Version, next: Version) -> RepoResult<usize>;
}

/// SQLite-backed version repository.
pub struct SqliteVersionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVersionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl VersionRepository for SqliteVersionRepository<'_> {
    fn provision_user(&self, user_id: &str) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "INSERT INTO users (user_id, version)
             VALUES (?1, ?2)
             ON CONFLICT (user_id) DO NOTHING;",
            params![user_id, Version::INITIAL.get()],
        )?;
        Ok(changed == 1)
    }

    fn read_version(&self, user_id: &str) -> RepoResult<Option<Version>> {
        let raw: Option<i64> = self
            .conn
            .query_row(
                "SELECT version FROM users WHERE user_id = ?1;",
                [user_id],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|value| parse_version(value, user_id)).transpose()
    }

    fn store_version(&self, user_id: &str, expected: Version, next: Version) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE users
             SET version = ?3
             WHERE user_id = ?1
               AND version = ?2;",
            params![user_id, expected.get(), next.get()],
        )?;
        Ok(changed)
    }
}

fn parse_version(value: i64, user_id: &str) -> RepoResult<Version> {
    let version = i32::try_from(value).map_err(|_| {
        RepoError::InvalidData(format!(
            "version `{value}` of user `{user_id}` does not fit in i32"
        ))
    })?;
    if version < 0 {
        return Err(RepoError::InvalidData(format!(
            "negative version `{version}` for user `{user_id}`"
        )));
    }
    Ok(Version::new(version))
}

