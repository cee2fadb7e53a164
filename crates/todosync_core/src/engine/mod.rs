//! Optimistic-concurrency mutation engine.
//!
//! # Responsibility
//! - Run every request as exactly one SQLite transaction over the version
//!   store and the collection store.
//! - Compare the client's version with the stored one and decide whether to
//!   apply, reject, or apply while reporting drift.
//!
//! # Invariants
//! - The version changes iff a collection mutation commits, in the same
//!   transaction, by exactly one step (wrapping `i32::MAX` to `0`).
//! - Read-write requests take the write lock at `BEGIN IMMEDIATE`, so the
//!   version read and the version bump cannot interleave with another
//!   writer.
//! - Every early return drops an uncommitted transaction, which rolls it
//!   back.
//! - Store failures are never retried here.

pub mod error;
pub mod ids;
pub mod mutation;

pub use error::{EngineError, EngineResult, ErrorKind};
pub use ids::{IdGenerator, UuidIdGenerator};
pub use mutation::Mutation;

use crate::model::todo::{validate_todo_id, TodoId, TodosSnapshot};
use crate::model::version::Version;
use crate::repo::todo_repo::{SqliteTodoRepository, TodoRepository};
use crate::repo::version_repo::{SqliteVersionRepository, VersionRepository};
use log::{debug, error, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Instant;

/// What to do with a delete/update whose version is stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StaleWritePolicy {
    /// Leave data untouched and hand the current state back.
    #[default]
    RejectStale,
    /// Apply the mutation if its target still exists, then hand the
    /// resulting state back in the mismatch shape.
    ApplyAndReport,
}

/// Engine tuning knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    pub stale_write_policy: StaleWritePolicy,
}

/// Result of a delete or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Version matched and the mutation committed.
    Applied { version: Version },
    /// Version was stale; carries the state the client must reconcile with.
    VersionMismatch(TodosSnapshot),
}

/// Result of an append. The todo is inserted in both cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended { version: Version, id: TodoId },
    VersionMismatch(TodosSnapshot),
}

/// Result of a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    UpToDate,
    Changed(TodosSnapshot),
}

/// Result of provisioning a user's version row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Created,
    AlreadyExists,
}

/// Mutation engine bound to one connection.
///
/// Connections are per worker; the engine itself holds no shared state.
pub struct MutationEngine<'conn, G: IdGenerator = UuidIdGenerator> {
    conn: &'conn Connection,
    ids: G,
    options: EngineOptions,
}

impl<'conn> MutationEngine<'conn> {
    /// Creates an engine with UUID ids and default options.
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_parts(conn, UuidIdGenerator, EngineOptions::default())
    }
}

impl<'conn, G: IdGenerator> MutationEngine<'conn, G> {
    pub fn with_parts(conn: &'conn Connection, ids: G, options: EngineOptions) -> Self {
        Self { conn, ids, options }
    }

    /// Creates the version row for a new user at version 0.
    pub fn provision_user(&self, user_id: &str) -> EngineResult<ProvisionOutcome> {
        let started_at = Instant::now();
        let result = self.provision_user_inner(user_id);
        log_result("user_provision", user_id, None, started_at, &result);
        result
    }

    /// Returns the full collection with its version.
    pub fn get(&self, user_id: &str) -> EngineResult<TodosSnapshot> {
        let started_at = Instant::now();
        let result = self.get_inner(user_id);
        log_result("todos_get", user_id, None, started_at, &result);
        result
    }

    /// Returns the collection only when `request_version` is stale.
    pub fn refresh(&self, user_id: &str, request_version: Version) -> EngineResult<RefreshOutcome> {
        let started_at = Instant::now();
        let result = self.refresh_inner(user_id, request_version);
        log_result("todos_refresh", user_id, None, started_at, &result);
        result
    }

    /// Deletes one todo if the client's view is current.
    pub fn delete(
        &self,
        user_id: &str,
        request_version: Version,
        todo_id: &str,
    ) -> EngineResult<MutationOutcome> {
        self.mutate(user_id, request_version, Mutation::Delete { todo_id })
    }

    /// Replaces one todo value if the client's view is current.
    pub fn update(
        &self,
        user_id: &str,
        request_version: Version,
        todo_id: &str,
        value: &str,
    ) -> EngineResult<MutationOutcome> {
        self.mutate(user_id, request_version, Mutation::Update { todo_id, value })
    }

    /// Appends an empty todo regardless of `request_version`.
    ///
    /// `todo_id` is the client's id for the new todo; `None` lets the engine
    /// generate one.
    pub fn append(
        &self,
        user_id: &str,
        request_version: Version,
        todo_id: Option<&str>,
    ) -> EngineResult<AppendOutcome> {
        let started_at = Instant::now();
        let result = self.append_inner(user_id, request_version, todo_id);
        let logged_id = match &result {
            Ok(AppendOutcome::Appended { id, .. }) => Some(id.as_str()),
            _ => todo_id.map(loggable_todo_id),
        };
        log_result("todo_append", user_id, logged_id, started_at, &result);
        result
    }

    /// Runs a delete or update under the configured stale-write policy.
    pub fn mutate(
        &self,
        user_id: &str,
        request_version: Version,
        mutation: Mutation<'_>,
    ) -> EngineResult<MutationOutcome> {
        let started_at = Instant::now();
        let result = self.mutate_inner(user_id, request_version, mutation);
        log_result(
            mutation.event(),
            user_id,
            Some(loggable_todo_id(mutation.todo_id())),
            started_at,
            &result,
        );
        result
    }

    fn provision_user_inner(&self, user_id: &str) -> EngineResult<ProvisionOutcome> {
        ensure_user_id(user_id)?;
        let tx = self.begin(TransactionBehavior::Immediate)?;
        let created = SqliteVersionRepository::new(&tx).provision_user(user_id)?;
        tx.commit()?;
        Ok(if created {
            ProvisionOutcome::Created
        } else {
            ProvisionOutcome::AlreadyExists
        })
    }

    fn get_inner(&self, user_id: &str) -> EngineResult<TodosSnapshot> {
        ensure_user_id(user_id)?;
        let tx = self.begin(TransactionBehavior::Deferred)?;
        let version = current_version(&SqliteVersionRepository::new(&tx), user_id)?;
        let snapshot = snapshot_at(&SqliteTodoRepository::new(&tx), user_id, version)?;
        tx.commit()?;
        Ok(snapshot)
    }

    fn refresh_inner(&self, user_id: &str, request_version: Version) -> EngineResult<RefreshOutcome> {
        ensure_user_id(user_id)?;
        let tx = self.begin(TransactionBehavior::Deferred)?;
        let version = current_version(&SqliteVersionRepository::new(&tx), user_id)?;
        if version == request_version {
            tx.commit()?;
            return Ok(RefreshOutcome::UpToDate);
        }
        let snapshot = snapshot_at(&SqliteTodoRepository::new(&tx), user_id, version)?;
        tx.commit()?;
        Ok(RefreshOutcome::Changed(snapshot))
    }

    fn mutate_inner(
        &self,
        user_id: &str,
        request_version: Version,
        mutation: Mutation<'_>,
    ) -> EngineResult<MutationOutcome> {
        ensure_user_id(user_id)?;
        let tx = self.begin(TransactionBehavior::Immediate)?;
        let versions = SqliteVersionRepository::new(&tx);
        let todos = SqliteTodoRepository::new(&tx);
        let current = current_version(&versions, user_id)?;
        // A malformed id can never name a stored todo.
        let well_formed = validate_todo_id(mutation.todo_id());

        if request_version != current {
            let version = match self.options.stale_write_policy {
                StaleWritePolicy::RejectStale => current,
                StaleWritePolicy::ApplyAndReport if well_formed.is_err() => current,
                StaleWritePolicy::ApplyAndReport => match mutation.apply(&todos, user_id)? {
                    0 => current,
                    1 => bump_version(&versions, user_id, current)?,
                    actual => return Err(unexpected_rows(mutation.event(), actual)),
                },
            };
            let snapshot = snapshot_at(&todos, user_id, version)?;
            tx.commit()?;
            return Ok(MutationOutcome::VersionMismatch(snapshot));
        }

        well_formed?;
        match mutation.apply(&todos, user_id)? {
            0 => Err(EngineError::TodoNotFound {
                todo_id: mutation.todo_id().to_string(),
            }),
            1 => {
                let version = bump_version(&versions, user_id, current)?;
                tx.commit()?;
                Ok(MutationOutcome::Applied { version })
            }
            actual => Err(unexpected_rows(mutation.event(), actual)),
        }
    }

    fn append_inner(
        &self,
        user_id: &str,
        request_version: Version,
        todo_id: Option<&str>,
    ) -> EngineResult<AppendOutcome> {
        ensure_user_id(user_id)?;
        if let Some(todo_id) = todo_id {
            validate_todo_id(todo_id)?;
        }

        let tx = self.begin(TransactionBehavior::Immediate)?;
        let versions = SqliteVersionRepository::new(&tx);
        let todos = SqliteTodoRepository::new(&tx);
        let previous = current_version(&versions, user_id)?;

        let id = match todo_id {
            Some(todo_id) => todo_id.to_string(),
            None => self.ids.next_id(),
        };
        match todos.insert_todo(user_id, &id)? {
            1 => {}
            0 if todo_id.is_some() => return Err(EngineError::TodoIdTaken { todo_id: id }),
            actual => return Err(unexpected_rows("todo_append", actual)),
        }

        let version = bump_version(&versions, user_id, previous)?;
        if request_version == previous {
            tx.commit()?;
            return Ok(AppendOutcome::Appended { version, id });
        }

        let snapshot = snapshot_at(&todos, user_id, version)?;
        tx.commit()?;
        Ok(AppendOutcome::VersionMismatch(snapshot))
    }

    fn begin(&self, behavior: TransactionBehavior) -> EngineResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(self.conn, behavior)?)
    }
}

fn ensure_user_id(user_id: &str) -> EngineResult<()> {
    if user_id.is_empty() {
        return Err(EngineError::InvalidUserId);
    }
    Ok(())
}

fn current_version(repo: &impl VersionRepository, user_id: &str) -> EngineResult<Version> {
    repo.read_version(user_id)?
        .ok_or_else(|| EngineError::UnknownUser {
            user_id: user_id.to_string(),
        })
}

fn bump_version(
    repo: &impl VersionRepository,
    user_id: &str,
    current: Version,
) -> EngineResult<Version> {
    let next = current.next();
    match repo.store_version(user_id, current, next)? {
        1 => Ok(next),
        actual => Err(EngineError::UnexpectedRowCount {
            operation: "version_bump",
            expected: 1,
            actual,
        }),
    }
}

fn snapshot_at(
    repo: &impl TodoRepository,
    user_id: &str,
    version: Version,
) -> EngineResult<TodosSnapshot> {
    Ok(TodosSnapshot {
        version,
        todos: repo.list_todos(user_id)?,
    })
}

fn unexpected_rows(operation: &'static str, actual: usize) -> EngineError {
    EngineError::UnexpectedRowCount {
        operation,
        expected: 1,
        actual,
    }
}

/// Client ids reach log lines only when they pass validation.
fn loggable_todo_id(todo_id: &str) -> &str {
    match validate_todo_id(todo_id) {
        Ok(()) => todo_id,
        Err(_) => "<invalid>",
    }
}

/// Short status label and resulting version for log lines.
trait LoggedOutcome {
    fn status(&self) -> &'static str;
    fn version(&self) -> Option<Version>;
}

impl LoggedOutcome for ProvisionOutcome {
    fn status(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AlreadyExists => "already_exists",
        }
    }

    fn version(&self) -> Option<Version> {
        None
    }
}

impl LoggedOutcome for TodosSnapshot {
    fn status(&self) -> &'static str {
        "ok"
    }

    fn version(&self) -> Option<Version> {
        Some(self.version)
    }
}

impl LoggedOutcome for RefreshOutcome {
    fn status(&self) -> &'static str {
        match self {
            Self::UpToDate => "up_to_date",
            Self::Changed(_) => "changed",
        }
    }

    fn version(&self) -> Option<Version> {
        match self {
            Self::UpToDate => None,
            Self::Changed(snapshot) => Some(snapshot.version),
        }
    }
}

impl LoggedOutcome for MutationOutcome {
    fn status(&self) -> &'static str {
        match self {
            Self::Applied { .. } => "ok",
            Self::VersionMismatch(_) => "version_mismatch",
        }
    }

    fn version(&self) -> Option<Version> {
        match self {
            Self::Applied { version } => Some(*version),
            Self::VersionMismatch(snapshot) => Some(snapshot.version),
        }
    }
}

impl LoggedOutcome for AppendOutcome {
    fn status(&self) -> &'static str {
        match self {
            Self::Appended { .. } => "ok",
            Self::VersionMismatch(_) => "version_mismatch",
        }
    }

    fn version(&self) -> Option<Version> {
        match self {
            Self::Appended { version, .. } => Some(*version),
            Self::VersionMismatch(snapshot) => Some(snapshot.version),
        }
    }
}

fn log_result<T: LoggedOutcome>(
    event: &'static str,
    user_id: &str,
    todo_id: Option<&str>,
    started_at: Instant,
    result: &EngineResult<T>,
) {
    let duration_ms = started_at.elapsed().as_millis();
    let todo_id = todo_id.unwrap_or("-");
    match result {
        Ok(outcome) => {
            let version = outcome
                .version()
                .map_or_else(|| "-".to_string(), |version| version.to_string());
            if event == "todos_get" || event == "todos_refresh" {
                debug!(
                    "event={event} module=engine status={} user_id={user_id} version={version} duration_ms={duration_ms}",
                    outcome.status()
                );
            } else {
                info!(
                    "event={event} module=engine status={} user_id={user_id} todo_id={todo_id} version={version} duration_ms={duration_ms}",
                    outcome.status()
                );
            }
        }
        Err(err) => match err.kind() {
            ErrorKind::RequestInvalid => warn!(
                "event={event} module=engine status=rejected user_id={user_id} todo_id={todo_id} duration_ms={duration_ms} error_code={} error={err}",
                err.error_code()
            ),
            ErrorKind::Internal => error!(
                "event={event} module=engine status=error user_id={user_id} todo_id={todo_id} duration_ms={duration_ms} error_code={} error={err}",
                err.error_code()
            ),
        },
    }
}
