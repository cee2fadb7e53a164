//! Per-user todo lists with an optimistic-concurrency mutation protocol.
//! This crate is the single source of truth for version and collection
//! invariants; transport and identity live outside it.

pub mod api;
pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;

pub use api::{dispatch, dispatch_json, ApiRequest, ApiResponse, ResponseBody};
pub use engine::{
    AppendOutcome, EngineError, EngineOptions, EngineResult, ErrorKind, IdGenerator, Mutation,
    MutationEngine, MutationOutcome, ProvisionOutcome, RefreshOutcome, StaleWritePolicy,
    UuidIdGenerator,
};
pub use logging::{default_log_level, init_logging, logging_status, LogSettings, LogTarget};
pub use model::todo::{validate_todo_id, Todo, TodoId, TodoValidationError, TodosSnapshot, UserId};
pub use model::version::Version;
pub use repo::todo_repo::{SqliteTodoRepository, TodoRepository};
pub use repo::version_repo::{SqliteVersionRepository, VersionRepository};
pub use repo::{RepoError, RepoResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
