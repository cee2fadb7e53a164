//! Tagged JSON request dispatch.
//!
//! # Responsibility
//! - Decode one request body into a closed set of operations keyed by the
//!   `operation` field.
//! - Invoke exactly one engine operation and map its outcome to a status
//!   code and response body.
//!
//! # Invariants
//! - Unknown operations and malformed bodies are rejected with 400, never
//!   guessed at.
//! - Version mismatch is a 200; callers tell it apart from success by the
//!   presence of `todos`.
//! - Internal failures never leak store error text into the body.

use crate::engine::{
    AppendOutcome, EngineError, ErrorKind, IdGenerator, MutationEngine, MutationOutcome,
    RefreshOutcome,
};
use crate::model::todo::{TodoId, TodosSnapshot};
use crate::model::version::Version;
use log::warn;
use serde::{Deserialize, Serialize};

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

const MALFORMED_REQUEST_MESSAGE: &str = "malformed request";
const INTERNAL_ERROR_MESSAGE: &str = "internal error";

/// One decoded client request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum ApiRequest {
    #[serde(alias = "get")]
    GetTodos,
    #[serde(alias = "refresh")]
    RefreshTodos { version: Version },
    #[serde(alias = "delete")]
    DeleteTodo {
        version: Version,
        #[serde(alias = "key")]
        id: TodoId,
    },
    #[serde(alias = "update")]
    UpdateTodo {
        version: Version,
        #[serde(alias = "key")]
        id: TodoId,
        value: String,
    },
    #[serde(alias = "append")]
    AppendTodo {
        version: Version,
        #[serde(default, alias = "key")]
        id: Option<TodoId>,
    },
}

impl ApiRequest {
    /// Decodes a request body; unknown `operation` values are errors.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

/// Response payloads, told apart by which fields are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    /// `{version, todos}`: full state, for get, refresh and mismatches.
    Todos(TodosSnapshot),
    /// `{version, id}`: append success.
    Appended { version: Version, id: TodoId },
    /// `{version}`: delete/update success.
    Mutated { version: Version },
    /// `{error}`: generic failure description.
    Error { error: String },
}

/// Status code plus optional body, ready for the transport to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    /// `None` means an empty body (refresh when already up to date).
    pub body: Option<ResponseBody>,
}

impl ApiResponse {
    fn ok(body: ResponseBody) -> Self {
        Self {
            status: STATUS_OK,
            body: Some(body),
        }
    }

    fn empty() -> Self {
        Self {
            status: STATUS_OK,
            body: None,
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: Some(ResponseBody::Error {
                error: message.into(),
            }),
        }
    }

    /// Serializes the body, `None` when it is empty.
    pub fn body_json(&self) -> Result<Option<String>, serde_json::Error> {
        self.body.as_ref().map(serde_json::to_string).transpose()
    }
}

/// Decodes `body` and runs it for `user_id`.
pub fn dispatch_json<G: IdGenerator>(
    engine: &MutationEngine<'_, G>,
    user_id: &str,
    body: &str,
) -> ApiResponse {
    match ApiRequest::from_json(body) {
        Ok(request) => dispatch(engine, user_id, &request),
        Err(err) => {
            warn!(
                "event=request_decode module=api status=rejected user_id={user_id} error_code=malformed_request error={err}"
            );
            ApiResponse::error(STATUS_BAD_REQUEST, MALFORMED_REQUEST_MESSAGE)
        }
    }
}

/// Runs one decoded request for `user_id`.
pub fn dispatch<G: IdGenerator>(
    engine: &MutationEngine<'_, G>,
    user_id: &str,
    request: &ApiRequest,
) -> ApiResponse {
    let result = match request {
        ApiRequest::GetTodos => engine
            .get(user_id)
            .map(|snapshot| ApiResponse::ok(ResponseBody::Todos(snapshot))),
        ApiRequest::RefreshTodos { version } => engine
            .refresh(user_id, *version)
            .map(|outcome| match outcome {
                RefreshOutcome::UpToDate => ApiResponse::empty(),
                RefreshOutcome::Changed(snapshot) => ApiResponse::ok(ResponseBody::Todos(snapshot)),
            }),
        ApiRequest::DeleteTodo { version, id } => engine
            .delete(user_id, *version, id)
            .map(mutation_response),
        ApiRequest::UpdateTodo { version, id, value } => engine
            .update(user_id, *version, id, value)
            .map(mutation_response),
        ApiRequest::AppendTodo { version, id } => engine
            .append(user_id, *version, id.as_deref())
            .map(|outcome| match outcome {
                AppendOutcome::Appended { version, id } => {
                    ApiResponse::ok(ResponseBody::Appended { version, id })
                }
                AppendOutcome::VersionMismatch(snapshot) => {
                    ApiResponse::ok(ResponseBody::Todos(snapshot))
                }
            }),
    };

    result.unwrap_or_else(|err| error_response(&err))
}

fn mutation_response(outcome: MutationOutcome) -> ApiResponse {
    match outcome {
        MutationOutcome::Applied { version } => ApiResponse::ok(ResponseBody::Mutated { version }),
        MutationOutcome::VersionMismatch(snapshot) => ApiResponse::ok(ResponseBody::Todos(snapshot)),
    }
}

fn error_response(err: &EngineError) -> ApiResponse {
    match err.kind() {
        ErrorKind::RequestInvalid => ApiResponse::error(STATUS_BAD_REQUEST, err.to_string()),
        ErrorKind::Internal => ApiResponse::error(STATUS_INTERNAL_ERROR, INTERNAL_ERROR_MESSAGE),
    }
}
