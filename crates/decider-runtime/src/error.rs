use decider_types::payload::CodecError;
use thiserror::Error;

/// Errors raised by the decision runtime while replaying a turn. Never
/// recovered mid-turn; the worker loop logs and moves to the next poll.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// A failed or timed-out call's reason, as surfaced to user workflow code
/// through [`crate::outcome::Outcome::into_result`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TaskError(pub String);

/// What a user workflow body raises when it cannot (yet, or ever) produce a
/// result: either it genuinely failed, or a call it depends on has not
/// resolved and the turn must simply flush and wait for the next one.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowFault {
    #[error("workflow suspended pending unresolved calls")]
    Suspend,
    #[error("workflow failed: {0}")]
    Failed(String),
}

impl From<TaskError> for WorkflowFault {
    fn from(e: TaskError) -> Self {
        WorkflowFault::Failed(e.0)
    }
}

/// What a user workflow body function returns.
pub type WorkflowFaultResult = Result<serde_json::Value, WorkflowFault>;

/// Raised when paginated history fetching exceeds its retry budget; the
/// whole decision turn is abandoned. Safe to abandon: nothing has been sent
/// back to the service yet, so the next poll simply redelivers the same
/// decision task.
#[derive(Debug, Error)]
#[error("exhausted pagination retry budget after {attempts} attempts: {last_error}")]
pub struct PaginationError {
    pub attempts: u32,
    pub last_error: String,
}

/// Everything that can make a single decision task's processing abandoned
/// rather than completed: history fetching gave up, or the finished batch of
/// decisions couldn't be sent back. Either way the worker just logs and
/// returns to polling.
#[derive(Debug, Error)]
pub enum DecisionTurnError {
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error("failed to flush decisions: {0}")]
    Flush(#[source] crate::service::ServiceError),
}

/// Type registration failed: a mismatched field against an already-registered
/// remote type, or a hard transport failure.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("{type_name} v{version} is already registered remotely with a different {field}: local={local:?} remote={remote:?}")]
    FieldMismatch {
        type_name: String,
        version: String,
        field: &'static str,
        local: Option<String>,
        remote: Option<String>,
    },
    #[error("registering {type_name} v{version} failed: {source}")]
    Transport {
        type_name: String,
        version: String,
        #[source]
        source: crate::service::ServiceError,
    },
}
