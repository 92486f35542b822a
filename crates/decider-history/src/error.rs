use thiserror::Error;

/// Errors produced while folding a history event stream into a [`crate::Snapshot`].
/// Every variant names a malformed reference a well-behaved service never
/// sends; these only fire against a fabricated or corrupted event stream.
#[derive(Debug, Error)]
pub enum FoldError {
    #[error("activity id {0:?} is not a valid call id")]
    MalformedActivityId(String),

    #[error("workflow id {0:?} has no parseable call-id suffix")]
    MalformedChildWorkflowId(String),

    #[error("timer id {0:?} is not a valid timer key")]
    MalformedTimerId(String),

    #[error("completion event references unknown scheduledEventId {0}")]
    UnknownScheduledEventId(u64),
}
