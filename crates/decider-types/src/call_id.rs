//! Deterministic call identifiers.
//!
//! A [`CallId`] names the k-th logical call a workflow body makes, in source
//! order. It is assigned once by the decision runtime's call cursor and never
//! changes across replays of the same history, which is what lets the
//! runtime look an in-flight or completed call back up on the next turn.

use std::fmt;
use std::str::FromStr;

/// A deterministic, monotonically assigned non-negative call identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallId(pub u64);

impl CallId {
    pub fn new(id: u64) -> Self {
        CallId(id)
    }

    /// The mangled form used while a timer for this call is outstanding, so
    /// a pending-timer marker never collides with the call it is delaying.
    pub fn timer_key(self) -> String {
        format!("{}:t", self.0)
    }

    /// The mangled `workflowId` suffix form used when starting a child
    /// workflow: a random prefix keeps the service-visible id globally
    /// unique, while the suffix recovers this call-id on replay.
    pub fn child_workflow_id(self, random_prefix: &str) -> String {
        format!("{random_prefix}:{}", self.0)
    }

    /// Recover a [`CallId`] from a child `workflowId`'s suffix (the text
    /// after the last `:`).
    pub fn from_child_workflow_id(workflow_id: &str) -> Option<Self> {
        let suffix = workflow_id.rsplit(':').next()?;
        suffix.parse().ok().map(CallId)
    }

    /// Recover a [`CallId`] from a timer key of the form `"<id>:t"`.
    pub fn from_timer_key(timer_key: &str) -> Option<Self> {
        let id = timer_key.strip_suffix(":t")?;
        id.parse().ok().map(CallId)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CallId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(CallId)
    }
}

impl From<u64> for CallId {
    fn from(value: u64) -> Self {
        CallId(value)
    }
}
