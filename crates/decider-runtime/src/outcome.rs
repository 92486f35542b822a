//! Ordered call results and the combinators that fold them together: a
//! tagged sum type standing in for the suspend-or-resolve branch a proxy
//! call can take, instead of unwinding the stack to signal it.

use crate::error::{TaskError, WorkflowFault};

/// The three ways a call can resolve.
#[derive(Clone, Debug, PartialEq)]
pub enum CallOutcome {
    Value(serde_json::Value),
    Err(String),
    Timeout,
}

/// A resolved call, tagged with its position in the history's completion
/// order so combinators can pick the earliest-resolved among several.
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    pub order: usize,
    pub outcome: CallOutcome,
}

impl Outcome {
    /// Access the resolved value, or surface the failure/timeout reason as a
    /// [`TaskError`].
    pub fn into_result(self) -> Result<serde_json::Value, TaskError> {
        match self.outcome {
            CallOutcome::Value(v) => Ok(v),
            CallOutcome::Err(reason) => Err(TaskError(reason)),
            CallOutcome::Timeout => Err(TaskError("call timed out".to_string())),
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self.outcome, CallOutcome::Value(_))
    }

    pub fn is_err(&self) -> bool {
        matches!(self.outcome, CallOutcome::Err(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.outcome, CallOutcome::Timeout)
    }
}

/// What a proxy call returns: either it is already resolved, or the workflow
/// must suspend (flush and wait for the next decision task) to find out.
#[derive(Clone, Debug, PartialEq)]
pub enum CallStatus {
    Resolved(Outcome),
    Suspend,
}

/// Block on a single call: propagate [`WorkflowFault::Suspend`] via `?` if it
/// hasn't resolved yet, otherwise hand back the outcome for the caller to
/// unwrap with [`Outcome::into_result`].
pub fn wait_for(status: CallStatus) -> Result<Outcome, WorkflowFault> {
    match status {
        CallStatus::Resolved(outcome) => Ok(outcome),
        CallStatus::Suspend => Err(WorkflowFault::Suspend),
    }
}

/// The earliest-resolved of a set of calls; suspends unless at least one has
/// resolved.
pub fn first(statuses: Vec<CallStatus>) -> Result<Outcome, WorkflowFault> {
    let mut resolved = resolved_only(statuses);
    resolved.sort_by_key(|o| o.order);
    resolved.into_iter().next().ok_or(WorkflowFault::Suspend)
}

/// The `n` earliest-resolved of a set of calls, in resolution order;
/// suspends unless at least `n` have resolved.
pub fn first_n(n: usize, statuses: Vec<CallStatus>) -> Result<Vec<Outcome>, WorkflowFault> {
    let mut resolved = resolved_only(statuses);
    if resolved.len() < n {
        return Err(WorkflowFault::Suspend);
    }
    resolved.sort_by_key(|o| o.order);
    resolved.truncate(n);
    Ok(resolved)
}

/// Every call in a set, in resolution order; suspends until all have
/// resolved.
pub fn all(statuses: Vec<CallStatus>) -> Result<Vec<Outcome>, WorkflowFault> {
    let total = statuses.len();
    first_n(total, statuses)
}

fn resolved_only(statuses: Vec<CallStatus>) -> Vec<Outcome> {
    statuses
        .into_iter()
        .filter_map(|s| match s {
            CallStatus::Resolved(o) => Some(o),
            CallStatus::Suspend => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(order: usize, value: i64) -> CallStatus {
        CallStatus::Resolved(Outcome {
            order,
            outcome: CallOutcome::Value(serde_json::json!(value)),
        })
    }

    #[test]
    fn wait_for_propagates_suspend() {
        assert_eq!(wait_for(CallStatus::Suspend), Err(WorkflowFault::Suspend));
    }

    #[test]
    fn wait_for_returns_resolved_outcome() {
        let out = wait_for(resolved(0, 1)).unwrap();
        assert_eq!(out.into_result().unwrap(), serde_json::json!(1));
    }

    #[test]
    fn first_picks_earliest_order_not_insertion_order() {
        let statuses = vec![resolved(5, 10), resolved(1, 20), CallStatus::Suspend];
        let out = first(statuses).unwrap();
        assert_eq!(out.into_result().unwrap(), serde_json::json!(20));
    }

    #[test]
    fn first_suspends_if_nothing_resolved() {
        let statuses = vec![CallStatus::Suspend, CallStatus::Suspend];
        assert_eq!(first(statuses), Err(WorkflowFault::Suspend));
    }

    #[test]
    fn first_n_requires_at_least_n_resolved() {
        let statuses = vec![resolved(0, 1), CallStatus::Suspend];
        assert_eq!(first_n(2, statuses), Err(WorkflowFault::Suspend));
    }

    #[test]
    fn all_requires_every_call_resolved() {
        let statuses = vec![resolved(0, 1), resolved(1, 2)];
        let out = all(statuses).unwrap();
        assert_eq!(out.len(), 2);

        let statuses = vec![resolved(0, 1), CallStatus::Suspend];
        assert_eq!(all(statuses), Err(WorkflowFault::Suspend));
    }

    #[test]
    fn errored_outcome_unwraps_to_task_error() {
        let out = Outcome {
            order: 0,
            outcome: CallOutcome::Err("boom".to_string()),
        };
        assert_eq!(out.into_result().unwrap_err(), TaskError("boom".to_string()));
    }
}
