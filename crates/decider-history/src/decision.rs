//! The decision buffer: a single-writer, at-most-once-flush batch of
//! scheduling/terminal decisions emitted as the response to one decision task.

use decider_types::{CallId, ChildPolicy, Payload};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    StartTimer {
        call_id: CallId,
        start_to_fire_timeout: Duration,
    },
    ScheduleActivityTask {
        call_id: CallId,
        name: String,
        version: String,
        task_list: Option<String>,
        input: Payload,
        heartbeat_timeout: Option<Duration>,
        schedule_to_close_timeout: Option<Duration>,
        schedule_to_start_timeout: Option<Duration>,
        start_to_close_timeout: Option<Duration>,
    },
    StartChildWorkflowExecution {
        call_id: CallId,
        /// The deterministic call id mangled with the decision turn's fresh
        /// random token, i.e. `call_id.child_workflow_id(random_token)`. This
        /// is the `workflowId` a `WorkflowService` implementation should send
        /// over the wire; it round-trips back to `call_id` on replay via
        /// [`CallId::from_child_workflow_id`].
        workflow_id: String,
        name: String,
        version: String,
        task_list: Option<String>,
        input: Payload,
        child_policy: Option<ChildPolicy>,
        tags: Vec<String>,
    },
    CompleteWorkflowExecution {
        result: Payload,
    },
    FailWorkflowExecution {
        reason: String,
    },
    ContinueAsNewWorkflowExecution {
        input: Payload,
    },
}

impl Decision {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Decision::CompleteWorkflowExecution { .. }
                | Decision::FailWorkflowExecution { .. }
                | Decision::ContinueAsNewWorkflowExecution { .. }
        )
    }
}

/// Accumulates decisions for one decision turn. `rate_budget` caps how many
/// *scheduling* decisions (timer/activity/child) are accepted; over-budget
/// calls are dropped silently rather than rejected, since the call-id is
/// deterministic and will be re-emitted next turn.
#[derive(Debug, Default)]
pub struct DecisionBuffer {
    decisions: Vec<Decision>,
    rate_budget: usize,
    /// No further scheduling or terminal decisions are accepted once set.
    closed: bool,
    /// `flush()` has already taken the decisions out once.
    taken: bool,
}

impl DecisionBuffer {
    pub fn new(rate_budget: usize) -> Self {
        DecisionBuffer {
            decisions: Vec::new(),
            rate_budget,
            closed: false,
            taken: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    /// Try to append a scheduling decision. Returns `false` if the buffer is
    /// closed or the rate budget is already spent; the caller must not treat
    /// that as an error.
    fn push_scheduling(&mut self, decision: Decision) -> bool {
        if self.closed {
            return false;
        }
        if self.decisions.len() >= self.rate_budget {
            tracing::warn!(
                rate_budget = self.rate_budget,
                "decision dropped, over per-turn rate budget"
            );
            return false;
        }
        self.decisions.push(decision);
        true
    }

    pub fn start_timer(&mut self, call_id: CallId, start_to_fire_timeout: Duration) -> bool {
        self.push_scheduling(Decision::StartTimer {
            call_id,
            start_to_fire_timeout,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn schedule_activity(
        &mut self,
        call_id: CallId,
        name: String,
        version: String,
        task_list: Option<String>,
        input: Payload,
        heartbeat_timeout: Option<Duration>,
        schedule_to_close_timeout: Option<Duration>,
        schedule_to_start_timeout: Option<Duration>,
        start_to_close_timeout: Option<Duration>,
    ) -> bool {
        self.push_scheduling(Decision::ScheduleActivityTask {
            call_id,
            name,
            version,
            task_list,
            input,
            heartbeat_timeout,
            schedule_to_close_timeout,
            schedule_to_start_timeout,
            start_to_close_timeout,
        })
    }

    pub fn schedule_child(
        &mut self,
        call_id: CallId,
        workflow_id: String,
        name: String,
        version: String,
        task_list: Option<String>,
        input: Payload,
        child_policy: Option<ChildPolicy>,
        tags: Vec<String>,
    ) -> bool {
        self.push_scheduling(Decision::StartChildWorkflowExecution {
            call_id,
            workflow_id,
            name,
            version,
            task_list,
            input,
            child_policy,
            tags,
        })
    }

    /// Replace the buffer with a single terminal decision and close it to
    /// further writes; the decision itself comes out through the next
    /// `flush()` call, same as any other turn. A second terminal call after
    /// the buffer is closed is a silent no-op: at most one terminal decision
    /// is ever emitted.
    fn replace_with_terminal(&mut self, decision: Decision) {
        if self.closed {
            tracing::warn!(?decision, "terminal decision dropped, buffer already closed");
            return;
        }
        self.decisions = vec![decision];
        self.closed = true;
    }

    pub fn complete(&mut self, result: Payload) {
        self.replace_with_terminal(Decision::CompleteWorkflowExecution { result });
    }

    pub fn fail(&mut self, reason: String) {
        self.replace_with_terminal(Decision::FailWorkflowExecution { reason });
    }

    pub fn restart(&mut self, input: Payload) {
        self.replace_with_terminal(Decision::ContinueAsNewWorkflowExecution { input });
    }

    /// Take the accumulated decisions and close the buffer. Idempotent after
    /// the first call: later invocations return an empty batch, even if a
    /// terminal decision already closed the buffer without taking anything.
    pub fn flush(&mut self) -> Vec<Decision> {
        if self.taken {
            return Vec::new();
        }
        self.taken = true;
        self.closed = true;
        std::mem::take(&mut self.decisions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_decision_is_the_only_one_similar_asserts_sees() {
        let mut buf = DecisionBuffer::new(10);
        buf.start_timer(CallId::new(0), Duration::from_secs(1));
        buf.complete(Payload::new(b"\"done\"".to_vec()));
        let flushed = buf.flush();
        similar_asserts::assert_eq!(
            flushed,
            vec![Decision::CompleteWorkflowExecution {
                result: Payload::new(b"\"done\"".to_vec())
            }]
        );
    }

    #[test]
    fn scheduling_decisions_respect_rate_budget() {
        let mut buf = DecisionBuffer::new(2);
        assert!(buf.start_timer(CallId::new(0), Duration::from_secs(1)));
        assert!(buf.start_timer(CallId::new(1), Duration::from_secs(1)));
        assert!(!buf.start_timer(CallId::new(2), Duration::from_secs(1)));
        assert_eq!(buf.decisions().len(), 2);
    }

    #[test]
    fn flush_is_at_most_once() {
        let mut buf = DecisionBuffer::new(10);
        buf.start_timer(CallId::new(0), Duration::from_secs(1));
        let first = buf.flush();
        assert_eq!(first.len(), 1);
        let second = buf.flush();
        assert!(second.is_empty());
        assert!(buf.is_closed());
    }

    #[test]
    fn terminal_decision_replaces_pending_scheduling_decisions_and_flushes() {
        let mut buf = DecisionBuffer::new(10);
        buf.start_timer(CallId::new(0), Duration::from_secs(1));
        buf.complete(Payload::new(b"null".to_vec()));
        assert!(buf.is_closed());
        // complete() already flushed; nothing further is accepted.
        assert!(!buf.start_timer(CallId::new(1), Duration::from_secs(1)));
    }

    #[test]
    fn second_terminal_decision_after_close_is_dropped() {
        let mut buf = DecisionBuffer::new(10);
        buf.complete(Payload::new(b"1".to_vec()));
        buf.fail("too late".to_string());
        assert!(buf.is_closed());
    }
}
