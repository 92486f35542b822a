//! Folds a history event stream into the running/timedout/results/errors/order
//! snapshot a decision runtime replays against.

use crate::error::FoldError;
use crate::event::HistoryEvent;
use decider_types::{CallId, Payload};
use std::collections::{HashMap, HashSet};

/// A call-id marked "in flight" in `running` is either the call itself
/// (scheduled, not yet resolved) or a timer delaying that call; the two
/// never collide because [`CallId::timer_key`] mangles the latter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum RunningEntry {
    Call(CallId),
    Timer(CallId),
}

/// Immutable view of execution state reconstructed from history, built once
/// per decision turn and never mutated afterward.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    running: HashSet<RunningEntry>,
    timedout: HashSet<CallId>,
    results: HashMap<CallId, Payload>,
    errors: HashMap<CallId, String>,
    order: Vec<CallId>,
}

impl Snapshot {
    pub fn is_call_running(&self, id: CallId) -> bool {
        self.running.contains(&RunningEntry::Call(id))
    }

    pub fn is_timer_running(&self, id: CallId) -> bool {
        self.running.contains(&RunningEntry::Timer(id))
    }

    pub fn is_timedout(&self, id: CallId) -> bool {
        self.timedout.contains(&id)
    }

    pub fn result(&self, id: CallId) -> Option<&Payload> {
        self.results.get(&id)
    }

    pub fn error(&self, id: CallId) -> Option<&str> {
        self.errors.get(&id).map(String::as_str)
    }

    pub fn order_index(&self, id: CallId) -> Option<usize> {
        self.order.iter().position(|&c| c == id)
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn order_len(&self) -> usize {
        self.order.len()
    }

    /// Rebuild a [`Snapshot`] from a fully materialized event stream. Pure
    /// function of its input: folding the same events twice yields bitwise
    /// identical snapshots.
    pub fn fold<'a, I>(events: I) -> Result<Snapshot, FoldError>
    where
        I: IntoIterator<Item = &'a HistoryEvent>,
    {
        let mut snapshot = Snapshot::default();
        let mut scheduled_activity: HashMap<u64, CallId> = HashMap::new();

        for event in events {
            snapshot.apply(event, &mut scheduled_activity)?;
        }
        Ok(snapshot)
    }

    fn apply(
        &mut self,
        event: &HistoryEvent,
        scheduled_activity: &mut HashMap<u64, CallId>,
    ) -> Result<(), FoldError> {
        match event {
            HistoryEvent::ActivityTaskScheduled {
                event_id,
                activity_id,
            } => {
                let id = parse_call_id(activity_id)
                    .ok_or_else(|| FoldError::MalformedActivityId(activity_id.clone()))?;
                scheduled_activity.insert(*event_id, id);
                self.running.insert(RunningEntry::Call(id));
            }
            HistoryEvent::ActivityTaskCompleted {
                scheduled_event_id,
                result,
            } => {
                let id = lookup_scheduled(scheduled_activity, *scheduled_event_id)?;
                self.running.remove(&RunningEntry::Call(id));
                self.results.insert(id, result.clone());
                self.order.push(id);
            }
            HistoryEvent::ActivityTaskFailed {
                scheduled_event_id,
                reason,
            } => {
                let id = lookup_scheduled(scheduled_activity, *scheduled_event_id)?;
                self.running.remove(&RunningEntry::Call(id));
                self.errors.insert(id, reason.clone());
                self.order.push(id);
            }
            HistoryEvent::ActivityTaskTimedOut { scheduled_event_id } => {
                let id = lookup_scheduled(scheduled_activity, *scheduled_event_id)?;
                self.running.remove(&RunningEntry::Call(id));
                self.timedout.insert(id);
                self.order.push(id);
            }
            HistoryEvent::ScheduleActivityTaskFailed { activity_id, cause } => {
                let id = parse_call_id(activity_id)
                    .ok_or_else(|| FoldError::MalformedActivityId(activity_id.clone()))?;
                self.errors.insert(id, cause.clone());
                self.order.push(id);
            }
            HistoryEvent::StartChildWorkflowExecutionInitiated { workflow_id } => {
                let id = CallId::from_child_workflow_id(workflow_id)
                    .ok_or_else(|| FoldError::MalformedChildWorkflowId(workflow_id.clone()))?;
                self.running.insert(RunningEntry::Call(id));
            }
            HistoryEvent::ChildWorkflowExecutionCompleted {
                workflow_id,
                result,
            } => {
                let id = CallId::from_child_workflow_id(workflow_id)
                    .ok_or_else(|| FoldError::MalformedChildWorkflowId(workflow_id.clone()))?;
                self.running.remove(&RunningEntry::Call(id));
                self.results.insert(id, result.clone());
                self.order.push(id);
            }
            HistoryEvent::ChildWorkflowExecutionFailed {
                workflow_id,
                reason,
            } => {
                let id = CallId::from_child_workflow_id(workflow_id)
                    .ok_or_else(|| FoldError::MalformedChildWorkflowId(workflow_id.clone()))?;
                self.running.remove(&RunningEntry::Call(id));
                self.errors.insert(id, reason.clone());
                self.order.push(id);
            }
            HistoryEvent::ChildWorkflowExecutionTimedOut { workflow_id } => {
                let id = CallId::from_child_workflow_id(workflow_id)
                    .ok_or_else(|| FoldError::MalformedChildWorkflowId(workflow_id.clone()))?;
                self.running.remove(&RunningEntry::Call(id));
                self.timedout.insert(id);
                self.order.push(id);
            }
            HistoryEvent::StartChildWorkflowExecutionFailed { workflow_id, cause } => {
                let id = CallId::from_child_workflow_id(workflow_id)
                    .ok_or_else(|| FoldError::MalformedChildWorkflowId(workflow_id.clone()))?;
                self.errors.insert(id, cause.clone());
                self.order.push(id);
            }
            HistoryEvent::TimerStarted { timer_id } => {
                let id = CallId::from_timer_key(timer_id)
                    .ok_or_else(|| FoldError::MalformedTimerId(timer_id.clone()))?;
                self.running.insert(RunningEntry::Timer(id));
            }
            HistoryEvent::TimerFired { timer_id } => {
                let id = CallId::from_timer_key(timer_id)
                    .ok_or_else(|| FoldError::MalformedTimerId(timer_id.clone()))?;
                self.running.remove(&RunningEntry::Timer(id));
                // A fired timer resolves to a value, not an activity result.
                self.results.insert(id, Payload::default());
                self.order.push(id);
            }
        }
        Ok(())
    }
}

fn parse_call_id(s: &str) -> Option<CallId> {
    s.parse().ok()
}

fn lookup_scheduled(
    scheduled_activity: &HashMap<u64, CallId>,
    scheduled_event_id: u64,
) -> Result<CallId, FoldError> {
    scheduled_activity
        .get(&scheduled_event_id)
        .copied()
        .ok_or(FoldError::UnknownScheduledEventId(scheduled_event_id))
}
