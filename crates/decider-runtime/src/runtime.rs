//! The decision runtime — the heart of the system. Rebuilds per-call state
//! from a history [`Snapshot`] on every decision turn and exposes
//! activity/sub-workflow invocations as deterministic, replay-stable calls.

use crate::error::{RuntimeError, WorkflowFault};
use crate::outcome::{CallOutcome, CallStatus, Outcome};
use decider_history::{Decision, DecisionBuffer, Snapshot};
use decider_types::{ArgsKwargs, CallId, ChildPolicy, ProxyDescriptor};
use std::time::Duration;

/// The workflow's own identity and scheduling defaults for this execution,
/// overridable per-call through [`ProxyDescriptor`] and scoped through
/// [`DecisionRuntime::with_options`].
#[derive(Clone, Debug)]
pub struct WorkflowMeta {
    pub name: String,
    pub version: String,
    pub domain: String,
    pub default_task_list: Option<String>,
    pub default_child_policy: Option<ChildPolicy>,
    pub tags: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CallKind {
    Activity,
    Child,
}

/// RAII guard enforcing the call-id allocation invariant: the cursor always
/// advances by the call's reserved window on every exit path, scheduled or
/// not, resolved or not.
struct CursorGuard<'a> {
    cursor: &'a mut u64,
    next: u64,
}

impl Drop for CursorGuard<'_> {
    fn drop(&mut self) {
        *self.cursor = self.next;
    }
}

pub struct DecisionRuntime {
    snapshot: Snapshot,
    buffer: DecisionBuffer,
    cursor: u64,
    scheduled: bool,
    meta: WorkflowMeta,
    random_token: String,
}

impl DecisionRuntime {
    pub fn new(meta: WorkflowMeta, snapshot: Snapshot, random_token: String) -> Self {
        let rate_budget = decider_history::rate_budget(snapshot.running_count());
        DecisionRuntime {
            buffer: DecisionBuffer::new(rate_budget),
            snapshot,
            cursor: 0,
            scheduled: false,
            meta,
            random_token,
        }
    }

    pub fn meta(&self) -> &WorkflowMeta {
        &self.meta
    }

    pub fn was_scheduled(&self) -> bool {
        self.scheduled
    }

    pub fn call_activity(
        &mut self,
        descriptor: &ProxyDescriptor,
        args: &ArgsKwargs,
    ) -> Result<CallStatus, RuntimeError> {
        self.call(descriptor, args, CallKind::Activity)
    }

    pub fn call_subworkflow(
        &mut self,
        descriptor: &ProxyDescriptor,
        args: &ArgsKwargs,
    ) -> Result<CallStatus, RuntimeError> {
        self.call(descriptor, args, CallKind::Child)
    }

    fn call(
        &mut self,
        descriptor: &ProxyDescriptor,
        args: &ArgsKwargs,
        kind: CallKind,
    ) -> Result<CallStatus, RuntimeError> {
        let c0 = self.cursor;
        let window = descriptor.reserved_window();
        let _guard = CursorGuard {
            cursor: &mut self.cursor,
            next: c0 + window,
        };
        call_body(
            &self.snapshot,
            &mut self.buffer,
            &mut self.scheduled,
            c0,
            descriptor,
            args,
            kind,
            &self.random_token,
        )
    }

    /// Continue-as-new: encodes `args` with `descriptor`'s codec and emits
    /// a restart decision, closing the buffer immediately.
    pub fn restart(
        &mut self,
        args: &ArgsKwargs,
        codec: &dyn decider_types::Codec,
    ) -> Result<(), RuntimeError> {
        let payload = codec.encode_args(args)?.truncated(decider_types::INPUT_SIZE);
        self.scheduled = true;
        self.buffer.restart(payload);
        Ok(())
    }

    /// Apply the turn-termination rules once the user workflow body has
    /// returned, producing the decisions to send back to the service.
    pub fn finish(
        mut self,
        result: Result<serde_json::Value, WorkflowFault>,
        codec: &dyn decider_types::Codec,
    ) -> Vec<Decision> {
        match result {
            Err(WorkflowFault::Failed(reason)) => {
                let reason = decider_types::truncate_to(&reason, decider_types::REASON_SIZE);
                self.buffer.fail(reason);
            }
            Err(WorkflowFault::Suspend) => {
                // Suspend is not terminal: either something was scheduled
                // this turn, or the snapshot already had calls in flight.
            }
            Ok(value) => {
                if !self.scheduled && self.snapshot.running_count() == 0 {
                    match codec.encode_result(&value) {
                        Ok(payload) => self
                            .buffer
                            .complete(payload.truncated(decider_types::RESULT_SIZE)),
                        Err(e) => self.buffer.fail(e.to_string()),
                    }
                }
            }
        }
        self.buffer.flush()
    }
}

#[allow(clippy::too_many_arguments)]
fn call_body(
    snapshot: &Snapshot,
    buffer: &mut DecisionBuffer,
    scheduled: &mut bool,
    c0: u64,
    descriptor: &ProxyDescriptor,
    args: &ArgsKwargs,
    kind: CallKind,
    random_token: &str,
) -> Result<CallStatus, RuntimeError> {
    let mut cursor = c0;

    if let Some(delay) = descriptor.delay {
        let id = CallId::new(cursor);
        if snapshot.is_timer_running(id) {
            return Ok(CallStatus::Suspend);
        }
        if snapshot.result(id).is_some() {
            // The timer already fired; the call itself starts one id later.
            cursor += 1;
        } else {
            *scheduled = true;
            buffer.start_timer(id, delay);
            return Ok(CallStatus::Suspend);
        }
    }

    for offset in 0..=u64::from(descriptor.retry) {
        let id = CallId::new(cursor + offset);

        if snapshot.is_timedout(id) {
            continue;
        }
        if snapshot.is_call_running(id) {
            return Ok(CallStatus::Suspend);
        }
        if let Some(reason) = snapshot.error(id) {
            let order = snapshot
                .order_index(id)
                .expect("a failed call must appear in the completion order");
            return Ok(CallStatus::Resolved(Outcome {
                order,
                outcome: CallOutcome::Err(reason.to_string()),
            }));
        }
        if let Some(result) = snapshot.result(id) {
            let order = snapshot
                .order_index(id)
                .expect("a completed call must appear in the completion order");
            let value = descriptor.codec.decode_result(result)?;
            return Ok(CallStatus::Resolved(Outcome {
                order,
                outcome: CallOutcome::Value(value),
            }));
        }

        // Never scheduled: this is the attempt to make.
        *scheduled = true;
        let payload = descriptor
            .codec
            .encode_args(args)?
            .truncated(decider_types::INPUT_SIZE);
        match kind {
            CallKind::Activity => {
                buffer.schedule_activity(
                    id,
                    descriptor.name.clone(),
                    descriptor.version.clone(),
                    descriptor.task_list.clone(),
                    payload,
                    descriptor.heartbeat_timeout,
                    descriptor.schedule_to_close_timeout,
                    descriptor.schedule_to_start_timeout,
                    descriptor.start_to_close_timeout,
                );
            }
            CallKind::Child => {
                buffer.schedule_child(
                    id,
                    id.child_workflow_id(random_token),
                    descriptor.name.clone(),
                    descriptor.version.clone(),
                    descriptor.task_list.clone(),
                    payload,
                    descriptor.child_policy,
                    descriptor.tags.clone(),
                );
            }
        }
        return Ok(CallStatus::Suspend);
    }

    // Every id in the retry window timed out.
    let last_id = CallId::new(cursor + u64::from(descriptor.retry));
    let order = snapshot
        .order_index(last_id)
        .expect("a fully-timed-out retry window's last id must appear in the completion order");
    Ok(CallStatus::Resolved(Outcome {
        order,
        outcome: CallOutcome::Timeout,
    }))
}

/// Scoped override of task-list/tags for calls made within a closure,
/// restored once the closure returns.
pub struct OptionsOverride {
    pub task_list: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl ProxyDescriptor {
    /// Apply an [`OptionsOverride`] to a clone of this descriptor.
    pub fn with_options(&self, options: &OptionsOverride) -> Self {
        let mut d = self.clone();
        if let Some(task_list) = &options.task_list {
            d.task_list = Some(task_list.clone());
        }
        if let Some(tags) = &options.tags {
            d.tags = decider_types::normalize_tags(tags);
        }
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decider_history::HistoryEvent;
    use decider_types::{JsonCodec, Payload};
    use std::sync::Arc;

    fn descriptor(retry: u32, delay: Option<Duration>) -> ProxyDescriptor {
        let codec: Arc<dyn decider_types::Codec> = Arc::new(JsonCodec);
        let mut d = ProxyDescriptor::new("dep", "DoThing", "1.0", codec).with_retry(retry);
        if let Some(delay) = delay {
            d = d.with_delay(delay);
        }
        d
    }

    fn args() -> ArgsKwargs {
        ArgsKwargs::positional(vec![serde_json::json!(1)])
    }

    fn meta() -> WorkflowMeta {
        WorkflowMeta {
            name: "Wf".into(),
            version: "1.0".into(),
            domain: "test".into(),
            default_task_list: None,
            default_child_policy: None,
            tags: vec![],
        }
    }

    #[test]
    fn fresh_call_schedules_and_suspends() {
        let snapshot = Snapshot::fold(&[]).unwrap();
        let mut rt = DecisionRuntime::new(meta(), snapshot, "tok".into());
        let status = rt.call_activity(&descriptor(0, None), &args()).unwrap();
        assert_eq!(status, CallStatus::Suspend);
        assert!(rt.was_scheduled());
    }

    #[test]
    fn completed_call_resolves_with_value() {
        let events = vec![
            HistoryEvent::ActivityTaskScheduled {
                event_id: 1,
                activity_id: "0".into(),
            },
            HistoryEvent::ActivityTaskCompleted {
                scheduled_event_id: 1,
                result: Payload::new(b"42".to_vec()),
            },
        ];
        let snapshot = Snapshot::fold(&events).unwrap();
        let mut rt = DecisionRuntime::new(meta(), snapshot, "tok".into());
        let status = rt.call_activity(&descriptor(0, None), &args()).unwrap();
        match status {
            CallStatus::Resolved(outcome) => {
                assert_eq!(outcome.into_result().unwrap(), serde_json::json!(42));
            }
            CallStatus::Suspend => panic!("expected resolved outcome"),
        }
        assert!(!rt.was_scheduled());
    }

    #[test]
    fn retry_after_timeout_reschedules_next_id_in_window() {
        let events = vec![
            HistoryEvent::ActivityTaskScheduled {
                event_id: 1,
                activity_id: "0".into(),
            },
            HistoryEvent::ActivityTaskTimedOut {
                scheduled_event_id: 1,
            },
        ];
        let snapshot = Snapshot::fold(&events).unwrap();
        let mut rt = DecisionRuntime::new(meta(), snapshot, "tok".into());
        let status = rt.call_activity(&descriptor(2, None), &args()).unwrap();
        assert_eq!(status, CallStatus::Suspend);
        assert!(rt.was_scheduled());
    }

    #[test]
    fn retry_budget_exhausted_resolves_as_timeout() {
        let events = vec![
            HistoryEvent::ActivityTaskScheduled {
                event_id: 1,
                activity_id: "0".into(),
            },
            HistoryEvent::ActivityTaskTimedOut {
                scheduled_event_id: 1,
            },
            HistoryEvent::ActivityTaskScheduled {
                event_id: 2,
                activity_id: "1".into(),
            },
            HistoryEvent::ActivityTaskTimedOut {
                scheduled_event_id: 2,
            },
        ];
        let snapshot = Snapshot::fold(&events).unwrap();
        let mut rt = DecisionRuntime::new(meta(), snapshot, "tok".into());
        let status = rt.call_activity(&descriptor(1, None), &args()).unwrap();
        match status {
            CallStatus::Resolved(outcome) => assert!(outcome.is_timeout()),
            CallStatus::Suspend => panic!("expected a resolved timeout"),
        }
    }

    #[test]
    fn delay_then_schedule_starts_timer_first() {
        let snapshot = Snapshot::fold(&[]).unwrap();
        let mut rt = DecisionRuntime::new(meta(), snapshot, "tok".into());
        let status = rt
            .call_activity(&descriptor(0, Some(Duration::from_secs(5))), &args())
            .unwrap();
        assert_eq!(status, CallStatus::Suspend);
        assert!(matches!(
            rt.buffer.decisions().first(),
            Some(Decision::StartTimer { .. })
        ));
    }

    #[test]
    fn delay_fired_falls_through_to_schedule() {
        let events = vec![
            HistoryEvent::TimerStarted {
                timer_id: "0:t".into(),
            },
            HistoryEvent::TimerFired {
                timer_id: "0:t".into(),
            },
        ];
        let snapshot = Snapshot::fold(&events).unwrap();
        let mut rt = DecisionRuntime::new(meta(), snapshot, "tok".into());
        let status = rt
            .call_activity(&descriptor(0, Some(Duration::from_secs(5))), &args())
            .unwrap();
        assert_eq!(status, CallStatus::Suspend);
        assert!(matches!(
            rt.buffer.decisions().first(),
            Some(Decision::ScheduleActivityTask { call_id, .. }) if *call_id == CallId::new(1)
        ));
    }

    #[test]
    fn call_id_allocation_is_stable_across_independent_calls() {
        // Two sequential calls in source order must land on disjoint,
        // deterministic windows regardless of resolution state.
        let snapshot = Snapshot::fold(&[]).unwrap();
        let mut rt = DecisionRuntime::new(meta(), snapshot, "tok".into());
        rt.call_activity(&descriptor(2, None), &args()).unwrap();
        assert_eq!(rt.cursor, 3); // 1 + retry(2)
        rt.call_activity(&descriptor(0, None), &args()).unwrap();
        assert_eq!(rt.cursor, 4);
    }

    #[test]
    fn finish_completes_when_nothing_is_outstanding() {
        let snapshot = Snapshot::fold(&[]).unwrap();
        let rt = DecisionRuntime::new(meta(), snapshot, "tok".into());
        let decisions = rt.finish(Ok(serde_json::json!("done")), &JsonCodec);
        assert!(matches!(
            decisions.as_slice(),
            [Decision::CompleteWorkflowExecution { .. }]
        ));
    }

    #[test]
    fn finish_only_flushes_when_a_call_is_still_scheduled() {
        let snapshot = Snapshot::fold(&[]).unwrap();
        let mut rt = DecisionRuntime::new(meta(), snapshot, "tok".into());
        rt.call_activity(&descriptor(0, None), &args()).unwrap();
        let decisions = rt.finish(Ok(serde_json::json!(null)), &JsonCodec);
        assert!(matches!(
            decisions.as_slice(),
            [Decision::ScheduleActivityTask { .. }]
        ));
    }

    #[test]
    fn finish_fails_workflow_on_explicit_failure() {
        let snapshot = Snapshot::fold(&[]).unwrap();
        let rt = DecisionRuntime::new(meta(), snapshot, "tok".into());
        let decisions = rt.finish(
            Err(WorkflowFault::Failed("boom".into())),
            &JsonCodec,
        );
        assert!(matches!(
            decisions.as_slice(),
            [Decision::FailWorkflowExecution { reason }] if reason.as_str() == "boom"
        ));
    }
}
