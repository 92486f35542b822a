//! An in-memory [`WorkflowService`] double used by this crate's own test
//! suite. Not a production client: no persistence, no timers that wait for
//! real time (see [`InMemoryService::fire_timers`]), no network.

use crate::service::{
    ActivityTask, DecisionTask, HistoryPage, PollActivityTaskRequest, PollDecisionTaskRequest,
    ServiceError, StartWorkflowExecutionRequest, WorkflowService,
};
use decider_history::{Decision, HistoryEvent};
use decider_types::{ActivityTypeDescriptor, CallId, Payload, WorkflowTypeDescriptor};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

struct PendingActivity {
    workflow_id: String,
    scheduled_event_id: u64,
    activity_type_name: String,
    activity_type_version: String,
    input: Payload,
}

struct Execution {
    type_name: String,
    type_version: String,
    history: Vec<HistoryEvent>,
    next_event_id: u64,
    closed: bool,
    decision_task_open: bool,
}

#[derive(Default)]
struct Inner {
    workflow_types: HashMap<(String, String), WorkflowTypeDescriptor>,
    activity_types: HashMap<(String, String), ActivityTypeDescriptor>,
    executions: HashMap<String, Execution>,
    decision_queue: VecDeque<String>,
    activity_queue: VecDeque<String>,
    open_decision_tasks: HashMap<String, String>,
    pending_activities: HashMap<String, PendingActivity>,
    next_token: u64,
}

/// A single-process stand-in for a managed workflow service. Registration
/// behaves like the real contract (second register of the same type returns
/// `AlreadyExists`); decision/activity tasks are handed out FIFO.
#[derive(Default)]
pub struct InMemoryService {
    inner: Mutex<Inner>,
}

impl InMemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_token(inner: &mut Inner) -> String {
        inner.next_token += 1;
        format!("token-{}", inner.next_token)
    }

    /// Convert every outstanding `TimerStarted` without a matching
    /// `TimerFired` into a fired timer and re-queue that workflow's decision
    /// task. Test helper standing in for the passage of real time.
    pub fn fire_timers(&self) {
        let mut inner = self.inner.lock().unwrap();
        let workflow_ids: Vec<String> = inner.executions.keys().cloned().collect();
        for workflow_id in workflow_ids {
            let to_fire: Vec<String> = {
                let exec = inner.executions.get(&workflow_id).unwrap();
                outstanding_timers(&exec.history)
            };
            if to_fire.is_empty() {
                continue;
            }
            let exec = inner.executions.get_mut(&workflow_id).unwrap();
            for timer_id in to_fire {
                exec.history.push(HistoryEvent::TimerFired { timer_id });
            }
            if !exec.closed && !exec.decision_task_open {
                inner.decision_queue.push_back(workflow_id);
            }
        }
    }

    /// Time out a pending activity task directly, standing in for the
    /// service's own schedule-to-close/heartbeat timeout enforcement.
    pub fn time_out_activity(&self, task_token: &str) {
        let mut inner = self.inner.lock().unwrap();
        let Some(pending) = inner.pending_activities.remove(task_token) else {
            return;
        };
        inner.activity_queue.retain(|t| t != task_token);
        let workflow_id = pending.workflow_id.clone();
        if let Some(exec) = inner.executions.get_mut(&workflow_id) {
            exec.history.push(HistoryEvent::ActivityTaskTimedOut {
                scheduled_event_id: pending.scheduled_event_id,
            });
            if !exec.closed && !exec.decision_task_open {
                inner.decision_queue.push_back(workflow_id);
            }
        }
    }

    /// The task token of the next queued (not yet polled) activity task, if
    /// any — lets tests time out an activity without polling it first.
    pub fn peek_activity_task_token(&self) -> Option<String> {
        self.inner.lock().unwrap().activity_queue.front().cloned()
    }

    pub fn history_len(&self, workflow_id: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .executions
            .get(workflow_id)
            .map(|e| e.history.len())
            .unwrap_or(0)
    }

    pub fn is_closed(&self, workflow_id: &str) -> bool {
        self.inner
            .lock()
            .unwrap()
            .executions
            .get(workflow_id)
            .map(|e| e.closed)
            .unwrap_or(false)
    }
}

fn outstanding_timers(history: &[HistoryEvent]) -> Vec<String> {
    let mut started = Vec::new();
    let mut fired = std::collections::HashSet::new();
    for event in history {
        match event {
            HistoryEvent::TimerStarted { timer_id } => started.push(timer_id.clone()),
            HistoryEvent::TimerFired { timer_id } => {
                fired.insert(timer_id.clone());
            }
            _ => {}
        }
    }
    started.into_iter().filter(|t| !fired.contains(t)).collect()
}

#[async_trait::async_trait]
impl WorkflowService for InMemoryService {
    async fn poll_for_decision_task(
        &self,
        _req: PollDecisionTaskRequest,
    ) -> Result<Option<DecisionTask>, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(workflow_id) = inner.decision_queue.pop_front() else {
            return Ok(None);
        };
        let task_token = Self::next_token(&mut inner);
        let exec = inner
            .executions
            .get_mut(&workflow_id)
            .ok_or_else(|| ServiceError::Transport("unknown execution".into()))?;
        exec.decision_task_open = true;
        let task = DecisionTask {
            task_token: task_token.clone(),
            workflow_type_name: exec.type_name.clone(),
            workflow_type_version: exec.type_version.clone(),
            input: Payload::default(),
            first_page: HistoryPage {
                events: exec.history.clone(),
                next_page_token: None,
            },
        };
        inner.open_decision_tasks.insert(task_token, workflow_id);
        Ok(Some(task))
    }

    async fn get_history_page(
        &self,
        _task_token: &str,
        _next_page_token: Option<&str>,
    ) -> Result<HistoryPage, ServiceError> {
        // The fake's first page always carries the full history.
        Ok(HistoryPage::default())
    }

    async fn respond_decision_task_completed(
        &self,
        task_token: &str,
        decisions: Vec<Decision>,
    ) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        let workflow_id = inner
            .open_decision_tasks
            .remove(task_token)
            .ok_or(ServiceError::NotFound)?;

        for decision in decisions {
            apply_decision(&mut inner, &workflow_id, decision)?;
        }

        let exec = inner
            .executions
            .get_mut(&workflow_id)
            .ok_or(ServiceError::NotFound)?;
        exec.decision_task_open = false;
        Ok(())
    }

    async fn poll_for_activity_task(
        &self,
        _req: PollActivityTaskRequest,
    ) -> Result<Option<ActivityTask>, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(task_token) = inner.activity_queue.pop_front() else {
            return Ok(None);
        };
        let pending = inner
            .pending_activities
            .get(&task_token)
            .ok_or(ServiceError::NotFound)?;
        Ok(Some(ActivityTask {
            task_token,
            activity_type_name: pending.activity_type_name.clone(),
            activity_type_version: pending.activity_type_version.clone(),
            input: pending.input.clone(),
        }))
    }

    async fn respond_activity_task_completed(
        &self,
        task_token: &str,
        result: Payload,
    ) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        let pending = inner
            .pending_activities
            .remove(task_token)
            .ok_or(ServiceError::NotFound)?;
        let workflow_id = pending.workflow_id.clone();
        let exec = inner
            .executions
            .get_mut(&workflow_id)
            .ok_or(ServiceError::NotFound)?;
        exec.history.push(HistoryEvent::ActivityTaskCompleted {
            scheduled_event_id: pending.scheduled_event_id,
            result,
        });
        if !exec.closed && !exec.decision_task_open {
            inner.decision_queue.push_back(workflow_id);
        }
        Ok(())
    }

    async fn respond_activity_task_failed(
        &self,
        task_token: &str,
        reason: String,
    ) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        let pending = inner
            .pending_activities
            .remove(task_token)
            .ok_or(ServiceError::NotFound)?;
        let workflow_id = pending.workflow_id.clone();
        let exec = inner
            .executions
            .get_mut(&workflow_id)
            .ok_or(ServiceError::NotFound)?;
        exec.history.push(HistoryEvent::ActivityTaskFailed {
            scheduled_event_id: pending.scheduled_event_id,
            reason,
        });
        if !exec.closed && !exec.decision_task_open {
            inner.decision_queue.push_back(workflow_id);
        }
        Ok(())
    }

    async fn record_activity_task_heartbeat(&self, task_token: &str) -> Result<bool, ServiceError> {
        let inner = self.inner.lock().unwrap();
        if inner.pending_activities.contains_key(task_token) {
            Ok(false)
        } else {
            Err(ServiceError::NotFound)
        }
    }

    async fn register_workflow_type(
        &self,
        domain: &str,
        descriptor: &WorkflowTypeDescriptor,
    ) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        let name = descriptor.name.clone().unwrap_or_default();
        let key = (format!("{domain}/{name}"), descriptor.version.clone());
        if inner.workflow_types.contains_key(&key) {
            return Err(ServiceError::AlreadyExists);
        }
        inner.workflow_types.insert(key, descriptor.clone());
        Ok(())
    }

    async fn describe_workflow_type(
        &self,
        domain: &str,
        name: &str,
        version: &str,
    ) -> Result<WorkflowTypeDescriptor, ServiceError> {
        let inner = self.inner.lock().unwrap();
        let key = (format!("{domain}/{name}"), version.to_string());
        inner
            .workflow_types
            .get(&key)
            .cloned()
            .ok_or(ServiceError::NotFound)
    }

    async fn register_activity_type(
        &self,
        domain: &str,
        descriptor: &ActivityTypeDescriptor,
    ) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        let name = descriptor.name.clone().unwrap_or_default();
        let key = (format!("{domain}/{name}"), descriptor.version.clone());
        if inner.activity_types.contains_key(&key) {
            return Err(ServiceError::AlreadyExists);
        }
        inner.activity_types.insert(key, descriptor.clone());
        Ok(())
    }

    async fn describe_activity_type(
        &self,
        domain: &str,
        name: &str,
        version: &str,
    ) -> Result<ActivityTypeDescriptor, ServiceError> {
        let inner = self.inner.lock().unwrap();
        let key = (format!("{domain}/{name}"), version.to_string());
        inner
            .activity_types
            .get(&key)
            .cloned()
            .ok_or(ServiceError::NotFound)
    }

    async fn start_workflow_execution(
        &self,
        req: StartWorkflowExecutionRequest,
    ) -> Result<bool, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        let workflow_id = req
            .workflow_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        if inner.executions.contains_key(&workflow_id) {
            return Ok(false);
        }
        inner.executions.insert(
            workflow_id.clone(),
            Execution {
                type_name: req.name,
                type_version: req.version,
                history: Vec::new(),
                next_event_id: 1,
                closed: false,
                decision_task_open: false,
            },
        );
        inner.decision_queue.push_back(workflow_id);
        Ok(true)
    }
}

fn apply_decision(
    inner: &mut Inner,
    workflow_id: &str,
    decision: Decision,
) -> Result<(), ServiceError> {
    {
        let exec = inner
            .executions
            .get_mut(workflow_id)
            .ok_or(ServiceError::NotFound)?;
        match decision {
            Decision::StartTimer { call_id, .. } => {
                exec.history.push(HistoryEvent::TimerStarted {
                    timer_id: call_id.timer_key(),
                });
                exec.next_event_id += 1;
                return Ok(());
            }
            Decision::ScheduleActivityTask {
                call_id,
                name,
                version,
                input,
                ..
            } => {
                let event_id = exec.next_event_id;
                exec.next_event_id += 1;
                exec.history.push(HistoryEvent::ActivityTaskScheduled {
                    event_id,
                    activity_id: call_id.to_string(),
                });
                let task_token = format!("activity-{workflow_id}-{event_id}");
                inner.pending_activities.insert(
                    task_token.clone(),
                    PendingActivity {
                        workflow_id: workflow_id.to_string(),
                        scheduled_event_id: event_id,
                        activity_type_name: name,
                        activity_type_version: version,
                        input,
                    },
                );
                inner.activity_queue.push_back(task_token);
                return Ok(());
            }
            Decision::StartChildWorkflowExecution { workflow_id, .. } => {
                exec.history
                    .push(HistoryEvent::StartChildWorkflowExecutionInitiated { workflow_id });
                exec.next_event_id += 1;
                return Ok(());
            }
            Decision::CompleteWorkflowExecution { .. }
            | Decision::FailWorkflowExecution { .. }
            | Decision::ContinueAsNewWorkflowExecution { .. } => {
                exec.closed = true;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_then_poll_yields_a_decision_task() {
        let service = InMemoryService::new();
        let started = service
            .start_workflow_execution(StartWorkflowExecutionRequest {
                domain: "d".into(),
                workflow_id: Some("wf-1".into()),
                name: "Greet".into(),
                version: "1.0".into(),
                task_list: None,
                input: Payload::default(),
                execution_start_to_close_timeout: None,
                task_start_to_close_timeout: None,
                child_policy: None,
                tags: vec![],
            })
            .await
            .unwrap();
        assert!(started);

        let task = service
            .poll_for_decision_task(PollDecisionTaskRequest {
                domain: "d".into(),
                task_list: "tl".into(),
                identity: "id".into(),
            })
            .await
            .unwrap()
            .expect("a decision task should be queued");
        assert_eq!(task.workflow_type_name, "Greet");
    }

    #[tokio::test]
    async fn schedule_then_complete_activity_requeues_decision() {
        let service = InMemoryService::new();
        service
            .start_workflow_execution(StartWorkflowExecutionRequest {
                domain: "d".into(),
                workflow_id: Some("wf-1".into()),
                name: "Greet".into(),
                version: "1.0".into(),
                task_list: None,
                input: Payload::default(),
                execution_start_to_close_timeout: None,
                task_start_to_close_timeout: None,
                child_policy: None,
                tags: vec![],
            })
            .await
            .unwrap();
        let task = service
            .poll_for_decision_task(PollDecisionTaskRequest {
                domain: "d".into(),
                task_list: "tl".into(),
                identity: "id".into(),
            })
            .await
            .unwrap()
            .unwrap();

        service
            .respond_decision_task_completed(
                &task.task_token,
                vec![Decision::ScheduleActivityTask {
                    call_id: CallId::new(0),
                    name: "SayHi".into(),
                    version: "1.0".into(),
                    task_list: None,
                    input: Payload::default(),
                    heartbeat_timeout: None,
                    schedule_to_close_timeout: None,
                    schedule_to_start_timeout: None,
                    start_to_close_timeout: None,
                }],
            )
            .await
            .unwrap();

        let activity = service
            .poll_for_activity_task(PollActivityTaskRequest {
                domain: "d".into(),
                task_list: "tl".into(),
                identity: "id".into(),
            })
            .await
            .unwrap()
            .expect("an activity task should be queued");
        assert_eq!(activity.activity_type_name, "SayHi");

        service
            .respond_activity_task_completed(&activity.task_token, Payload::new(b"1".to_vec()))
            .await
            .unwrap();

        assert_eq!(service.history_len("wf-1"), 2);
        let next = service
            .poll_for_decision_task(PollDecisionTaskRequest {
                domain: "d".into(),
                task_list: "tl".into(),
                identity: "id".into(),
            })
            .await
            .unwrap();
        assert!(next.is_some());
    }
}
