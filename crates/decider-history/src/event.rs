//! The exhaustive set of history event kinds the folder consumes. Any event
//! kind not in this enum is ignored by construction: the wire layer simply
//! never constructs one for us.

use decider_types::Payload;

#[derive(Clone, Debug, PartialEq)]
pub enum HistoryEvent {
    ActivityTaskScheduled {
        event_id: u64,
        activity_id: String,
    },
    ActivityTaskCompleted {
        scheduled_event_id: u64,
        result: Payload,
    },
    ActivityTaskFailed {
        scheduled_event_id: u64,
        reason: String,
    },
    ActivityTaskTimedOut {
        scheduled_event_id: u64,
    },
    /// A schedule attempt rejected synchronously by the service; the call
    /// never enters `running`.
    ScheduleActivityTaskFailed {
        activity_id: String,
        cause: String,
    },
    StartChildWorkflowExecutionInitiated {
        workflow_id: String,
    },
    ChildWorkflowExecutionCompleted {
        workflow_id: String,
        result: Payload,
    },
    ChildWorkflowExecutionFailed {
        workflow_id: String,
        reason: String,
    },
    ChildWorkflowExecutionTimedOut {
        workflow_id: String,
    },
    StartChildWorkflowExecutionFailed {
        workflow_id: String,
        cause: String,
    },
    TimerStarted {
        timer_id: String,
    },
    TimerFired {
        timer_id: String,
    },
}

impl HistoryEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HistoryEvent::ActivityTaskScheduled { .. } => "ActivityTaskScheduled",
            HistoryEvent::ActivityTaskCompleted { .. } => "ActivityTaskCompleted",
            HistoryEvent::ActivityTaskFailed { .. } => "ActivityTaskFailed",
            HistoryEvent::ActivityTaskTimedOut { .. } => "ActivityTaskTimedOut",
            HistoryEvent::ScheduleActivityTaskFailed { .. } => "ScheduleActivityTaskFailed",
            HistoryEvent::StartChildWorkflowExecutionInitiated { .. } => {
                "StartChildWorkflowExecutionInitiated"
            }
            HistoryEvent::ChildWorkflowExecutionCompleted { .. } => {
                "ChildWorkflowExecutionCompleted"
            }
            HistoryEvent::ChildWorkflowExecutionFailed { .. } => "ChildWorkflowExecutionFailed",
            HistoryEvent::ChildWorkflowExecutionTimedOut { .. } => {
                "ChildWorkflowExecutionTimedOut"
            }
            HistoryEvent::StartChildWorkflowExecutionFailed { .. } => {
                "StartChildWorkflowExecutionFailed"
            }
            HistoryEvent::TimerStarted { .. } => "TimerStarted",
            HistoryEvent::TimerFired { .. } => "TimerFired",
        }
    }
}
