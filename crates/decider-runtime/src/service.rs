//! The remote workflow service boundary. Everything in this module is a
//! contract: a production implementation (gRPC/HTTPS) is an external
//! collaborator, not part of this crate. [`crate::testing::InMemoryService`]
//! is the test double this crate's own suite runs against.

use decider_history::{Decision, HistoryEvent};
use decider_types::{ActivityTypeDescriptor, ChildPolicy, Payload, WorkflowTypeDescriptor};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("type already registered")]
    AlreadyExists,
    #[error("not found")]
    NotFound,
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Clone, Debug)]
pub struct PollDecisionTaskRequest {
    pub domain: String,
    pub task_list: String,
    pub identity: String,
}

#[derive(Clone, Debug)]
pub struct PollActivityTaskRequest {
    pub domain: String,
    pub task_list: String,
    pub identity: String,
}

/// One page of an execution's event history.
#[derive(Clone, Debug, Default)]
pub struct HistoryPage {
    pub events: Vec<HistoryEvent>,
    pub next_page_token: Option<String>,
}

#[derive(Clone, Debug)]
pub struct DecisionTask {
    pub task_token: String,
    pub workflow_type_name: String,
    pub workflow_type_version: String,
    pub input: Payload,
    pub first_page: HistoryPage,
}

#[derive(Clone, Debug)]
pub struct ActivityTask {
    pub task_token: String,
    pub activity_type_name: String,
    pub activity_type_version: String,
    pub input: Payload,
}

#[derive(Clone, Debug)]
pub struct StartWorkflowExecutionRequest {
    pub domain: String,
    pub workflow_id: Option<String>,
    pub name: String,
    pub version: String,
    pub task_list: Option<String>,
    pub input: Payload,
    pub execution_start_to_close_timeout: Option<Duration>,
    pub task_start_to_close_timeout: Option<Duration>,
    pub child_policy: Option<ChildPolicy>,
    pub tags: Vec<String>,
}

/// The set of operations this framework issues against a managed workflow
/// service. A `true` return from `record_activity_task_heartbeat` means the
/// execution has a pending cancellation request.
#[async_trait::async_trait]
pub trait WorkflowService: Send + Sync {
    async fn poll_for_decision_task(
        &self,
        req: PollDecisionTaskRequest,
    ) -> Result<Option<DecisionTask>, ServiceError>;

    async fn get_history_page(
        &self,
        task_token: &str,
        next_page_token: Option<&str>,
    ) -> Result<HistoryPage, ServiceError>;

    async fn respond_decision_task_completed(
        &self,
        task_token: &str,
        decisions: Vec<Decision>,
    ) -> Result<(), ServiceError>;

    async fn poll_for_activity_task(
        &self,
        req: PollActivityTaskRequest,
    ) -> Result<Option<ActivityTask>, ServiceError>;

    async fn respond_activity_task_completed(
        &self,
        task_token: &str,
        result: Payload,
    ) -> Result<(), ServiceError>;

    async fn respond_activity_task_failed(
        &self,
        task_token: &str,
        reason: String,
    ) -> Result<(), ServiceError>;

    async fn record_activity_task_heartbeat(&self, task_token: &str) -> Result<bool, ServiceError>;

    async fn register_workflow_type(
        &self,
        domain: &str,
        descriptor: &WorkflowTypeDescriptor,
    ) -> Result<(), ServiceError>;

    async fn describe_workflow_type(
        &self,
        domain: &str,
        name: &str,
        version: &str,
    ) -> Result<WorkflowTypeDescriptor, ServiceError>;

    async fn register_activity_type(
        &self,
        domain: &str,
        descriptor: &ActivityTypeDescriptor,
    ) -> Result<(), ServiceError>;

    async fn describe_activity_type(
        &self,
        domain: &str,
        name: &str,
        version: &str,
    ) -> Result<ActivityTypeDescriptor, ServiceError>;

    async fn start_workflow_execution(
        &self,
        req: StartWorkflowExecutionRequest,
    ) -> Result<bool, ServiceError>;
}
