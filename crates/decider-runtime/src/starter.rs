//! Starting a new workflow execution from outside a decision turn.

use crate::service::{ServiceError, StartWorkflowExecutionRequest, WorkflowService};
use decider_types::{ArgsKwargs, ChildPolicy, Codec, CodecError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Per-start overrides layered onto the workflow type's own defaults.
#[derive(Clone, Debug, Default)]
pub struct StartOptions {
    pub workflow_id: Option<String>,
    pub task_list: Option<String>,
    pub execution_start_to_close_timeout: Option<Duration>,
    pub task_start_to_close_timeout: Option<Duration>,
    pub child_policy: Option<ChildPolicy>,
    pub tags: Vec<String>,
}

/// A bound starter for one workflow type/version: `start(args)` encodes and
/// issues a `StartWorkflowExecution`, returning whether a new execution was
/// actually created (`false` means a workflow with this id was already
/// running, so starting is idempotent).
pub struct Starter {
    service: Arc<dyn WorkflowService>,
    domain: String,
    name: String,
    version: String,
    codec: Arc<dyn Codec>,
    options: StartOptions,
}

impl Starter {
    pub fn new(
        service: Arc<dyn WorkflowService>,
        domain: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        codec: Arc<dyn Codec>,
        options: StartOptions,
    ) -> Self {
        Starter {
            service,
            domain: domain.into(),
            name: name.into(),
            version: version.into(),
            codec,
            options,
        }
    }

    pub async fn start(&self, args: &ArgsKwargs) -> Result<bool, StartError> {
        let input = self
            .codec
            .encode_args(args)?
            .truncated(decider_types::INPUT_SIZE);
        let workflow_id = self
            .options
            .workflow_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let started = self
            .service
            .start_workflow_execution(StartWorkflowExecutionRequest {
                domain: self.domain.clone(),
                workflow_id: Some(workflow_id),
                name: self.name.clone(),
                version: self.version.clone(),
                task_list: self.options.task_list.clone(),
                input,
                execution_start_to_close_timeout: self.options.execution_start_to_close_timeout,
                task_start_to_close_timeout: self.options.task_start_to_close_timeout,
                child_policy: self.options.child_policy,
                tags: decider_types::normalize_tags(&self.options.tags),
            })
            .await?;
        Ok(started)
    }
}
