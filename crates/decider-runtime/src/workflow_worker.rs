//! The workflow worker loop: poll, fold history into a snapshot, invoke the
//! registered factory, flush the resulting decisions.

use crate::error::{DecisionTurnError, PaginationError};
use crate::registry::TypeRegistry;
use crate::runtime::{DecisionRuntime, WorkflowMeta};
use crate::service::{DecisionTask, PollDecisionTaskRequest, WorkflowService};
use crate::WorkerConfig;
use decider_history::{HistoryEvent, Snapshot};
use decider_types::Codec;
use std::sync::Arc;

/// Bounded retries for a single continuation page before the turn is
/// abandoned.
const PAGINATION_RETRY_BUDGET: u32 = 7;

pub struct WorkflowWorker {
    service: Arc<dyn WorkflowService>,
    registry: Arc<TypeRegistry>,
    config: WorkerConfig,
    codec: Arc<dyn Codec>,
}

impl WorkflowWorker {
    pub fn new(
        service: Arc<dyn WorkflowService>,
        registry: Arc<TypeRegistry>,
        config: WorkerConfig,
        codec: Arc<dyn Codec>,
    ) -> Self {
        WorkflowWorker {
            service,
            registry,
            config,
            codec,
        }
    }

    /// Register this worker's types with the remote service, if configured
    /// to do so. Call once before the first poll.
    pub async fn register(&self) -> Result<(), crate::error::RegistrationError> {
        if self.config.register_remote {
            self.registry
                .register_remote(&self.service, &self.config.domain)
                .await?;
        }
        Ok(())
    }

    /// Poll once and process at most one decision task. Returns `false` when
    /// the poll came back empty (a normal long-poll timeout).
    pub async fn run_once(&self) -> Result<bool, crate::service::ServiceError> {
        let task = self
            .service
            .poll_for_decision_task(PollDecisionTaskRequest {
                domain: self.config.domain.clone(),
                task_list: self.config.task_list.clone(),
                identity: self.config.identity(),
            })
            .await?;
        let Some(task) = task else {
            return Ok(false);
        };
        if let Err(e) = self.process(task).await {
            tracing::warn!(error = %e, "decision task abandoned");
        }
        Ok(true)
    }

    /// Poll in a loop until `shutdown` resolves.
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!("workflow worker shutting down");
                    return;
                }
                result = self.run_once() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "poll_for_decision_task failed");
                    }
                }
            }
        }
    }

    async fn process(&self, task: DecisionTask) -> Result<(), DecisionTurnError> {
        let events = self.fetch_full_history(&task).await?;
        let snapshot = match Snapshot::fold(&events) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "history failed to fold, abandoning turn");
                return Ok(());
            }
        };

        let Some((descriptor, factory)) = self
            .registry
            .lookup_workflow(&task.workflow_type_name, &task.workflow_type_version)
        else {
            tracing::error!(
                name = %task.workflow_type_name,
                version = %task.workflow_type_version,
                "no workflow registered for this type"
            );
            return Ok(());
        };

        let args = match self.codec.decode_args(&task.input) {
            Ok(a) => a,
            Err(e) => {
                tracing::error!(error = %e, "failed to decode workflow input, abandoning turn");
                return Ok(());
            }
        };

        let meta = WorkflowMeta {
            name: descriptor.name.clone().unwrap_or_default(),
            version: descriptor.version.clone(),
            domain: self.config.domain.clone(),
            default_task_list: descriptor.default_task_list.clone(),
            default_child_policy: descriptor.default_child_policy,
            tags: Vec::new(),
        };
        let random_token = uuid::Uuid::new_v4().to_string();
        let mut runtime = DecisionRuntime::new(meta, snapshot, random_token);
        let result = factory(&mut runtime, args);
        let decisions = runtime.finish(result, self.codec.as_ref());

        self.service
            .respond_decision_task_completed(&task.task_token, decisions)
            .await
            .map_err(DecisionTurnError::Flush)?;
        Ok(())
    }

    async fn fetch_full_history(
        &self,
        task: &DecisionTask,
    ) -> Result<Vec<HistoryEvent>, PaginationError> {
        let mut events = task.first_page.events.clone();
        let mut next_page_token = task.first_page.next_page_token.clone();
        let mut attempts = 0;

        while let Some(token) = next_page_token {
            match self
                .service
                .get_history_page(&task.task_token, Some(&token))
                .await
            {
                Ok(page) => {
                    events.extend(page.events);
                    next_page_token = page.next_page_token;
                    attempts = 0;
                }
                Err(e) => {
                    attempts += 1;
                    if attempts > PAGINATION_RETRY_BUDGET {
                        return Err(PaginationError {
                            attempts,
                            last_error: e.to_string(),
                        });
                    }
                    next_page_token = Some(token);
                }
            }
        }
        Ok(events)
    }
}
