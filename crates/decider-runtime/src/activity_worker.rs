//! The activity worker loop: poll, decode input, run the registered
//! handler, respond completed/failed (or not at all, for a deferred task).

use crate::activity::{ActivityContext, ActivityOutcome};
use crate::registry::TypeRegistry;
use crate::service::{ActivityTask, PollActivityTaskRequest, WorkflowService};
use crate::WorkerConfig;
use decider_types::{Codec, REASON_SIZE};
use std::sync::Arc;

pub struct ActivityWorker {
    service: Arc<dyn WorkflowService>,
    registry: Arc<TypeRegistry>,
    config: WorkerConfig,
    codec: Arc<dyn Codec>,
}

impl ActivityWorker {
    pub fn new(
        service: Arc<dyn WorkflowService>,
        registry: Arc<TypeRegistry>,
        config: WorkerConfig,
        codec: Arc<dyn Codec>,
    ) -> Self {
        ActivityWorker {
            service,
            registry,
            config,
            codec,
        }
    }

    pub async fn register(&self) -> Result<(), crate::error::RegistrationError> {
        if self.config.register_remote {
            self.registry
                .register_remote(&self.service, &self.config.domain)
                .await?;
        }
        Ok(())
    }

    /// Poll once and process at most one activity task. Returns `false` when
    /// the poll came back empty.
    pub async fn run_once(&self) -> Result<bool, crate::service::ServiceError> {
        let task = self
            .service
            .poll_for_activity_task(PollActivityTaskRequest {
                domain: self.config.domain.clone(),
                task_list: self.config.task_list.clone(),
                identity: self.config.identity(),
            })
            .await?;
        let Some(task) = task else {
            return Ok(false);
        };
        self.process(task).await;
        Ok(true)
    }

    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!("activity worker shutting down");
                    return;
                }
                result = self.run_once() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "poll_for_activity_task failed");
                    }
                }
            }
        }
    }

    async fn process(&self, task: ActivityTask) {
        let Some(handler) = self
            .registry
            .lookup_activity_handler(&task.activity_type_name, &task.activity_type_version)
        else {
            tracing::error!(
                name = %task.activity_type_name,
                version = %task.activity_type_version,
                "no activity registered for this type"
            );
            self.fail(&task.task_token, "unknown activity type".to_string())
                .await;
            return;
        };

        let args = match self.codec.decode_args(&task.input) {
            Ok(a) => a,
            Err(e) => {
                self.fail(&task.task_token, e.to_string()).await;
                return;
            }
        };

        let ctx = ActivityContext::new(self.service.clone(), task.task_token.clone());
        match handler.execute(ctx, args).await {
            ActivityOutcome::Completed(value) => match self.codec.encode_result(&value) {
                Ok(payload) => {
                    let payload = payload.truncated(decider_types::RESULT_SIZE);
                    if let Err(e) = self
                        .service
                        .respond_activity_task_completed(&task.task_token, payload)
                        .await
                    {
                        tracing::error!(error = %e, "failed to respond activity completed");
                    }
                }
                Err(e) => self.fail(&task.task_token, e.to_string()).await,
            },
            ActivityOutcome::Failed(reason) => self.fail(&task.task_token, reason).await,
            ActivityOutcome::Deferred => {
                // Some other system owns this task token now; nothing to respond.
            }
        }
    }

    async fn fail(&self, task_token: &str, reason: String) {
        let reason = decider_types::truncate_to(&reason, REASON_SIZE);
        if let Err(e) = self
            .service
            .respond_activity_task_failed(task_token, reason)
            .await
        {
            tracing::error!(error = %e, "failed to respond activity failed");
        }
    }
}
