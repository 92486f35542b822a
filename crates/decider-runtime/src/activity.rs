//! The activity side of the contract: a handler executes against an
//! [`ActivityContext`] that exposes heartbeating, and returns an
//! [`ActivityOutcome`] the worker loop turns into a service response.

use crate::service::WorkflowService;
use decider_types::ArgsKwargs;
use std::sync::Arc;

/// What an activity handler hands back. Most activities are synchronous —
/// they run to completion inside `execute` and return `Completed`/`Failed`.
/// `Deferred` is for manual-completion activities: the handler hands the
/// task token to some other system and returns without the worker
/// responding at all.
#[derive(Clone, Debug, PartialEq)]
pub enum ActivityOutcome {
    Completed(serde_json::Value),
    Failed(String),
    Deferred,
}

/// The handle passed into a running activity. Wraps the service client and
/// this task's token so a long-running activity can report liveness and
/// notice a pending cancellation.
#[derive(Clone)]
pub struct ActivityContext {
    service: Arc<dyn WorkflowService>,
    task_token: String,
}

impl ActivityContext {
    pub fn new(service: Arc<dyn WorkflowService>, task_token: String) -> Self {
        ActivityContext {
            service,
            task_token,
        }
    }

    pub fn task_token(&self) -> &str {
        &self.task_token
    }

    /// Record a heartbeat. Returns `true` if the execution has a pending
    /// cancellation request, `false` either way on a transport error — the
    /// service will simply time the activity out if heartbeats keep failing.
    pub async fn heartbeat(&self) -> bool {
        match self
            .service
            .record_activity_task_heartbeat(&self.task_token)
            .await
        {
            Ok(cancel_requested) => cancel_requested,
            Err(e) => {
                tracing::warn!(error = %e, "heartbeat failed");
                false
            }
        }
    }
}

#[async_trait::async_trait]
pub trait ActivityHandler: Send + Sync {
    async fn execute(&self, ctx: ActivityContext, args: ArgsKwargs) -> ActivityOutcome;
}

/// Adapts a plain async closure into an [`ActivityHandler`], for the common
/// case of an activity with no need for the context.
pub struct FnActivity<F>(pub F);

#[async_trait::async_trait]
impl<F, Fut> ActivityHandler for FnActivity<F>
where
    F: Fn(ArgsKwargs) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = ActivityOutcome> + Send,
{
    async fn execute(&self, _ctx: ActivityContext, args: ArgsKwargs) -> ActivityOutcome {
        (self.0)(args).await
    }
}
