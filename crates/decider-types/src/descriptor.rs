//! Type descriptors: the data a registry registers/compares and the data a
//! proxy carries into a scheduling decision.

use crate::child_policy::ChildPolicy;
use crate::payload::Codec;
use std::sync::Arc;
use std::time::Duration;

/// Everything the remote service needs to know about a workflow type, and
/// everything the registry compares when checking compatibility with an
/// already-registered remote type.
#[derive(Clone, Debug)]
pub struct WorkflowTypeDescriptor {
    pub name: Option<String>,
    pub version: String,
    pub default_task_list: Option<String>,
    pub default_child_policy: Option<ChildPolicy>,
    pub default_execution_start_to_close_timeout: Option<Duration>,
    pub default_task_start_to_close_timeout: Option<Duration>,
}

impl WorkflowTypeDescriptor {
    pub fn new(version: impl Into<String>) -> Self {
        WorkflowTypeDescriptor {
            name: None,
            version: version.into(),
            default_task_list: None,
            default_child_policy: None,
            default_execution_start_to_close_timeout: None,
            default_task_start_to_close_timeout: None,
        }
    }

    /// Stamp a name onto a clone of this descriptor. The registry calls this
    /// with the factory's own stable key when the descriptor was built
    /// without an explicit name; it never mutates a shared descriptor in
    /// place and never stamps the factory object itself.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        let mut d = self.clone();
        d.name = Some(name.into());
        d
    }

    /// `(field, value)` pairs compared verbatim against a remote
    /// `describe_workflow_type` response during registration.
    pub fn canonical_fields(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            (
                "default_task_list",
                self.default_task_list.clone(),
            ),
            (
                "default_child_policy",
                self.default_child_policy.map(|p| p.to_string()),
            ),
            (
                "default_execution_start_to_close_timeout",
                self.default_execution_start_to_close_timeout
                    .map(|d| d.as_secs().to_string()),
            ),
            (
                "default_task_start_to_close_timeout",
                self.default_task_start_to_close_timeout
                    .map(|d| d.as_secs().to_string()),
            ),
        ]
    }
}

/// Everything the remote service needs to know about an activity type.
#[derive(Clone, Debug)]
pub struct ActivityTypeDescriptor {
    pub name: Option<String>,
    pub version: String,
    pub default_task_list: Option<String>,
    pub default_task_heartbeat_timeout: Option<Duration>,
    pub default_task_schedule_to_close_timeout: Option<Duration>,
    pub default_task_schedule_to_start_timeout: Option<Duration>,
    pub default_task_start_to_close_timeout: Option<Duration>,
}

impl ActivityTypeDescriptor {
    pub fn new(version: impl Into<String>) -> Self {
        ActivityTypeDescriptor {
            name: None,
            version: version.into(),
            default_task_list: None,
            default_task_heartbeat_timeout: None,
            default_task_schedule_to_close_timeout: None,
            default_task_schedule_to_start_timeout: None,
            default_task_start_to_close_timeout: None,
        }
    }

    pub fn with_name(&self, name: impl Into<String>) -> Self {
        let mut d = self.clone();
        d.name = Some(name.into());
        d
    }

    pub fn canonical_fields(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("default_task_list", self.default_task_list.clone()),
            (
                "default_task_heartbeat_timeout",
                self.default_task_heartbeat_timeout
                    .map(|d| d.as_secs().to_string()),
            ),
            (
                "default_task_schedule_to_close_timeout",
                self.default_task_schedule_to_close_timeout
                    .map(|d| d.as_secs().to_string()),
            ),
            (
                "default_task_schedule_to_start_timeout",
                self.default_task_schedule_to_start_timeout
                    .map(|d| d.as_secs().to_string()),
            ),
            (
                "default_task_start_to_close_timeout",
                self.default_task_start_to_close_timeout
                    .map(|d| d.as_secs().to_string()),
            ),
        ]
    }
}

/// Per-dependency scheduling parameters a workflow body uses to invoke an
/// activity or a sub-workflow: name/version to schedule, retry/delay
/// governing the call-id allocation window, optional per-call overrides, and
/// the codec used to serialize this dependency's arguments and result.
#[derive(Clone)]
pub struct ProxyDescriptor {
    pub dep_name: String,
    pub name: String,
    pub version: String,
    pub task_list: Option<String>,
    pub retry: u32,
    pub delay: Option<Duration>,
    pub heartbeat_timeout: Option<Duration>,
    pub schedule_to_close_timeout: Option<Duration>,
    pub schedule_to_start_timeout: Option<Duration>,
    pub start_to_close_timeout: Option<Duration>,
    pub child_policy: Option<ChildPolicy>,
    pub tags: Vec<String>,
    pub codec: Arc<dyn Codec>,
}

impl ProxyDescriptor {
    pub fn new(
        dep_name: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        codec: Arc<dyn Codec>,
    ) -> Self {
        ProxyDescriptor {
            dep_name: dep_name.into(),
            name: name.into(),
            version: version.into(),
            task_list: None,
            retry: 0,
            delay: None,
            heartbeat_timeout: None,
            schedule_to_close_timeout: None,
            schedule_to_start_timeout: None,
            start_to_close_timeout: None,
            child_policy: None,
            tags: Vec::new(),
            codec,
        }
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_task_list(mut self, task_list: impl Into<String>) -> Self {
        self.task_list = Some(task_list.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = crate::normalize_tags(&tags);
        self
    }

    /// Number of call-ids this invocation reserves: one slot for the call
    /// itself, one more if it is delayed (the timer), plus the retry budget.
    pub fn reserved_window(&self) -> u64 {
        1 + u64::from(self.delay.is_some()) + u64::from(self.retry)
    }
}

impl std::fmt::Debug for ProxyDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyDescriptor")
            .field("dep_name", &self.dep_name)
            .field("name", &self.name)
            .field("version", &self.version)
            .field("task_list", &self.task_list)
            .field("retry", &self.retry)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::JsonCodec;

    #[test]
    fn reserved_window_matches_allocation_rule() {
        let codec: Arc<dyn Codec> = Arc::new(JsonCodec);
        let d = ProxyDescriptor::new("dep", "Name", "1.0", codec.clone());
        assert_eq!(d.reserved_window(), 1);

        let d = ProxyDescriptor::new("dep", "Name", "1.0", codec.clone()).with_retry(3);
        assert_eq!(d.reserved_window(), 4);

        let d = ProxyDescriptor::new("dep", "Name", "1.0", codec)
            .with_retry(3)
            .with_delay(Duration::from_secs(5));
        assert_eq!(d.reserved_window(), 5);
    }

    #[test]
    fn with_name_clones_rather_than_mutates() {
        let base = WorkflowTypeDescriptor::new("1.0");
        let stamped = base.with_name("MyWorkflow");
        assert_eq!(base.name, None);
        assert_eq!(stamped.name.as_deref(), Some("MyWorkflow"));
    }
}
