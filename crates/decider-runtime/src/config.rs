//! Worker configuration. Deliberately a plain struct: parsing it out of a
//! file or environment is left to the caller, not bundled here.

use decider_types::default_identity;

/// What a workflow or activity worker needs to poll and respond against one
/// domain/task list.
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub domain: String,
    pub task_list: String,
    pub identity: Option<String>,
    /// Whether the worker should register/verify its types with the remote
    /// service before polling. Disabled in tests against a fresh in-memory
    /// service that has nothing to compare against.
    pub register_remote: bool,
}

impl WorkerConfig {
    pub fn new(domain: impl Into<String>, task_list: impl Into<String>) -> Self {
        WorkerConfig {
            domain: domain.into(),
            task_list: task_list.into(),
            identity: None,
            register_remote: true,
        }
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn with_register_remote(mut self, register_remote: bool) -> Self {
        self.register_remote = register_remote;
        self
    }

    /// The identity reported on every poll: the configured value, or a
    /// `<hostname>-<pid>` default.
    pub fn identity(&self) -> String {
        self.identity.clone().unwrap_or_else(default_identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_identity_is_used_when_unset() {
        let config = WorkerConfig::new("d", "tl");
        assert!(!config.identity().is_empty());
    }

    #[test]
    fn explicit_identity_wins() {
        let config = WorkerConfig::new("d", "tl").with_identity("worker-7");
        assert_eq!(config.identity(), "worker-7");
    }
}
