//! Type registration and remote-compatibility checking.

use crate::activity::ActivityHandler;
use crate::error::RegistrationError;
use crate::service::{ServiceError, WorkflowService};
use decider_types::{ActivityTypeDescriptor, WorkflowTypeDescriptor};
use std::collections::HashMap;
use std::sync::Arc;

/// A registered workflow factory: a plain function pointer is enough here
/// since the runtime owns no shared mutable state across invocations.
pub type WorkflowFactory = fn(&mut crate::runtime::DecisionRuntime, decider_types::ArgsKwargs) -> crate::error::WorkflowFaultResult;

#[derive(Clone)]
pub struct TypeRegistry {
    workflows: HashMap<(String, String), (WorkflowTypeDescriptor, WorkflowFactory)>,
    activities: HashMap<(String, String), (ActivityTypeDescriptor, Arc<dyn ActivityHandler>)>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        TypeRegistry {
            workflows: HashMap::new(),
            activities: HashMap::new(),
        }
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a workflow descriptor without a name set; the registry
    /// stamps `key` as its name, matching the descriptor stored and the one
    /// reported to the remote service. `key` must be a stable string the
    /// caller controls — never a factory object.
    pub fn add_workflow(&mut self, key: impl Into<String>, descriptor: WorkflowTypeDescriptor, factory: WorkflowFactory) {
        let key = key.into();
        let stamped = descriptor.with_name(key.clone());
        self.workflows
            .insert((key, stamped.version.clone()), (stamped, factory));
    }

    pub fn add_activity(
        &mut self,
        key: impl Into<String>,
        descriptor: ActivityTypeDescriptor,
        handler: Arc<dyn ActivityHandler>,
    ) {
        let key = key.into();
        let stamped = descriptor.with_name(key.clone());
        self.activities
            .insert((key, stamped.version.clone()), (stamped, handler));
    }

    pub fn lookup_workflow(&self, name: &str, version: &str) -> Option<(&WorkflowTypeDescriptor, WorkflowFactory)> {
        self.workflows
            .get(&(name.to_string(), version.to_string()))
            .map(|(d, f)| (d, *f))
    }

    pub fn lookup_activity_handler(
        &self,
        name: &str,
        version: &str,
    ) -> Option<Arc<dyn ActivityHandler>> {
        self.activities
            .get(&(name.to_string(), version.to_string()))
            .map(|(_, h)| h.clone())
    }

    pub fn workflows(&self) -> impl Iterator<Item = &WorkflowTypeDescriptor> {
        self.workflows.values().map(|(d, _)| d)
    }

    pub fn activities(&self) -> impl Iterator<Item = &ActivityTypeDescriptor> {
        self.activities.values().map(|(d, _)| d)
    }

    /// Register every workflow and activity type with the remote service.
    /// On "already exists", describes the remote type and compares field by
    /// field; any mismatch raises [`RegistrationError::FieldMismatch`].
    pub async fn register_remote(
        &self,
        service: &Arc<dyn WorkflowService>,
        domain: &str,
    ) -> Result<(), RegistrationError> {
        for descriptor in self.workflows() {
            register_or_verify_workflow(service.as_ref(), domain, descriptor).await?;
        }
        for descriptor in self.activities() {
            register_or_verify_activity(service.as_ref(), domain, descriptor).await?;
        }
        Ok(())
    }
}

async fn register_or_verify_workflow(
    service: &dyn WorkflowService,
    domain: &str,
    descriptor: &WorkflowTypeDescriptor,
) -> Result<(), RegistrationError> {
    let name = descriptor.name.clone().unwrap_or_default();
    match service.register_workflow_type(domain, descriptor).await {
        Ok(()) => Ok(()),
        Err(ServiceError::AlreadyExists) => {
            let remote = service
                .describe_workflow_type(domain, &name, &descriptor.version)
                .await
                .map_err(|source| RegistrationError::Transport {
                    type_name: name.clone(),
                    version: descriptor.version.clone(),
                    source,
                })?;
            compare_fields(
                &name,
                &descriptor.version,
                &descriptor.canonical_fields(),
                &remote.canonical_fields(),
            )
        }
        Err(source) => Err(RegistrationError::Transport {
            type_name: name,
            version: descriptor.version.clone(),
            source,
        }),
    }
}

async fn register_or_verify_activity(
    service: &dyn WorkflowService,
    domain: &str,
    descriptor: &ActivityTypeDescriptor,
) -> Result<(), RegistrationError> {
    let name = descriptor.name.clone().unwrap_or_default();
    match service.register_activity_type(domain, descriptor).await {
        Ok(()) => Ok(()),
        Err(ServiceError::AlreadyExists) => {
            let remote = service
                .describe_activity_type(domain, &name, &descriptor.version)
                .await
                .map_err(|source| RegistrationError::Transport {
                    type_name: name.clone(),
                    version: descriptor.version.clone(),
                    source,
                })?;
            compare_fields(
                &name,
                &descriptor.version,
                &descriptor.canonical_fields(),
                &remote.canonical_fields(),
            )
        }
        Err(source) => Err(RegistrationError::Transport {
            type_name: name,
            version: descriptor.version.clone(),
            source,
        }),
    }
}

fn compare_fields(
    name: &str,
    version: &str,
    local: &[(&'static str, Option<String>)],
    remote: &[(&'static str, Option<String>)],
) -> Result<(), RegistrationError> {
    for (field, local_value) in local {
        let remote_value = remote
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v.clone())
            .unwrap_or(None);
        if *local_value != remote_value {
            return Err(RegistrationError::FieldMismatch {
                type_name: name.to_string(),
                version: version.to_string(),
                field,
                local: local_value.clone(),
                remote: remote_value,
            });
        }
    }
    Ok(())
}
