//! # Services
//!
//! An [`EndorService`] is what the transport exposes: a resource name and a flat map of
//! method key to [`EndorServiceAction`]. Keys are either a bare verb (`list`) or
//! `<category>/<verb>`.
//!
//! Services are either declared directly, action by action, or composed by
//! [`EndorHybridService`] from a base model and its categories. Both end up as the same
//! immutable value, shared read-only by every request once startup is over.

pub mod defaults;
pub mod error;
pub mod hybrid;

pub use error::RegistrationError;
pub use hybrid::{EndorHybridService, HybridRepository, HybridSchemas, SpecializedCategoryInfo};

use crate::action::EndorServiceAction;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct EndorService {
    pub resource: String,
    pub description: String,
    pub priority: Option<i32>,
    /// Path version segment, `v1` when unset.
    pub version: Option<String>,
    methods: BTreeMap<String, EndorServiceAction>,
}

impl EndorService {
    pub fn new(resource: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            description: description.into(),
            priority: None,
            version: None,
            methods: BTreeMap::new(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Adds an action, failing if the key is taken.
    pub fn with_action(
        mut self,
        method: impl Into<String>,
        action: EndorServiceAction,
    ) -> Result<Self, RegistrationError> {
        self.add_action(method, action)?;
        Ok(self)
    }

    pub fn add_action(
        &mut self,
        method: impl Into<String>,
        action: EndorServiceAction,
    ) -> Result<(), RegistrationError> {
        let method = method.into();
        if self.methods.contains_key(&method) {
            return Err(RegistrationError::ActionCollision {
                resource: self.resource.clone(),
                method,
            });
        }
        self.methods.insert(method, action);
        Ok(())
    }

    pub fn methods(&self) -> &BTreeMap<String, EndorServiceAction> {
        &self.methods
    }

    pub fn action(&self, method: &str) -> Option<&EndorServiceAction> {
        self.methods.get(method)
    }

    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or("v1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Context, NoPayload, Response};

    fn ping() -> EndorServiceAction {
        EndorServiceAction::new("Ping", |_: Context<NoPayload>| async {
            Ok(Response::<()>::default())
        })
    }

    #[test]
    fn duplicate_method_keys_are_rejected() {
        let service = EndorService::new("health", "Health checks")
            .with_action("ping", ping())
            .unwrap();
        let err = service.with_action("ping", ping()).unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::ActionCollision { ref method, .. } if method == "ping"
        ));
    }

    #[test]
    fn version_defaults_to_v1() {
        let service = EndorService::new("health", "Health checks");
        assert_eq!(service.version(), "v1");
        assert_eq!(service.with_version("v2").version(), "v2");
    }
}
