//! Startup orchestration.
//!
//! [`ServiceRegistry`] collects everything a microservice is made of and [`start`] wires it
//! together: repositories are built, hybrids are composed, resources are checked for
//! uniqueness. The resulting [`EndorApp`] is immutable and only dispatches.
//!
//! [`start`]: ServiceRegistry::start

use super::config::EndorConfig;
use crate::action::{
    ActionOutcome, ActionRequest, DevelopmentIdentity, IdentityProvider, Pipeline,
};
use crate::error::EndorError;
use crate::event::EventBus;
use crate::openapi::{self, OpenApiDocument, OpenApiError};
use crate::repository::{
    DocumentStore, RepositoryError, RepositoryFactory, RepositoryOptions, RepositoryTimeouts,
    ResourceInstance, ResourceModel,
};
use crate::service::{EndorHybridService, EndorService, RegistrationError};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// A hybrid declaration whose model type has been erased.
pub trait HybridRegistration: Send + Sync {
    fn resource(&self) -> &str;

    /// Builds the repository on `kind` and composes the service over it.
    fn register(&self, factory: &RepositoryFactory, kind: &str) -> Result<EndorService, RegistrationError>;

    fn persistence(&self) -> Option<&str>;
}

impl<T: ResourceModel> HybridRegistration for EndorHybridService<T> {
    fn resource(&self) -> &str {
        EndorHybridService::resource(self)
    }

    fn register(&self, factory: &RepositoryFactory, kind: &str) -> Result<EndorService, RegistrationError> {
        let repository = factory
            .create::<ResourceInstance<T>>(kind, self.resource())
            .map_err(|source| RegistrationError::Repository {
                resource: self.resource().to_string(),
                source,
            })?;
        self.compose(repository)
    }

    fn persistence(&self) -> Option<&str> {
        EndorHybridService::persistence(self)
    }
}

pub struct ServiceRegistry {
    config: EndorConfig,
    services: Vec<EndorService>,
    hybrids: Vec<Box<dyn HybridRegistration>>,
    identity: Option<Arc<dyn IdentityProvider>>,
    event_bus: Option<Arc<dyn EventBus>>,
    factory: RepositoryFactory,
}

impl ServiceRegistry {
    pub fn new(config: EndorConfig) -> Self {
        Self {
            config,
            services: Vec::new(),
            hybrids: Vec::new(),
            identity: None,
            event_bus: None,
            factory: RepositoryFactory::new(),
        }
    }

    pub fn register_service(mut self, service: EndorService) -> Self {
        self.services.push(service);
        self
    }

    pub fn register_hybrid<T: ResourceModel>(mut self, hybrid: EndorHybridService<T>) -> Self {
        self.hybrids.push(Box::new(hybrid));
        self
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<dyn EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Makes `store` available as persistence kind `kind`.
    pub fn with_backend(mut self, kind: impl Into<String>, store: Arc<dyn DocumentStore>) -> Self {
        self.factory.register_backend(kind, store);
        self
    }

    pub fn with_repository_options(mut self, options: RepositoryOptions) -> Self {
        self.factory = self.factory.with_options(options);
        self
    }

    pub fn with_repository_timeouts(mut self, timeouts: RepositoryTimeouts) -> Self {
        self.factory = self.factory.with_timeouts(timeouts);
        self
    }

    /// Builds every service and returns the running app.
    ///
    /// Must be called inside a tokio runtime: memory repositories spawn their actors here.
    pub async fn start(self) -> Result<EndorApp, RegistrationError> {
        let Self {
            config,
            services: flat,
            hybrids,
            identity,
            event_bus,
            factory,
        } = self;

        let identity = match identity {
            Some(identity) => identity,
            None if config.is_development() => {
                warn!("No identity provider, every request gets the development session");
                Arc::new(DevelopmentIdentity)
            }
            None => {
                error!(environment = %config.environment, "No identity provider");
                return Err(RegistrationError::MissingIdentityProvider);
            }
        };

        let mut services = BTreeMap::new();
        for service in flat {
            insert_unique(&mut services, service)?;
        }
        for hybrid in &hybrids {
            let kind = hybrid
                .persistence()
                .unwrap_or(&config.default_persistence)
                .to_string();
            if !config.allows(&kind) {
                error!(resource = hybrid.resource(), %kind, "Persistence kind not allowed");
                return Err(RegistrationError::Repository {
                    resource: hybrid.resource().to_string(),
                    source: RepositoryError::UnsupportedBackend(kind),
                });
            }
            let service = hybrid.register(&factory, &kind).inspect_err(|e| {
                error!(resource = hybrid.resource(), error = %e, "Registration failed");
            })?;
            insert_unique(&mut services, service)?;
        }

        let mut pipeline = Pipeline::new(config.microservice_id.clone(), identity);
        if let Some(event_bus) = event_bus {
            pipeline = pipeline.with_event_bus(event_bus);
        }

        info!(
            microservice = %config.microservice_id,
            environment = %config.environment,
            port = config.port,
            services = services.len(),
            "Started"
        );
        Ok(EndorApp {
            config,
            pipeline,
            services,
            factory,
        })
    }
}

fn insert_unique(
    services: &mut BTreeMap<String, EndorService>,
    service: EndorService,
) -> Result<(), RegistrationError> {
    if services.contains_key(&service.resource) {
        error!(resource = %service.resource, "Duplicate resource");
        return Err(RegistrationError::DuplicateResource(service.resource));
    }
    info!(
        resource = %service.resource,
        version = service.version(),
        actions = service.methods().len(),
        "Service registered"
    );
    services.insert(service.resource.clone(), service);
    Ok(())
}

/// A started microservice. Read-only: requests share it without locking.
pub struct EndorApp {
    config: EndorConfig,
    pipeline: Pipeline,
    services: BTreeMap<String, EndorService>,
    factory: RepositoryFactory,
}

impl EndorApp {
    pub fn config(&self) -> &EndorConfig {
        &self.config
    }

    /// Services ordered by resource name.
    pub fn services(&self) -> Vec<&EndorService> {
        self.services.values().collect()
    }

    pub fn service(&self, resource: &str) -> Option<&EndorService> {
        self.services.get(resource)
    }

    /// Runs one request through the pipeline of `resource`'s `method` action.
    pub async fn dispatch(&self, resource: &str, method: &str, request: ActionRequest) -> ActionOutcome {
        let action = match self.services.get(resource) {
            Some(service) => service.action(method),
            None => None,
        };
        match action {
            Some(action) => self.pipeline.execute(resource, method, action, request).await,
            None => {
                warn!(resource, action = method, "No such action");
                ActionOutcome::rejected(
                    &EndorError::not_found(format!("{resource}/{method} not found")),
                    self.pipeline.microservice_id(),
                )
            }
        }
    }

    /// The OpenAPI document of every registered service.
    pub fn openapi(&self, title: &str, host: &str, path_template: &str) -> Result<OpenApiDocument, OpenApiError> {
        let services: Vec<EndorService> = self.services.values().cloned().collect();
        openapi::build(title, host, &services, path_template)
    }

    /// Drops every service and waits for repository actors to stop.
    pub async fn shutdown(self) {
        info!(microservice = %self.config.microservice_id, "Shutting down");
        let Self {
            pipeline,
            services,
            factory,
            ..
        } = self;
        drop(services);
        drop(pipeline);
        factory.join().await;
        info!("Shutdown complete");
    }
}
