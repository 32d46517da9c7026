//! Backend selection by persistence kind.

use super::actor::RepositoryActor;
use super::document::{DocumentRepository, DocumentStore};
use super::error::RepositoryError;
use super::instance::Identified;
use super::{RepositoryOptions, RepositoryTimeouts, ResourceRepository};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Kind name of the built-in actor-backed store.
pub const MEMORY_BACKEND: &str = "memory";

const ACTOR_BUFFER: usize = 64;

/// Builds repositories for a persistence kind.
///
/// `memory` is always available. Other kinds must be registered with
/// [`register_backend`](Self::register_backend) before use.
pub struct RepositoryFactory {
    backends: HashMap<String, Arc<dyn DocumentStore>>,
    options: RepositoryOptions,
    timeouts: RepositoryTimeouts,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for RepositoryFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryFactory {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            options: RepositoryOptions::default(),
            timeouts: RepositoryTimeouts::default(),
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn with_options(mut self, options: RepositoryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_timeouts(mut self, timeouts: RepositoryTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn register_backend(&mut self, kind: impl Into<String>, store: Arc<dyn DocumentStore>) {
        let kind = kind.into();
        info!(%kind, "Backend registered");
        self.backends.insert(kind, store);
    }

    pub fn supports(&self, kind: &str) -> bool {
        kind == MEMORY_BACKEND || self.backends.contains_key(kind)
    }

    /// Creates the repository of `resource` on the `kind` backend.
    ///
    /// The memory backend spawns its actor on the current tokio runtime.
    pub fn create<T>(
        &self,
        kind: &str,
        resource: &str,
    ) -> Result<Arc<dyn ResourceRepository<T>>, RepositoryError>
    where
        T: Identified + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        if kind == MEMORY_BACKEND {
            let runtime = tokio::runtime::Handle::try_current()
                .map_err(|e| RepositoryError::Backend(e.to_string()))?;
            let (actor, client) =
                RepositoryActor::<T>::new(resource, ACTOR_BUFFER, self.options, self.timeouts);
            let handle = runtime.spawn(actor.run());
            self.handles
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(handle);
            return Ok(Arc::new(client));
        }

        match self.backends.get(kind) {
            Some(store) => Ok(Arc::new(DocumentRepository::<T>::new(
                store.clone(),
                resource,
                self.options,
                self.timeouts,
            ))),
            None => {
                error!(%kind, %resource, "Unsupported persistence kind");
                Err(RepositoryError::UnsupportedBackend(kind.to_string()))
            }
        }
    }

    /// Waits for every actor spawned by this factory to stop.
    ///
    /// Actors stop once all their clients are dropped.
    pub async fn join(&self) {
        let handles: Vec<_> = self
            .handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = ?e, "Repository task failed");
            }
        }
    }
}
