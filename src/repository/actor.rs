//! # In-Memory Repository Actor
//!
//! The `memory` backend. A [`RepositoryActor`] owns its records and processes
//! [`RepositoryRequest`]s one at a time in its own task, so the store needs no lock. Callers
//! talk to it through the cloneable [`RepositoryClient`].

use super::client::RepositoryClient;
use super::error::RepositoryError;
use super::instance::{Identified, ObjectId};
use super::message::RepositoryRequest;
use super::{RepositoryOptions, RepositoryTimeouts};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Server half of the memory backend.
///
/// Records are kept in a `BTreeMap` keyed by identity, so `list` returns them in id order.
pub struct RepositoryActor<T> {
    resource: String,
    receiver: mpsc::Receiver<RepositoryRequest<T>>,
    store: BTreeMap<String, T>,
    options: RepositoryOptions,
}

impl<T> RepositoryActor<T>
where
    T: Identified + Serialize + Clone + Send + 'static,
{
    /// Creates the actor and its client. The actor does nothing until [`run`](Self::run)
    /// is spawned.
    pub fn new(
        resource: impl Into<String>,
        buffer_size: usize,
        options: RepositoryOptions,
        timeouts: RepositoryTimeouts,
    ) -> (Self, RepositoryClient<T>) {
        let resource = resource.into();
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            resource: resource.clone(),
            receiver,
            store: BTreeMap::new(),
            options,
        };
        (actor, RepositoryClient::new(resource, sender, timeouts))
    }

    /// Processes requests until every client has been dropped.
    pub async fn run(mut self) {
        let resource = self.resource.clone();
        info!(%resource, "Repository started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                RepositoryRequest::Instance { id, respond_to } => {
                    let item = self.store.get(&id).cloned();
                    debug!(%resource, %id, found = item.is_some(), "Instance");
                    let _ = respond_to.send(item.ok_or(RepositoryError::NotFound(id)));
                }
                RepositoryRequest::List { filter, respond_to } => {
                    let items: Vec<T> = self
                        .store
                        .values()
                        .filter(|item| matches_filter(*item, &filter))
                        .cloned()
                        .collect();
                    debug!(%resource, matched = items.len(), size = self.store.len(), "List");
                    let _ = respond_to.send(Ok(items));
                }
                RepositoryRequest::Create { item, respond_to } => {
                    let result = self.create(item);
                    match &result {
                        Ok(item) => info!(
                            %resource,
                            id = item.identity().unwrap_or_default(),
                            size = self.store.len(),
                            "Created"
                        ),
                        Err(e) => warn!(%resource, error = %e, "Create failed"),
                    }
                    let _ = respond_to.send(result);
                }
                RepositoryRequest::Update {
                    id,
                    mut item,
                    respond_to,
                } => {
                    if let Some(slot) = self.store.get_mut(&id) {
                        item.set_identity(id.clone());
                        *slot = item.clone();
                        info!(%resource, %id, "Updated");
                        let _ = respond_to.send(Ok(item));
                    } else {
                        warn!(%resource, %id, "Not found");
                        let _ = respond_to.send(Err(RepositoryError::NotFound(id)));
                    }
                }
                RepositoryRequest::Delete { id, respond_to } => {
                    if self.store.remove(&id).is_some() {
                        info!(%resource, %id, size = self.store.len(), "Deleted");
                        let _ = respond_to.send(Ok(()));
                    } else {
                        warn!(%resource, %id, "Not found");
                        let _ = respond_to.send(Err(RepositoryError::NotFound(id)));
                    }
                }
            }
        }

        info!(%resource, size = self.store.len(), "Shutdown");
    }

    fn create(&mut self, mut item: T) -> Result<T, RepositoryError> {
        let id = match item.identity().filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None if self.options.auto_generate_id => {
                let id = ObjectId::new().to_string();
                item.set_identity(id.clone());
                id
            }
            None => return Err(RepositoryError::BadRequest("missing id".into())),
        };
        if self.store.contains_key(&id) {
            return Err(RepositoryError::Conflict(id));
        }
        self.store.insert(id, item.clone());
        Ok(item)
    }
}

/// Top-level equality match of `filter` against the serialised record.
pub(crate) fn matches_filter<T: Serialize>(item: &T, filter: &Map<String, Value>) -> bool {
    if filter.is_empty() {
        return true;
    }
    match serde_json::to_value(item) {
        Ok(Value::Object(fields)) => filter
            .iter()
            .all(|(key, expected)| fields.get(key) == Some(expected)),
        Ok(_) => false,
        Err(e) => {
            warn!(error = %e, "Unable to serialize record for filtering");
            false
        }
    }
}
