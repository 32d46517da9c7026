//! # Repository Client
//!
//! The interface half of the memory backend. Cheap to clone; every clone talks to the same
//! actor. Each call is bounded by the configured deadline and reports a
//! [`RepositoryError::Timeout`] instead of waiting forever on a stuck actor.

use super::error::RepositoryError;
use super::message::{RepositoryRequest, Responder};
use super::{ReadOptions, RepositoryTimeouts, ResourceRepository};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

pub struct RepositoryClient<T> {
    resource: Arc<str>,
    sender: mpsc::Sender<RepositoryRequest<T>>,
    timeouts: RepositoryTimeouts,
}

impl<T> Clone for RepositoryClient<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
            sender: self.sender.clone(),
            timeouts: self.timeouts,
        }
    }
}

impl<T: Send + 'static> RepositoryClient<T> {
    pub fn new(
        resource: impl Into<Arc<str>>,
        sender: mpsc::Sender<RepositoryRequest<T>>,
        timeouts: RepositoryTimeouts,
    ) -> Self {
        Self {
            resource: resource.into(),
            sender,
            timeouts,
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    async fn call<R>(
        &self,
        operation: &'static str,
        deadline: Duration,
        request: impl FnOnce(Responder<R>) -> RepositoryRequest<T>,
    ) -> Result<R, RepositoryError> {
        let (respond_to, response) = oneshot::channel();
        let exchange = async {
            self.sender
                .send(request(respond_to))
                .await
                .map_err(|_| RepositoryError::Closed)?;
            response.await.map_err(|_| RepositoryError::Dropped)?
        };
        tokio::time::timeout(deadline, exchange)
            .await
            .map_err(|_| RepositoryError::Timeout {
                operation,
                after: deadline,
            })?
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> ResourceRepository<T> for RepositoryClient<T> {
    async fn instance(&self, id: &str, _options: &ReadOptions) -> Result<T, RepositoryError> {
        let id = id.to_string();
        self.call("instance", self.timeouts.point, |respond_to| {
            RepositoryRequest::Instance { id, respond_to }
        })
        .await
    }

    async fn list(&self, options: &ReadOptions) -> Result<Vec<T>, RepositoryError> {
        let filter = options.filter.clone();
        self.call("list", self.timeouts.list, |respond_to| RepositoryRequest::List {
            filter,
            respond_to,
        })
        .await
    }

    async fn create(&self, item: T) -> Result<T, RepositoryError> {
        self.call("create", self.timeouts.point, |respond_to| {
            RepositoryRequest::Create { item, respond_to }
        })
        .await
    }

    async fn update(&self, id: &str, item: T) -> Result<T, RepositoryError> {
        let id = id.to_string();
        self.call("update", self.timeouts.point, |respond_to| {
            RepositoryRequest::Update {
                id,
                item,
                respond_to,
            }
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let id = id.to_string();
        self.call("delete", self.timeouts.point, |respond_to| {
            RepositoryRequest::Delete { id, respond_to }
        })
        .await
    }
}
