//! # Document Store Bridge
//!
//! External persistence engines plug in by implementing [`DocumentStore`], a JSON-document
//! CRUD surface keyed by collection and id. [`DocumentRepository`] lifts such a store into
//! a typed [`ResourceRepository`], handling identity assignment, (de)serialisation and the
//! per-operation deadlines.

use super::error::RepositoryError;
use super::instance::{Identified, ObjectId};
use super::{ReadOptions, RepositoryOptions, RepositoryTimeouts, ResourceRepository};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Raw document CRUD implemented by a storage engine.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_one(&self, collection: &str, id: &str) -> Result<Option<Value>, RepositoryError>;

    async fn find(
        &self,
        collection: &str,
        filter: &Map<String, Value>,
    ) -> Result<Vec<Value>, RepositoryError>;

    /// Inserts a new document. Must fail with [`RepositoryError::Conflict`] when `id` exists.
    async fn insert(&self, collection: &str, id: &str, document: Value) -> Result<(), RepositoryError>;

    /// Replaces a document, returning `false` when nothing matched `id`.
    async fn replace(&self, collection: &str, id: &str, document: Value) -> Result<bool, RepositoryError>;

    /// Removes a document, returning `false` when nothing matched `id`.
    async fn remove(&self, collection: &str, id: &str) -> Result<bool, RepositoryError>;
}

/// Typed repository over a [`DocumentStore`] collection.
pub struct DocumentRepository<T> {
    store: Arc<dyn DocumentStore>,
    collection: String,
    options: RepositoryOptions,
    timeouts: RepositoryTimeouts,
    _marker: PhantomData<fn() -> T>,
}

impl<T> DocumentRepository<T> {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
        options: RepositoryOptions,
        timeouts: RepositoryTimeouts,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            options,
            timeouts,
            _marker: PhantomData,
        }
    }
}

async fn bounded<R>(
    operation: &'static str,
    deadline: Duration,
    work: impl Future<Output = Result<R, RepositoryError>>,
) -> Result<R, RepositoryError> {
    tokio::time::timeout(deadline, work)
        .await
        .map_err(|_| RepositoryError::Timeout {
            operation,
            after: deadline,
        })?
}

#[async_trait]
impl<T> ResourceRepository<T> for DocumentRepository<T>
where
    T: Identified + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn instance(&self, id: &str, _options: &ReadOptions) -> Result<T, RepositoryError> {
        let document = bounded(
            "instance",
            self.timeouts.point,
            self.store.find_one(&self.collection, id),
        )
        .await?
        .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        Ok(serde_json::from_value(document)?)
    }

    async fn list(&self, options: &ReadOptions) -> Result<Vec<T>, RepositoryError> {
        let documents = bounded(
            "list",
            self.timeouts.list,
            self.store.find(&self.collection, &options.filter),
        )
        .await?;
        debug!(collection = %self.collection, matched = documents.len(), "List");
        documents
            .into_iter()
            .map(|document| serde_json::from_value(document).map_err(RepositoryError::from))
            .collect()
    }

    async fn create(&self, mut item: T) -> Result<T, RepositoryError> {
        let id = match item.identity().filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None if self.options.auto_generate_id => {
                let id = ObjectId::new().to_string();
                item.set_identity(id.clone());
                id
            }
            None => return Err(RepositoryError::BadRequest("missing id".into())),
        };
        let document = serde_json::to_value(&item)?;
        bounded(
            "create",
            self.timeouts.point,
            self.store.insert(&self.collection, &id, document),
        )
        .await?;
        Ok(item)
    }

    async fn update(&self, id: &str, mut item: T) -> Result<T, RepositoryError> {
        item.set_identity(id.to_string());
        let document = serde_json::to_value(&item)?;
        let matched = bounded(
            "update",
            self.timeouts.point,
            self.store.replace(&self.collection, id, document),
        )
        .await?;
        if matched {
            Ok(item)
        } else {
            Err(RepositoryError::NotFound(id.to_string()))
        }
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let removed = bounded(
            "delete",
            self.timeouts.point,
            self.store.remove(&self.collection, id),
        )
        .await?;
        if removed {
            Ok(())
        } else {
            Err(RepositoryError::NotFound(id.to_string()))
        }
    }
}
