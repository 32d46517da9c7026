//! # Repository Contract
//!
//! Persistence is an external collaborator. Endor only depends on the
//! [`ResourceRepository`] contract: five CRUD operations over an element type, each bounded
//! by its own deadline.
//!
//! | Operation | Missing id | Identity collision |
//! |-----------|------------|--------------------|
//! | `instance` | [`RepositoryError::NotFound`] | n/a |
//! | `list` | n/a | n/a |
//! | `create` | n/a | [`RepositoryError::Conflict`] |
//! | `update` | [`RepositoryError::NotFound`] | n/a |
//! | `delete` | [`RepositoryError::NotFound`] | n/a |
//!
//! `instance` reports a missing record as an explicit `NotFound` error; it never returns an
//! empty value.
//!
//! Two backends ship with the crate:
//!
//! - `memory`: a [`RepositoryActor`] owning its records, reached through a
//!   [`RepositoryClient`];
//! - any registered [`DocumentStore`], wrapped by [`DocumentRepository`].
//!
//! The [`RepositoryFactory`] picks one by persistence kind. [`mock::MockRepository`] stands in
//! for either in tests.

pub mod actor;
pub mod client;
pub mod document;
pub mod error;
pub mod factory;
pub mod instance;
pub mod message;
pub mod mock;

pub use actor::RepositoryActor;
pub use client::RepositoryClient;
pub use document::{DocumentRepository, DocumentStore};
pub use error::RepositoryError;
pub use factory::{RepositoryFactory, MEMORY_BACKEND};
pub use instance::{Identified, ObjectId, ResourceInstance, ResourceModel, CATEGORY_KEY};
pub use message::RepositoryRequest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// CRUD over elements of type `T`.
///
/// Implementations enforce their own deadlines; callers never wrap these calls in timeouts.
#[async_trait]
pub trait ResourceRepository<T>: Send + Sync {
    async fn instance(&self, id: &str, options: &ReadOptions) -> Result<T, RepositoryError>;

    /// All elements matching `options.filter`. Order is backend specific.
    async fn list(&self, options: &ReadOptions) -> Result<Vec<T>, RepositoryError>;

    async fn create(&self, item: T) -> Result<T, RepositoryError>;

    async fn update(&self, id: &str, item: T) -> Result<T, RepositoryError>;

    async fn delete(&self, id: &str) -> Result<(), RepositoryError>;
}

/// Read options. `filter` is a top-level equality match; `projection` is advisory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadOptions {
    #[serde(default)]
    pub filter: Map<String, Value>,
    #[serde(default)]
    pub projection: Map<String, Value>,
}

impl ReadOptions {
    pub fn filtered(mut self, key: impl Into<String>, value: Value) -> Self {
        self.filter.insert(key.into(), value);
        self
    }
}

/// Write behaviour shared by all backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepositoryOptions {
    /// Assign a fresh [`ObjectId`] to records created without an identity.
    pub auto_generate_id: bool,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            auto_generate_id: true,
        }
    }
}

/// Per-operation deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepositoryTimeouts {
    pub point: Duration,
    pub list: Duration,
}

impl Default for RepositoryTimeouts {
    fn default() -> Self {
        Self {
            point: Duration::from_secs(5),
            list: Duration::from_secs(10),
        }
    }
}
