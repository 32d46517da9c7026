//! # Repository Errors
//!
//! `NotFound` and `Conflict` are part of the repository contract and reach the caller
//! verbatim. The remaining variants describe adapter trouble: a deadline that passed, an
//! actor that went away, a record that could not be (de)serialised.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Item already exists: {0}")]
    Conflict(String),
    #[error("Invalid item: {0}")]
    BadRequest(String),
    #[error("Repository {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
    #[error("Persistence class {0} not existent")]
    UnsupportedBackend(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Repository actor closed")]
    Closed,
    #[error("Repository actor dropped response channel")]
    Dropped,
    #[error("Backend error: {0}")]
    Backend(String),
}
