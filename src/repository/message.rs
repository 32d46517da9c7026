//! Messages understood by the in-memory repository actor.

use super::error::RepositoryError;
use serde_json::{Map, Value};
use tokio::sync::oneshot;

/// One-shot channel carrying an operation's outcome back to the caller.
pub type Responder<T> = oneshot::Sender<Result<T, RepositoryError>>;

/// A request to the repository actor, one variant per contract operation.
#[derive(Debug)]
pub enum RepositoryRequest<T> {
    Instance {
        id: String,
        respond_to: Responder<T>,
    },
    List {
        filter: Map<String, Value>,
        respond_to: Responder<Vec<T>>,
    },
    Create {
        item: T,
        respond_to: Responder<T>,
    },
    Update {
        id: String,
        item: T,
        respond_to: Responder<T>,
    },
    Delete {
        id: String,
        respond_to: Responder<()>,
    },
}
