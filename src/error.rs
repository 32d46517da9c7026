//! # Request Errors
//!
//! Every failure that ends a request is reduced to an [`EndorError`]: a kind that fixes the
//! HTTP status and a human readable message that ends up as a `Fatal` entry of the response
//! envelope. Module errors convert into it with `?`.

use crate::action::identity::IdentityError;
use crate::event::EventError;
use crate::repository::RepositoryError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn status(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct EndorError {
    pub kind: ErrorKind,
    pub message: String,
}

impl EndorError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn status(&self) -> u16 {
        self.kind.status()
    }
}

impl From<RepositoryError> for EndorError {
    fn from(e: RepositoryError) -> Self {
        let kind = match &e {
            RepositoryError::NotFound(_) => ErrorKind::NotFound,
            RepositoryError::Conflict(_) => ErrorKind::Conflict,
            RepositoryError::BadRequest(_) => ErrorKind::BadRequest,
            _ => ErrorKind::Internal,
        };
        Self::new(kind, e.to_string())
    }
}

impl From<EventError> for EndorError {
    fn from(e: EventError) -> Self {
        Self::internal(e.to_string())
    }
}

impl From<IdentityError> for EndorError {
    fn from(e: IdentityError) -> Self {
        let kind = match &e {
            IdentityError::MissingSession | IdentityError::Rejected { .. } => {
                ErrorKind::Unauthorized
            }
            IdentityError::Transport(_) | IdentityError::Malformed(_) => ErrorKind::Internal,
        };
        Self::new(kind, e.to_string())
    }
}

impl From<serde_json::Error> for EndorError {
    fn from(e: serde_json::Error) -> Self {
        Self::internal(e.to_string())
    }
}
