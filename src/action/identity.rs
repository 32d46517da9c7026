//! # Identity
//!
//! Sessions are resolved by an external identity service. Endor only sees the
//! [`IdentityProvider`] contract: given the request path, the application and the session
//! cookie, return a [`Session`] or say why not.
//!
//! A provider reports a non-2xx answer from the service as [`IdentityError::Rejected`] and
//! a failure to reach it as [`IdentityError::Transport`]. The pipeline maps the first to
//! `401 Unauthorized` and the second to `500 Internal Server Error`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "sessionId";

pub const DEVELOPMENT_USER: &str = "659f27cce7fd9277b3cc4ef7";
pub const DEVELOPMENT_EMAIL: &str = "endor@endor.com";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user: String,
    pub email: String,
    pub app: String,
}

impl Session {
    /// The session given to public actions: no user, only the application.
    pub fn anonymous(app: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            ..Self::default()
        }
    }
}

/// What the identity service is asked about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationRequest {
    pub path: String,
    #[serde(skip)]
    pub app: String,
    #[serde(skip)]
    pub session_cookie: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Missing session cookie")]
    MissingSession,
    #[error("Session rejected by identity service (status {status})")]
    Rejected { status: u16 },
    #[error("Identity service unreachable: {0}")]
    Transport(String),
    #[error("Malformed identity response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authorize(&self, request: &AuthorizationRequest) -> Result<Session, IdentityError>;
}

/// Grants every request a fixed development session. Never use outside development.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevelopmentIdentity;

#[async_trait]
impl IdentityProvider for DevelopmentIdentity {
    async fn authorize(&self, request: &AuthorizationRequest) -> Result<Session, IdentityError> {
        Ok(Session {
            id: uuid::Uuid::new_v4().to_string(),
            user: DEVELOPMENT_USER.to_string(),
            email: DEVELOPMENT_EMAIL.to_string(),
            app: request.app.clone(),
        })
    }
}
