//! # Request Pipeline
//!
//! Every request runs through a small state machine owned by [`Pipeline::execute`]:
//!
//! ```text
//! Created ──► Validating ──► Authorizing ──► Handling ──► Completed
//!    │             │               │             │
//!    │             └───────────────┴─────────────┴──────► Failed
//!    └─(validation disabled)─► Authorizing
//! ```
//!
//! Each stage inspects the request, records what it produced (bound payload, session,
//! response or error) and names the next stage. The dispatcher loop stops at `Completed` or
//! `Failed`; a failing stage is therefore the last one to run, and `Handling` runs at most
//! once.
//!
//! | Stage | Failure | Status |
//! |-------|---------|--------|
//! | Validating | body does not match the input schema or payload type | 400 |
//! | Authorizing | missing or rejected session | 401 |
//! | Authorizing | identity service unreachable | 500 |
//! | Handling | handler error | the error's own status |

use super::identity::{AuthorizationRequest, IdentityProvider, Session};
use super::response::Response;
use super::{BoundPayload, EndorServiceAction, Invocation};
use crate::error::EndorError;
use crate::event::EventBus;
use crate::schema::validate;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Response header naming the microservice that answered.
pub const MICROSERVICE_HEADER: &str = "x-endor-microservice";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Created,
    Validating,
    Authorizing,
    Handling,
    Completed,
    Failed,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Completed | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// An inbound request, already detached from the transport.
#[derive(Debug, Clone, Default)]
pub struct ActionRequest {
    pub app: String,
    /// The full request path, forwarded to the identity service.
    pub path: String,
    pub session_cookie: Option<String>,
    pub payload: Value,
}

impl ActionRequest {
    pub fn new(app: impl Into<String>, payload: Value) -> Self {
        Self {
            app: app.into(),
            payload,
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_session(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(cookie.into());
        self
    }
}

/// What the transport sends back.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub status: u16,
    pub body: Response<Value>,
    pub headers: Vec<(String, String)>,
    /// Every stage the request went through, in order.
    pub stages: Vec<Stage>,
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn final_stage(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Created)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Outcome for a request that never reached an action.
    pub fn rejected(error: &EndorError, microservice_id: &str) -> Self {
        Self {
            status: error.status(),
            body: Response::failure(error),
            headers: vec![(MICROSERVICE_HEADER.to_string(), microservice_id.to_string())],
            stages: vec![Stage::Created, Stage::Failed],
        }
    }
}

/// Per-request working state.
struct Exchange {
    request: ActionRequest,
    payload: Option<BoundPayload>,
    session: Option<Session>,
    response: Option<Response<Value>>,
    error: Option<EndorError>,
}

impl Exchange {
    fn fail(&mut self, error: EndorError) -> Stage {
        self.error = Some(error);
        Stage::Failed
    }
}

/// Drives requests through validation, authorization and handling.
#[derive(Clone)]
pub struct Pipeline {
    microservice_id: String,
    identity: Arc<dyn IdentityProvider>,
    event_bus: Option<Arc<dyn EventBus>>,
}

impl Pipeline {
    pub fn new(microservice_id: impl Into<String>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            microservice_id: microservice_id.into(),
            identity,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: Arc<dyn EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn microservice_id(&self) -> &str {
        &self.microservice_id
    }

    /// Runs `action`, registered under `method` of `resource`, for one request.
    ///
    /// A method key of the form `<category>/<verb>` scopes the handler's context to that
    /// category.
    pub async fn execute(
        &self,
        resource: &str,
        method: &str,
        action: &EndorServiceAction,
        request: ActionRequest,
    ) -> ActionOutcome {
        let mut exchange = Exchange {
            request,
            payload: None,
            session: None,
            response: None,
            error: None,
        };
        let mut stage = Stage::Created;
        let mut stages = vec![stage];

        while !stage.is_terminal() {
            let next = match stage {
                Stage::Created if action.options().validate_payload => Stage::Validating,
                Stage::Created => Stage::Authorizing,
                Stage::Validating => self.validate(action, &mut exchange),
                Stage::Authorizing => self.authorize(action, &mut exchange).await,
                Stage::Handling => self.handle(method, action, &mut exchange).await,
                Stage::Completed | Stage::Failed => break,
            };
            debug!(resource, action = method, from = %stage, to = %next, "Stage");
            stages.push(next);
            stage = next;
        }

        let headers = vec![(
            MICROSERVICE_HEADER.to_string(),
            self.microservice_id.clone(),
        )];
        match (exchange.error, exchange.response) {
            (None, Some(body)) => {
                info!(resource, action = method, "Completed");
                ActionOutcome {
                    status: 200,
                    body,
                    headers,
                    stages,
                }
            }
            (error, _) => {
                let error = error
                    .unwrap_or_else(|| EndorError::internal("request ended without a response"));
                warn!(resource, action = method, status = error.status(), error = %error, "Failed");
                ActionOutcome {
                    status: error.status(),
                    body: Response::failure(&error),
                    headers,
                    stages,
                }
            }
        }
    }

    fn validate(&self, action: &EndorServiceAction, exchange: &mut Exchange) -> Stage {
        if let Some(schema) = action.input_schema() {
            if let Err(violations) = validate(schema, &exchange.request.payload) {
                let message = violations
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                return exchange.fail(EndorError::bad_request(message));
            }
        }
        match action.handler().bind(exchange.request.payload.clone()) {
            Ok(payload) => {
                exchange.payload = Some(payload);
                Stage::Authorizing
            }
            Err(e) => exchange.fail(EndorError::bad_request(e.to_string())),
        }
    }

    async fn authorize(&self, action: &EndorServiceAction, exchange: &mut Exchange) -> Stage {
        if action.is_public() {
            exchange.session = Some(Session::anonymous(exchange.request.app.clone()));
            return Stage::Handling;
        }
        let request = AuthorizationRequest {
            path: exchange.request.path.clone(),
            app: exchange.request.app.clone(),
            session_cookie: exchange.request.session_cookie.clone(),
        };
        match self.identity.authorize(&request).await {
            Ok(session) => {
                exchange.session = Some(session);
                Stage::Handling
            }
            Err(e) => exchange.fail(e.into()),
        }
    }

    async fn handle(
        &self,
        method: &str,
        action: &EndorServiceAction,
        exchange: &mut Exchange,
    ) -> Stage {
        // Without the validating stage the body is bound only now.
        let payload = match exchange.payload.take() {
            Some(payload) => payload,
            None => match action.handler().bind(exchange.request.payload.take()) {
                Ok(payload) => payload,
                Err(e) => return exchange.fail(EndorError::bad_request(e.to_string())),
            },
        };
        let invocation = Invocation {
            session: exchange.session.take().unwrap_or_default(),
            microservice_id: self.microservice_id.clone(),
            category_id: method.split_once('/').map(|(category, _)| category.to_string()),
            event_bus: self.event_bus.clone(),
        };
        match action.handler().call(invocation, action.events(), payload).await {
            Ok(response) => {
                exchange.response = Some(response);
                Stage::Completed
            }
            Err(e) => exchange.fail(e),
        }
    }
}
