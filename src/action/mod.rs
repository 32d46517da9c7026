//! # Actions
//!
//! An [`EndorServiceAction`] is a typed handler wrapped with the metadata the rest of the
//! framework needs: a description, an input schema, its visibility, whether the payload is
//! validated, and the events it may emit.
//!
//! Handlers are written against a concrete payload type `P` and response data type `R`:
//!
//! ```rust,ignore
//! let action = EndorServiceAction::new("Ship an order", |ctx: Context<ShipOrder>| async move {
//!     ctx.emit_event("order.shipped", OrderShipped { id: ctx.payload.id.clone() })?;
//!     Ok(ResponseBuilder::new().add_data(ctx.payload.id).build())
//! })
//! .with_events(vec![EventDefinition::new::<OrderShipped>("order.shipped", "An order left")]);
//! ```
//!
//! At registration time the pair is erased behind [`ErasedHandler`], which binds the raw
//! JSON body to `P` and serialises `R` back to JSON. A service is then a plain map of
//! name to action, whatever the payload types.
//!
//! Requests run through the [`pipeline::Pipeline`] state machine.

pub mod context;
pub mod dto;
pub mod identity;
pub mod pipeline;
pub mod response;

pub use context::Context;
pub use dto::{CreateDto, NoPayload, ReadDto, ReadInstanceDto, UpdateByIdDto};
pub use identity::{
    AuthorizationRequest, DevelopmentIdentity, IdentityError, IdentityProvider, Session,
};
pub use pipeline::{ActionOutcome, ActionRequest, Pipeline, Stage};
pub use response::{Gravity, Message, Response, ResponseBuilder};

use crate::error::EndorError;
use crate::event::{EventBus, EventDefinition};
use crate::schema::{generate, Describe, Schema};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// A payload bound to the handler's concrete type.
pub type BoundPayload = Box<dyn Any + Send>;

/// Request-scoped values the pipeline hands to a handler besides the payload.
pub struct Invocation {
    pub session: Session,
    pub microservice_id: String,
    pub category_id: Option<String>,
    pub event_bus: Option<Arc<dyn EventBus>>,
}

/// A handler with its payload and response types erased.
#[async_trait]
pub trait ErasedHandler: Send + Sync {
    /// Deserialises the raw body into the handler's payload type.
    fn bind(&self, raw: Value) -> Result<BoundPayload, serde_json::Error>;

    async fn call(
        &self,
        invocation: Invocation,
        events: Arc<BTreeMap<String, EventDefinition>>,
        payload: BoundPayload,
    ) -> Result<Response<Value>, EndorError>;
}

struct TypedHandler<P, R, F> {
    handler: F,
    _marker: PhantomData<fn(P) -> R>,
}

#[async_trait]
impl<P, R, F, Fut> ErasedHandler for TypedHandler<P, R, F>
where
    P: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    F: Fn(Context<P>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response<R>, EndorError>> + Send + 'static,
{
    fn bind(&self, raw: Value) -> Result<BoundPayload, serde_json::Error> {
        let payload: P = serde_json::from_value(raw)?;
        Ok(Box::new(payload))
    }

    async fn call(
        &self,
        invocation: Invocation,
        events: Arc<BTreeMap<String, EventDefinition>>,
        payload: BoundPayload,
    ) -> Result<Response<Value>, EndorError> {
        let payload = payload
            .downcast::<P>()
            .map_err(|_| EndorError::internal("payload bound to the wrong type"))?;
        let ctx = Context::new(invocation.session, *payload, invocation.microservice_id)
            .with_category(invocation.category_id)
            .with_event_bus(invocation.event_bus)
            .with_events(events);
        let response = (self.handler)(ctx).await?;
        Ok(response.into_json()?)
    }
}

/// Action metadata.
#[derive(Debug, Clone)]
pub struct ActionOptions {
    pub description: String,
    /// Public actions skip authorization.
    pub public: bool,
    pub validate_payload: bool,
    /// Derived from the payload type when `None` and the payload is not [`NoPayload`].
    pub input_schema: Option<Schema>,
    pub events: Vec<EventDefinition>,
}

impl ActionOptions {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            public: false,
            validate_payload: true,
            input_schema: None,
            events: Vec::new(),
        }
    }
}

/// A named unit of request handling. Immutable once registered.
#[derive(Clone)]
pub struct EndorServiceAction {
    options: ActionOptions,
    events: Arc<BTreeMap<String, EventDefinition>>,
    handler: Arc<dyn ErasedHandler>,
}

impl EndorServiceAction {
    /// An authenticated, validated action whose input schema is derived from `P`.
    pub fn new<P, R, F, Fut>(description: impl Into<String>, handler: F) -> Self
    where
        P: DeserializeOwned + Describe + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(Context<P>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<R>, EndorError>> + Send + 'static,
    {
        Self::configurable(ActionOptions::new(description), handler)
    }

    pub fn configurable<P, R, F, Fut>(mut options: ActionOptions, handler: F) -> Self
    where
        P: DeserializeOwned + Describe + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(Context<P>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<R>, EndorError>> + Send + 'static,
    {
        if options.input_schema.is_none() && TypeId::of::<P>() != TypeId::of::<NoPayload>() {
            options.input_schema = Some(generate::<P>());
        }
        let events = index_events(&options.events);
        Self {
            options,
            events,
            handler: Arc::new(TypedHandler {
                handler,
                _marker: PhantomData,
            }),
        }
    }

    pub fn with_events(mut self, events: Vec<EventDefinition>) -> Self {
        self.options.events.extend(events);
        self.events = index_events(&self.options.events);
        self
    }

    pub fn public(mut self) -> Self {
        self.options.public = true;
        self
    }

    pub fn without_validation(mut self) -> Self {
        self.options.validate_payload = false;
        self
    }

    pub fn with_input_schema(mut self, schema: Schema) -> Self {
        self.options.input_schema = Some(schema);
        self
    }

    pub fn options(&self) -> &ActionOptions {
        &self.options
    }

    pub fn description(&self) -> &str {
        &self.options.description
    }

    pub fn input_schema(&self) -> Option<&Schema> {
        self.options.input_schema.as_ref()
    }

    pub fn is_public(&self) -> bool {
        self.options.public
    }

    /// Looks up a declared event by name.
    pub fn event(&self, name: &str) -> Option<&EventDefinition> {
        self.events.get(name)
    }

    pub(crate) fn events(&self) -> Arc<BTreeMap<String, EventDefinition>> {
        self.events.clone()
    }

    pub(crate) fn handler(&self) -> &dyn ErasedHandler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for EndorServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndorServiceAction")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn index_events(events: &[EventDefinition]) -> Arc<BTreeMap<String, EventDefinition>> {
    Arc::new(
        events
            .iter()
            .map(|definition| (definition.name.clone(), definition.clone()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaType;

    fn echo() -> EndorServiceAction {
        EndorServiceAction::new("Echo an instance id", |ctx: Context<ReadInstanceDto>| async move {
            Ok(ResponseBuilder::new().add_data(ctx.payload.id).build())
        })
    }

    #[test]
    fn input_schema_is_derived_from_the_payload() {
        let action = echo();
        let schema = action.input_schema().unwrap();
        assert_eq!(schema.schema_type, Some(SchemaType::Object));
        assert_eq!(schema.type_name.as_deref(), Some("ReadInstanceDTO"));
        assert!(!action.is_public());
        assert!(action.options().validate_payload);
    }

    #[test]
    fn no_payload_means_no_input_schema() {
        let action = EndorServiceAction::new("Ping", |_: Context<NoPayload>| async {
            Ok(Response::<()>::default())
        })
        .public();
        assert!(action.input_schema().is_none());
        assert!(action.is_public());
    }

    #[tokio::test]
    async fn erased_handler_round_trips_payload_and_data() {
        let action = echo();
        let payload = action
            .handler()
            .bind(serde_json::json!({"id": "c1"}))
            .unwrap();
        let invocation = Invocation {
            session: Session::default(),
            microservice_id: "shop".into(),
            category_id: None,
            event_bus: None,
        };
        let response = action
            .handler()
            .call(invocation, action.events(), payload)
            .await
            .unwrap();
        assert_eq!(response.data, Some(serde_json::json!("c1")));
    }
}
