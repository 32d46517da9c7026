//! # Request Context
//!
//! A [`Context`] is built by the pipeline for one request and handed to the action's
//! handler by value. It carries the bound payload, the resolved session and everything the
//! handler needs to emit the events its action declared.

use super::identity::Session;
use crate::event::{Event, EventBus, EventDefinition, EventError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub struct Context<P> {
    pub session: Session,
    pub payload: P,
    pub microservice_id: String,
    /// Set when the action is a category action (`<category>/<verb>`).
    pub category_id: Option<String>,
    event_bus: Option<Arc<dyn EventBus>>,
    available_events: Arc<BTreeMap<String, EventDefinition>>,
}

impl<P> Context<P> {
    pub fn new(session: Session, payload: P, microservice_id: impl Into<String>) -> Self {
        Self {
            session,
            payload,
            microservice_id: microservice_id.into(),
            category_id: None,
            event_bus: None,
            available_events: Arc::new(BTreeMap::new()),
        }
    }

    pub fn with_category(mut self, category_id: Option<String>) -> Self {
        self.category_id = category_id;
        self
    }

    pub fn with_event_bus(mut self, event_bus: Option<Arc<dyn EventBus>>) -> Self {
        self.event_bus = event_bus;
        self
    }

    /// Scopes the events this context may emit.
    pub fn with_events(mut self, events: Arc<BTreeMap<String, EventDefinition>>) -> Self {
        self.available_events = events;
        self
    }

    pub fn available_events(&self) -> &BTreeMap<String, EventDefinition> {
        &self.available_events
    }

    /// Emits a declared event.
    ///
    /// The name must be declared by the running action and `payload` must be of the declared
    /// payload type. Returns once the bus has scheduled delivery.
    pub fn emit_event<E: Serialize + 'static>(&self, name: &str, payload: E) -> Result<(), EventError> {
        let definition = self
            .available_events
            .get(name)
            .ok_or_else(|| EventError::UndeclaredEvent(name.to_string()))?;
        definition.validate_payload(&payload)?;
        let bus = self.event_bus.as_ref().ok_or(EventError::NoEventBus)?;

        let payload = serde_json::to_value(&payload).map_err(|source| EventError::Encode {
            event: name.to_string(),
            source,
        })?;
        debug!(event = name, source = %self.microservice_id, "Emitting");
        bus.publish(Event::new(name, payload, self.microservice_id.clone()))
    }
}
