use super::error::EventError;
use crate::schema::{generate, Describe, Schema};
use std::any::{type_name, TypeId};

/// A named, typed event an action may emit.
///
/// `payload_type` pins the Rust type accepted at emission; `payload_schema` documents it.
#[derive(Debug, Clone)]
pub struct EventDefinition {
    pub name: String,
    pub description: String,
    pub payload_type: TypeId,
    pub payload_type_name: &'static str,
    pub payload_schema: Schema,
}

impl EventDefinition {
    pub fn new<T: Describe + 'static>(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            payload_type: TypeId::of::<T>(),
            payload_type_name: type_name::<T>(),
            payload_schema: generate::<T>(),
        }
    }

    /// Fails unless `payload` is of the declared payload type.
    pub fn validate_payload<T: 'static>(&self, _payload: &T) -> Result<(), EventError> {
        if TypeId::of::<T>() == self.payload_type {
            Ok(())
        } else {
            Err(EventError::PayloadMismatch {
                event: self.name.clone(),
                expected: self.payload_type_name,
                actual: type_name::<T>(),
            })
        }
    }
}
