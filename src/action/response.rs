//! # Response Envelope
//!
//! Every action answers with the same envelope:
//!
//! ```json
//! {
//!   "messages": [{ "gravity": "Info", "value": "customer created" }],
//!   "data": { "id": "..." },
//!   "schema": { "type": "object", "properties": { } }
//! }
//! ```
//!
//! Handlers build it with [`ResponseBuilder`]. Failed requests carry a single `Fatal` message
//! and no data.

use crate::error::EndorError;
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gravity {
    Info,
    Warning,
    Error,
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub gravity: Gravity,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response<T> {
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

impl<T> Default for Response<T> {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            data: None,
            schema: None,
        }
    }
}

impl<T: Serialize> Response<T> {
    /// Serialises `data`, keeping messages and schema.
    pub fn into_json(self) -> Result<Response<Value>, serde_json::Error> {
        let data = self.data.map(serde_json::to_value).transpose()?;
        Ok(Response {
            messages: self.messages,
            data,
            schema: self.schema,
        })
    }
}

impl Response<Value> {
    /// The envelope of a failed request.
    pub fn failure(error: &EndorError) -> Self {
        Self {
            messages: vec![Message {
                gravity: Gravity::Fatal,
                value: error.message.clone(),
            }],
            ..Self::default()
        }
    }
}

pub struct ResponseBuilder<T> {
    response: Response<T>,
}

impl<T> Default for ResponseBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResponseBuilder<T> {
    pub fn new() -> Self {
        Self {
            response: Response::default(),
        }
    }

    pub fn add_message(mut self, gravity: Gravity, value: impl Into<String>) -> Self {
        self.response.messages.push(Message {
            gravity,
            value: value.into(),
        });
        self
    }

    pub fn add_data(mut self, data: T) -> Self {
        self.response.data = Some(data);
        self
    }

    pub fn add_schema(mut self, schema: Schema) -> Self {
        self.response.schema = Some(schema);
        self
    }

    pub fn build(self) -> Response<T> {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_wire_format() {
        let response = ResponseBuilder::new()
            .add_message(Gravity::Info, "customer created")
            .add_data(json!({"id": "c1"}))
            .build();
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "messages": [{"gravity": "Info", "value": "customer created"}],
                "data": {"id": "c1"}
            })
        );
    }

    #[test]
    fn failures_carry_one_fatal_message() {
        let response = Response::failure(&EndorError::not_found("customer c1 not found"));
        assert_eq!(response.messages.len(), 1);
        assert_eq!(response.messages[0].gravity, Gravity::Fatal);
        assert!(response.data.is_none());
    }
}
