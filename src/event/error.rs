//! Event emission errors.
//!
//! These signal misuse of the event API by a handler (an undeclared name, a wrong payload
//! type, a context without a bus) and are always returned to the caller.

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Event '{0}' is not declared by this action")]
    UndeclaredEvent(String),
    #[error("Payload for event '{event}' must be {expected}, got {actual}")]
    PayloadMismatch {
        event: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("No event bus attached to the context")]
    NoEventBus,
    #[error("Failed to encode payload for event '{event}': {source}")]
    Encode {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("No async runtime available to dispatch event '{0}'")]
    NoExecutor(String),
    #[error("Subscriber failed: {0}")]
    Subscriber(String),
}
