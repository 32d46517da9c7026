//! # Events
//!
//! Actions declare the events they may emit as [`EventDefinition`]s. At emission time the
//! payload type is checked against the declaration, the value is serialised into an
//! [`Event`] and handed to an [`EventBus`].
//!
//! Delivery is fire-and-forget. [`DefaultEventBus::publish`] records the event, spawns one
//! task per subscriber and returns. Subscriber failures are logged, never reported back to
//! the publisher, and no ordering is guaranteed between subscribers or between events.

pub mod bus;
pub mod definition;
pub mod error;

pub use bus::{subscriber_fn, DefaultEventBus, Event, EventBus, EventSubscriber, DEFAULT_HISTORY_CAPACITY};
pub use definition::EventDefinition;
pub use error::EventError;
