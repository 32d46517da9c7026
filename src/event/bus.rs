use super::error::EventError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// An emitted event. Transient: the bus keeps a bounded copy for inspection, nothing more.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub payload: Value,
    /// Unix time in milliseconds.
    pub timestamp: i64,
    pub source: String,
}

impl Event {
    pub fn new(name: impl Into<String>, payload: Value, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload,
            timestamp: chrono::Utc::now().timestamp_millis(),
            source: source.into(),
        }
    }
}

/// Receives published events.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    async fn handle(&self, event: Event) -> Result<(), EventError>;
}

struct FnSubscriber<F>(F);

#[async_trait]
impl<F, Fut> EventSubscriber for FnSubscriber<F>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), EventError>> + Send + 'static,
{
    async fn handle(&self, event: Event) -> Result<(), EventError> {
        (self.0)(event).await
    }
}

/// Wraps an async closure as a subscriber.
pub fn subscriber_fn<F, Fut>(f: F) -> Arc<dyn EventSubscriber>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), EventError>> + Send + 'static,
{
    Arc::new(FnSubscriber(f))
}

/// Publish/subscribe contract.
pub trait EventBus: Send + Sync {
    fn subscribe(&self, event_name: &str, subscriber: Arc<dyn EventSubscriber>);

    /// Schedules delivery to every subscriber of `event.name` and returns without waiting.
    fn publish(&self, event: Event) -> Result<(), EventError>;
}

/// Events [`DefaultEventBus`] remembers unless told otherwise.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1024;

/// In-process bus running each subscriber as its own tokio task.
///
/// The most recent events are kept for inspection, up to the history capacity. Older ones
/// are dropped.
pub struct DefaultEventBus {
    subscribers: RwLock<HashMap<String, Vec<Arc<dyn EventSubscriber>>>>,
    history: Mutex<VecDeque<Event>>,
    history_capacity: usize,
}

impl Default for DefaultEventBus {
    fn default() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl DefaultEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus remembering at most `capacity` events. Zero keeps none.
    pub fn with_history_capacity(capacity: usize) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            history: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY))),
            history_capacity: capacity,
        }
    }

    /// The most recent events, oldest first.
    pub fn published(&self) -> Vec<Event> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    fn remember(&self, event: &Event) {
        if self.history_capacity == 0 {
            return;
        }
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        while history.len() >= self.history_capacity {
            history.pop_front();
        }
        history.push_back(event.clone());
    }

    pub fn subscriber_count(&self, event_name: &str) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_name)
            .map_or(0, Vec::len)
    }
}

impl EventBus for DefaultEventBus {
    fn subscribe(&self, event_name: &str, subscriber: Arc<dyn EventSubscriber>) {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let list = subscribers.entry(event_name.to_string()).or_default();
        list.push(subscriber);
        info!(event = event_name, subscribers = list.len(), "Subscribed");
    }

    fn publish(&self, event: Event) -> Result<(), EventError> {
        let targets = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.name)
            .cloned()
            .unwrap_or_default();

        self.remember(&event);
        debug!(event = %event.name, source = %event.source, subscribers = targets.len(), "Published");

        if targets.is_empty() {
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| EventError::NoExecutor(event.name.clone()))?;

        for subscriber in targets {
            let event = event.clone();
            runtime.spawn(async move {
                let name = event.name.clone();
                if let Err(e) = subscriber.handle(event).await {
                    warn!(event = %name, error = %e, "Subscriber failed");
                }
            });
        }
        Ok(())
    }
}
