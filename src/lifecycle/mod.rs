//! Runtime orchestration.
//!
//! - [`EndorConfig`]: explicit process configuration, no global lookups.
//! - [`ServiceRegistry`]: collects services and collaborators, then starts them.
//! - [`EndorApp`]: the started microservice; dispatches requests and describes itself.
//! - [`setup_tracing`]: subscriber installation for binaries.
//!
//! ```rust,ignore
//! let app = ServiceRegistry::new(EndorConfig::from_env()?)
//!     .register_hybrid(customers)
//!     .with_event_bus(Arc::new(DefaultEventBus::new()))
//!     .start()
//!     .await?;
//!
//! let outcome = app.dispatch("customer", "business/list", ActionRequest::new("shop", json!({}))).await;
//! app.shutdown().await;
//! ```

pub mod config;
pub mod registry;
pub mod tracing;

pub use config::{ConfigError, EndorConfig, Environment};
pub use registry::{EndorApp, HybridRegistration, ServiceRegistry};
pub use self::tracing::setup_tracing;
