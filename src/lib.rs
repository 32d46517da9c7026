//! # Endor SDK
//!
//! > **Declarative, schema-validated resource services.**
//!
//! Describe a resource with a Rust type, optionally extend it with categories, and Endor
//! derives the rest: a JSON-schema-like description, six CRUD actions per scope, a request
//! pipeline that validates and authorizes before handling, typed events, and an OpenAPI 3.1
//! document of the whole surface.
//!
//! ## Module Tour
//!
//! ### 1. Describing data ([`schema`])
//! Types implement [`Describe`](schema::Describe) to publish a static shape; the
//! [`SchemaGenerator`](schema::SchemaGenerator) turns it into a [`Schema`](schema::Schema)
//! tree. YAML fragments extend reflected schemas at startup.
//!
//! ### 2. Persisting data ([`repository`])
//! The [`ResourceRepository`](repository::ResourceRepository) contract and its backends: an
//! actor owning an in-memory map, or any [`DocumentStore`](repository::DocumentStore).
//! [`MockRepository`](repository::mock::MockRepository) replaces both in tests.
//!
//! ### 3. Handling requests ([`action`])
//! An [`EndorServiceAction`](action::EndorServiceAction) is a typed handler plus metadata.
//! The [`Pipeline`](action::Pipeline) runs it as a state machine:
//! validating, then authorizing, then handling.
//!
//! ### 4. Emitting events ([`event`])
//! Handlers emit declared events through their [`Context`](action::Context); the
//! [`DefaultEventBus`](event::DefaultEventBus) delivers them to subscribers as detached tasks.
//!
//! ### 5. Composing services ([`service`])
//! [`EndorHybridService`](service::EndorHybridService) merges a base model with its
//! categories into one [`EndorService`](service::EndorService).
//!
//! ### 6. Documenting ([`openapi`]) and running ([`lifecycle`])
//! [`ServiceRegistry`](lifecycle::ServiceRegistry) starts everything and returns an
//! [`EndorApp`](lifecycle::EndorApp) that dispatches requests and prints its own OpenAPI
//! document.
//!
//! ## Running the Demo
//!
//! ```bash
//! RUST_LOG=info cargo run
//! ```

pub mod action;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod openapi;
pub mod repository;
pub mod schema;
pub mod service;

pub use error::{EndorError, ErrorKind};
