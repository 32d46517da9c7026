//! # Observability
//!
//! The library only emits `tracing` events; installing a subscriber is the binary's job.
//! [`setup_tracing`] installs the compact formatter filtered by `RUST_LOG`:
//!
//! ```bash
//! RUST_LOG=info cargo run            # lifecycle: actors, registration, completed requests
//! RUST_LOG=debug cargo run           # plus pipeline stage transitions and repository reads
//! RUST_LOG=endor_sdk::event=debug cargo run
//! ```
//!
//! Events carry structured fields (`resource`, `action`, `id`, `event`, `status`) rather than
//! interpolated strings:
//!
//! ```text
//! INFO Repository started resource="customer"
//! INFO Composed resource="customer" categories=2 actions=18
//! DEBUG Stage resource="customer" action="business/create" from=Validating to=Authorizing
//! INFO Created resource="customer" id="66f1c0de2a9b4e7f8c3d1a20" size=1
//! WARN Failed resource="customer" action="business/instance" status=404 error=customer 42 not found
//! ```

/// Installs the global subscriber. Call once, from `main`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
