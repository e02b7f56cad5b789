// Path: crates/aegis-telemetry/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # Aegis Trust Core Telemetry
//!
//! Structured logging initialization and abstract metrics sinks for the
//! trust core. The telemetry pipeline itself — where logs and metrics end
//! up, how they're scraped or shipped — is out of scope; this crate is
//! only the ambient logging setup and the sink contract the component
//! crates call into (§6, §7).

/// The initialization routine for global structured logging.
pub mod init;
/// Abstract traits (`*MetricsSink`) that define the contract for metrics reporting.
pub mod sinks;
/// A simple RAII timer for measuring the duration of a scope.
pub mod time;

// Re-export the public helper functions for easy access to the global sinks.
pub use sinks::{
    circuit_metrics, error_metrics, key_registry_metrics, nonce_cache_metrics,
    validation_metrics,
};
