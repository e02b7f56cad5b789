// Path: crates/aegis-telemetry/src/sinks.rs
//! Abstract traits for metrics reporting, decoupling the trust core's
//! logic from whatever backend renders the numbers (Prometheus, a
//! dashboard-specific pusher, a test double).
//!
//! Per §6/§7, every metric surface here is restricted to reason codes,
//! policy/circuit ids, protocol versions, origins, and durations — never
//! credential ids, subject ids, claim values, nonces, or device tags. That
//! boundary is enforced by what these signatures accept, not by a runtime
//! filter: there is no parameter here a caller could pass PII into.

use once_cell::sync::OnceCell;

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global `MetricsSink` implementation.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns a static reference to the configured validation metrics sink.
/// If no sink has been initialized, returns a no-op sink.
pub fn validation_metrics() -> &'static dyn ValidationMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured key-registry metrics sink.
pub fn key_registry_metrics() -> &'static dyn KeyRegistryMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured circuit-loader metrics sink.
pub fn circuit_metrics() -> &'static dyn CircuitLoaderMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured nonce-cache metrics sink.
pub fn nonce_cache_metrics() -> &'static dyn NonceCacheMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured error metrics sink.
pub fn error_metrics() -> &'static dyn ErrorMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Registers the process-wide metrics sink. Returns `Err(())` if a sink was
/// already registered; intended to be called exactly once at startup.
pub fn set_global_sink(sink: &'static dyn MetricsSink) -> Result<(), ()> {
    SINK.set(sink).map_err(|_| ())
}

/// A sink for metrics emitted by the proof envelope validator (§4.7).
pub trait ValidationMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for a validation outcome, labeled by its reason code.
    fn inc_validation_result(&self, reason_code: &'static str);
    /// Observes the end-to-end duration of a single `validate` call.
    fn observe_validation_duration(&self, duration_secs: f64);
}
impl ValidationMetricsSink for NopSink {
    fn inc_validation_result(&self, _reason_code: &'static str) {}
    fn observe_validation_duration(&self, _duration_secs: f64) {}
}

/// A sink for metrics emitted by the issuer signing-key registry (§4.1).
pub trait KeyRegistryMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter for a key rotation (a new `Current` key minted).
    fn inc_key_rotation(&self);
    /// Increments the counter for a key retirement, labeled by whether it was emergency.
    fn inc_key_retirement(&self, emergency: bool);
    /// Sets the gauge for the number of keys currently in the `Deprecated` grace window.
    fn set_deprecated_key_count(&self, count: u64);
}
impl KeyRegistryMetricsSink for NopSink {
    fn inc_key_rotation(&self) {}
    fn inc_key_retirement(&self, _emergency: bool) {}
    fn set_deprecated_key_count(&self, _count: u64) {}
}

/// A sink for metrics emitted by the circuit artifact loader (§4.4).
pub trait CircuitLoaderMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for a circuit load attempt, labeled by circuit id and outcome.
    fn inc_circuit_load(&self, circuit_id: &str, outcome: &'static str);
    /// Observes the duration of fetching and verifying a circuit bundle.
    fn observe_circuit_load_duration(&self, circuit_id: &str, duration_secs: f64);
}
impl CircuitLoaderMetricsSink for NopSink {
    fn inc_circuit_load(&self, _circuit_id: &str, _outcome: &'static str) {}
    fn observe_circuit_load_duration(&self, _circuit_id: &str, _duration_secs: f64) {}
}

/// A sink for metrics emitted by the bounded nonce replay cache (§4.8).
pub trait NonceCacheMetricsSink: Send + Sync + std::fmt::Debug {
    /// Sets the gauge for the current number of tracked nonces.
    fn set_nonce_cache_size(&self, size: u64);
    /// Increments the counter for nonces rejected as already-seen.
    fn inc_nonce_rejected(&self);
    /// Increments the counter for entries evicted by capacity or TTL sweep.
    fn inc_nonce_evicted(&self, count: u64);
}
impl NonceCacheMetricsSink for NopSink {
    fn set_nonce_cache_size(&self, _size: u64) {}
    fn inc_nonce_rejected(&self) {}
    fn inc_nonce_evicted(&self, _count: u64) {}
}

/// A sink for recording structured error metrics across every component.
pub trait ErrorMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for a specific error, categorized by its stable error code.
    fn inc_error(&self, code: &'static str);
}
impl ErrorMetricsSink for NopSink {
    fn inc_error(&self, _code: &'static str) {}
}

/// A unified sink implementing every domain-specific trait, giving a
/// single point of implementation for a concrete metrics backend.
pub trait MetricsSink:
    ValidationMetricsSink
    + KeyRegistryMetricsSink
    + CircuitLoaderMetricsSink
    + NonceCacheMetricsSink
    + ErrorMetricsSink
{
}

impl<T> MetricsSink for T where
    T: ValidationMetricsSink
        + KeyRegistryMetricsSink
        + CircuitLoaderMetricsSink
        + NonceCacheMetricsSink
        + ErrorMetricsSink
{
}
