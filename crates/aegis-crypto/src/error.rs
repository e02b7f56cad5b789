// Path: crates/aegis-crypto/src/error.rs
//! Local error types for the `aegis-crypto` crate.

// Re-export the canonical error type from the types crate.
pub use aegis_types::error::CryptoError;
