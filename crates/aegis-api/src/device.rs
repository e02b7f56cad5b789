//! The device-signing-key directory boundary (§4.5, §4.7 step 8, §9).
//!
//! §4.5 signs envelopes "using the device's signing key (distinct from the
//! AEAD key)"; §4.7 step 8 verifies that signature "using the device
//! signing key associated with the device tag in the credential". Neither
//! section specifies where that association is durably recorded — the
//! sealed-credential store (§4.3) only ever persists a descriptor for the
//! on-device AEAD key, never a signing key. This trait is the seam a
//! relying party's key-distribution mechanism (an enrollment endpoint, a
//! device-attestation service, ...) implements so the validator can resolve
//! `device_tag -> public signing key` without the trust core depending on
//! how that mapping is populated.

use aegis_types::key::KeyAlgorithm;
use async_trait::async_trait;

/// A device's public signing key, as published at enrollment time.
#[derive(Debug, Clone)]
pub struct DeviceSigningKey {
    /// The algorithm this key signs under.
    pub algorithm: KeyAlgorithm,
    /// Raw public key bytes.
    pub public_key: Vec<u8>,
}

/// The contract the envelope validator (§4.7 step 8) consumes to resolve
/// the public signing key bound to a credential's device tag. The trust
/// core never implements this trait itself.
#[async_trait]
pub trait DeviceKeyDirectory: Send + Sync {
    /// Directory-specific error (lookup faults, unknown device tags, ...).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Resolves the public signing key enrolled for `device_tag`.
    async fn resolve(&self, device_tag: &str) -> Result<DeviceSigningKey, Self::Error>;
}
