// Path: crates/aegis-envelope/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

//! # Aegis Proof Envelope
//!
//! Assembles proof envelopes over a loaded circuit and a sealed credential
//! (§4.5), and enforces the ten fail-closed security invariants a relying
//! party checks before trusting one (§4.7). This is the composition root
//! of the trust core: it is the only crate that depends on the key
//! registry, the circuit loader, and the nonce cache all at once.

pub mod builder;
pub mod validator;

pub use builder::ProofEnvelopeBuilder;
pub use validator::EnvelopeValidator;

fn base64_url_decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(s)
}

fn base64_url_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn now_unix() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Decodes and parses the header and payload segments of a compact
/// encoded credential, without touching the signature segment. Shared by
/// the builder (which needs the payload's expiry and device tag) and the
/// validator (which needs the header's `kid` and the payload's claims).
fn decode_credential(
    credential: &aegis_types::credential::EncodedCredential,
) -> Result<
    (
        aegis_types::credential::CredentialHeader,
        aegis_types::credential::CredentialPayload,
    ),
    aegis_types::error::EnvelopeError,
> {
    let (header_b64, payload_b64, _signature_b64) = credential
        .segments()
        .ok_or(aegis_types::error::EnvelopeError::Rejected(
            aegis_types::error::ReasonCode::MissingField,
        ))?;
    let header_bytes = base64_url_decode(header_b64).map_err(|_| {
        aegis_types::error::EnvelopeError::Rejected(aegis_types::error::ReasonCode::MissingField)
    })?;
    let payload_bytes = base64_url_decode(payload_b64).map_err(|_| {
        aegis_types::error::EnvelopeError::Rejected(aegis_types::error::ReasonCode::MissingField)
    })?;
    let header: aegis_types::credential::CredentialHeader = serde_json::from_slice(&header_bytes)
        .map_err(|_| {
            aegis_types::error::EnvelopeError::Rejected(aegis_types::error::ReasonCode::MissingField)
        })?;
    let payload: aegis_types::credential::CredentialPayload = serde_json::from_slice(&payload_bytes)
        .map_err(|_| {
            aegis_types::error::EnvelopeError::Rejected(aegis_types::error::ReasonCode::MissingField)
        })?;
    Ok((header, payload))
}
