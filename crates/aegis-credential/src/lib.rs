// Path: crates/aegis-credential/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

//! # Aegis Credential Factory & Sealed Store
//!
//! Issues signed, TTL-bounded credentials (§4.2) and stores them on-device
//! under an AEAD key that never leaves the device (§4.3).

pub mod factory;
pub mod store;

pub use factory::CredentialFactory;
pub use store::{DeviceKeyDescriptor, PanicReport, SealedCredentialStore};

fn base64_url_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn base64_url_decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(s)
}

fn now_unix() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
