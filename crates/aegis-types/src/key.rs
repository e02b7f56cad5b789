//! Issuer signing-key data model (§3, §4.1).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default grace window: 7 days.
pub const DEFAULT_GRACE_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// The signature algorithm a key was generated under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    /// ECDSA over the NIST P-256 curve, SHA-256 digest (JWS `ES256`).
    Es256,
    /// Ed25519.
    Ed25519,
}

impl KeyAlgorithm {
    /// The JWS-style algorithm tag used in the credential header (§6).
    pub fn header_tag(self) -> &'static str {
        match self {
            Self::Es256 => "ES256",
            Self::Ed25519 => "EdDSA",
        }
    }
}

/// The lifecycle state of an issuer signing key (§3, §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyState {
    /// May sign and verify. At most one key is `Current` at any time.
    Current,
    /// May only verify, and only within the grace window after deprecation.
    Deprecated,
    /// Terminal: may neither sign nor verify.
    Retired,
}

impl KeyState {
    /// A short, stable label for error messages and logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Deprecated => "deprecated",
            Self::Retired => "retired",
        }
    }
}

/// An issuer signing key and its lifecycle metadata (§3).
///
/// Private key material is held behind `sealed_private_key`, an opaque blob
/// produced by `aegis-crypto`'s sealing primitive — this type never exposes
/// raw key bytes to callers outside `aegis-crypto`/`aegis-keyring`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerSigningKey {
    /// Opaque key identifier (`kid`), stable for the life of the key.
    pub kid: String,
    /// The algorithm this key was generated under.
    pub algorithm: KeyAlgorithm,
    /// Public key material, raw bytes (encoding is algorithm-specific).
    pub public_key: Vec<u8>,
    /// Sealed (encrypted) private key material.
    pub sealed_private_key: Vec<u8>,
    /// Current lifecycle state.
    pub state: KeyState,
    /// Unix seconds at creation.
    pub created_at: i64,
    /// Unix seconds at deprecation, if deprecated or later retired via grace expiry.
    pub deprecated_at: Option<i64>,
    /// Unix seconds at retirement, if retired.
    pub retired_at: Option<i64>,
    /// The grace window applied to this key, in seconds.
    pub grace_window_secs: i64,
}

impl IssuerSigningKey {
    /// Whether this key may currently be used to verify a signature, given
    /// the current instant (Unix seconds): `Current`, or `Deprecated` within
    /// its grace window.
    pub fn can_verify(&self, now: i64) -> bool {
        match self.state {
            KeyState::Current => true,
            KeyState::Deprecated => match self.deprecated_at {
                Some(at) => now.saturating_sub(at) <= self.grace_window_secs,
                None => false,
            },
            KeyState::Retired => false,
        }
    }

    /// Whether this key may currently be used to sign.
    pub fn can_sign(&self) -> bool {
        matches!(self.state, KeyState::Current)
    }
}

/// A public-key-only projection suitable for a JWKS-style document (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyJwk {
    /// Key id.
    pub kid: String,
    /// Algorithm tag, JWS-style.
    pub alg: &'static str,
    /// Raw public key bytes, hex-encoded for transport.
    pub public_key_hex: String,
}

impl From<&IssuerSigningKey> for PublicKeyJwk {
    fn from(key: &IssuerSigningKey) -> Self {
        Self {
            kid: key.kid.clone(),
            alg: key.algorithm.header_tag(),
            public_key_hex: hex::encode(&key.public_key),
        }
    }
}

/// The read-only JWKS-style document exposed to relying parties (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwksDocument {
    /// The verification set, each key projected to its public form.
    pub keys: Vec<PublicKeyJwk>,
}
