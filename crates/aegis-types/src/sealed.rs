//! Sealed (on-device) credential data model (§3, §4.3).

use serde::{Deserialize, Serialize};

/// On-disk/in-memory representation of a sealed credential. `ciphertext`
/// wraps the full encoded credential (§3 `EncodedCredential::compact`)
/// under the device-local AEAD key; it is unreadable without that key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedCredential {
    /// Credential id, matching the sealed payload's `jti`.
    pub credential_id: String,
    /// Policy id, kept in cleartext so `list` can filter without decrypting.
    pub policy_id: String,
    /// AEAD ciphertext of the encoded credential (includes the auth tag).
    pub ciphertext: Vec<u8>,
    /// 96-bit AEAD nonce, fresh per seal.
    pub nonce: [u8; 12],
    /// Hex digest binding this credential to the sealing device.
    pub device_tag: String,
    /// Unix seconds at seal time.
    pub sealed_at: i64,
    /// Expiry instant copied from the credential payload, for status derivation
    /// without decrypting.
    pub expires_at: i64,
}

/// Derived status of a sealed credential at read time (§4.3 `list`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialStatus {
    /// Not yet expired.
    Active,
    /// Past its expiry instant.
    Expired,
}

/// Metadata-only view returned by `list` — never includes plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedCredentialMetadata {
    /// Credential id.
    pub credential_id: String,
    /// Policy id.
    pub policy_id: String,
    /// Derived status.
    pub status: CredentialStatus,
    /// Unix seconds at seal time.
    pub sealed_at: i64,
    /// Expiry instant.
    pub expires_at: i64,
}

impl From<&SealedCredential> for SealedCredentialMetadata {
    fn from(sealed: &SealedCredential) -> Self {
        Self {
            credential_id: sealed.credential_id.clone(),
            policy_id: sealed.policy_id.clone(),
            // Status is filled in by the store, which knows "now"; default to
            // Active here and let callers overwrite via `with_status`.
            status: CredentialStatus::Active,
            sealed_at: sealed.sealed_at,
            expires_at: sealed.expires_at,
        }
    }
}

impl SealedCredentialMetadata {
    /// Returns a copy with the status recomputed against `now`.
    pub fn with_status(mut self, now: i64) -> Self {
        self.status = if now >= self.expires_at {
            CredentialStatus::Expired
        } else {
            CredentialStatus::Active
        };
        self
    }
}

/// Optional filter for `list` (§4.3).
#[derive(Debug, Clone, Default)]
pub struct SealedCredentialFilter {
    /// Restrict to this policy id, if set.
    pub policy_id: Option<String>,
    /// Restrict to this derived status, if set.
    pub status: Option<CredentialStatus>,
}
