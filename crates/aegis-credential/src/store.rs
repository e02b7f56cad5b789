//! The on-device sealed-credential store (§4.3): credentials are unreadable
//! without a device-local AEAD key that never leaves the device.

use crate::{base64_url_decode, now_unix};
use aegis_api::crypto::AeadCipher;
use aegis_api::wipe::Wipeable;
use aegis_crypto::aead::DeviceAead;
use aegis_crypto::algorithms::hash::sha256;
use aegis_types::audit::AuditRecord;
use aegis_types::credential::{CredentialPayload, EncodedCredential};
use aegis_types::error::SealedStoreError;
use aegis_types::sealed::{
    CredentialStatus, SealedCredential, SealedCredentialFilter, SealedCredentialMetadata,
};
use parking_lot::RwLock;
use rand::RngCore;
use std::collections::BTreeMap;
use zeroize::Zeroizing;

/// The non-secret descriptor persisted for the device key: "a key
/// descriptor (not the bytes)" per §4.3. The device tag is a
/// domain-separated hash of this descriptor, so it is stable for the life
/// of the key without ever exposing the key bytes themselves.
#[derive(Debug, Clone)]
pub struct DeviceKeyDescriptor {
    /// Hash-derived, non-reversible identifier for the current device key.
    pub key_id: String,
    /// Unix seconds at generation.
    pub created_at: i64,
}

#[derive(Default)]
struct DeviceKeySlot {
    descriptor: Option<DeviceKeyDescriptor>,
    key_bytes: Option<Zeroizing<[u8; 32]>>,
}

/// The outcome of a `panic()` catastrophic reset (§4.3): best-effort, so the
/// report names exactly what was cleared rather than assuming everything was.
#[derive(Debug, Clone)]
pub struct PanicReport {
    /// The caller-supplied reason for the reset.
    pub cause: String,
    /// Number of sealed credentials cleared.
    pub credentials_wiped: usize,
    /// Whether the device key descriptor was cleared (forcing regeneration).
    pub device_key_regenerated: bool,
    /// Name and cleared-item-count for each auxiliary component wiped.
    pub auxiliary_wiped: Vec<(String, usize)>,
    /// Unix seconds at reset.
    pub at: i64,
}

/// Stores credentials sealed under a lazily-generated, non-exportable
/// device AEAD key (§4.3).
pub struct SealedCredentialStore {
    device: RwLock<DeviceKeySlot>,
    credentials: RwLock<BTreeMap<String, SealedCredential>>,
    audit: RwLock<Vec<AuditRecord>>,
}

impl Default for SealedCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SealedCredentialStore {
    /// Creates an empty store with no device key generated yet.
    pub fn new() -> Self {
        Self {
            device: RwLock::new(DeviceKeySlot::default()),
            credentials: RwLock::new(BTreeMap::new()),
            audit: RwLock::new(Vec::new()),
        }
    }

    /// Returns the non-exportable device key, generating one on first
    /// access. If the descriptor exists but the key bytes are unavailable
    /// (process restart with no platform-backed persistence), a fresh key
    /// is generated and any previously sealed credentials become
    /// permanently unreadable by design.
    fn device_key(&self) -> [u8; 32] {
        {
            let slot = self.device.read();
            if let Some(key) = &slot.key_bytes {
                return **key;
            }
        }
        let mut slot = self.device.write();
        if let Some(key) = &slot.key_bytes {
            return **key;
        }
        let mut key = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut key);
        let key_id = sha256(key).map(|digest| hex::encode(digest)).unwrap_or_default();
        slot.descriptor = Some(DeviceKeyDescriptor {
            key_id,
            created_at: now_unix(),
        });
        slot.key_bytes = Some(Zeroizing::new(key));
        key
    }

    /// The hex digest of a domain-separated hash of the device key's public
    /// descriptor — stable across credentials sealed under the same key,
    /// never derived from the key bytes themselves.
    pub fn device_tag(&self) -> String {
        self.device_key();
        let slot = self.device.read();
        let descriptor = slot
            .descriptor
            .as_ref()
            .expect("device key descriptor populated by device_key()");
        let domain_separated = format!("aegis-device-tag:{}:{}", descriptor.key_id, descriptor.created_at);
        sha256(domain_separated.as_bytes())
            .map(|digest| hex::encode(digest))
            .unwrap_or_default()
    }

    /// Seals `encoded` under the device key and stores it indexed by the
    /// credential's `jti`, keeping `policy_id` in cleartext so `list` can
    /// filter without decrypting. Returns the stored credential id.
    pub fn seal(&self, encoded: &EncodedCredential, policy_id: &str) -> Result<String, SealedStoreError> {
        let (_, payload_b64, _) = encoded
            .segments()
            .ok_or_else(|| SealedStoreError::DeviceKeyUnavailable("malformed credential".to_string()))?;
        let payload_bytes = base64_url_decode(payload_b64)
            .map_err(|e| SealedStoreError::DeviceKeyUnavailable(format!("malformed credential payload: {e}")))?;
        let payload: CredentialPayload = serde_json::from_slice(&payload_bytes)
            .map_err(|e| SealedStoreError::DeviceKeyUnavailable(format!("malformed credential payload: {e}")))?;

        let key = self.device_key();
        let cipher = DeviceAead::new(key);
        let mut nonce = [0u8; 12];
        rand::rngs::OsRng.fill_bytes(&mut nonce);
        let ciphertext = cipher.seal(&nonce, encoded.compact.as_bytes())?;

        let sealed = SealedCredential {
            credential_id: payload.jti.clone(),
            policy_id: policy_id.to_string(),
            ciphertext,
            nonce,
            device_tag: payload.device_tag,
            sealed_at: now_unix(),
            expires_at: payload.exp,
        };
        let credential_id = sealed.credential_id.clone();
        self.credentials.write().insert(credential_id.clone(), sealed);
        tracing::info!(target: "aegis_credential", credential_id = %credential_id, policy_id, "sealed credential");
        Ok(credential_id)
    }

    /// Decrypts and returns the compact-encoded credential for `credential_id`.
    pub fn open(&self, credential_id: &str) -> Result<String, SealedStoreError> {
        let sealed = self
            .credentials
            .read()
            .get(credential_id)
            .cloned()
            .ok_or_else(|| SealedStoreError::NotFound(credential_id.to_string()))?;

        let key = self.device_key();
        let cipher = DeviceAead::new(key);
        let plaintext = cipher
            .open(&sealed.nonce, &sealed.ciphertext)
            .map_err(|_| SealedStoreError::Tampered)?;
        String::from_utf8(plaintext)
            .map_err(|_| SealedStoreError::Tampered)
    }

    /// Metadata (never plaintext) for every sealed credential matching
    /// `filter`'s optional policy-id and status constraints.
    pub fn list(&self, filter: &SealedCredentialFilter) -> Vec<SealedCredentialMetadata> {
        let now = now_unix();
        self.credentials
            .read()
            .values()
            .map(|sealed| SealedCredentialMetadata::from(sealed).with_status(now))
            .filter(|meta| {
                filter.policy_id.as_deref().map_or(true, |p| p == meta.policy_id)
                    && filter.status.map_or(true, |s| s == meta.status)
            })
            .collect()
    }

    /// Removes a single sealed credential by id.
    pub fn erase(&self, credential_id: &str) -> Result<(), SealedStoreError> {
        let mut credentials = self.credentials.write();
        if credentials.remove(credential_id).is_none() {
            return Err(SealedStoreError::NotFound(credential_id.to_string()));
        }
        Ok(())
    }

    /// The catastrophic reset: deletes every sealed credential, clears the
    /// device key descriptor (forcing regeneration), and best-effort wipes
    /// every auxiliary component (e.g. a circuit loader's cache). Always
    /// writes a single audit record, even on partial success.
    pub fn panic(&self, cause: &str, auxiliary: &[(&str, &dyn Wipeable)]) -> PanicReport {
        let credentials_wiped = {
            let mut credentials = self.credentials.write();
            let count = credentials.len();
            credentials.clear();
            count
        };
        {
            let mut slot = self.device.write();
            *slot = DeviceKeySlot::default();
        }
        let auxiliary_wiped: Vec<(String, usize)> = auxiliary
            .iter()
            .map(|(name, wipeable)| ((*name).to_string(), wipeable.wipe()))
            .collect();

        let now = now_unix();
        self.audit.write().push(AuditRecord::new(
            now,
            "device",
            "panic",
            "sealed_credential_store",
            cause,
            format!("wiped {credentials_wiped} credential(s), reset device key"),
        ));
        tracing::error!(
            target: "aegis_credential",
            cause,
            credentials_wiped,
            "panic-wipe executed"
        );

        PanicReport {
            cause: cause.to_string(),
            credentials_wiped,
            device_key_regenerated: true,
            auxiliary_wiped,
            at: now,
        }
    }

    /// A snapshot of every audit record written so far.
    pub fn audit_log(&self) -> Vec<AuditRecord> {
        self.audit.read().clone()
    }
}

impl Wipeable for SealedCredentialStore {
    fn wipe(&self) -> usize {
        let mut credentials = self.credentials.write();
        let count = credentials.len();
        credentials.clear();
        count
    }
}
