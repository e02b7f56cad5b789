// Path: crates/aegis-keyring/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

//! # Aegis Issuer Key Registry
//!
//! Owns the set of issuer signing keys, enforces the Current -> Deprecated
//! -> Retired state machine (with an emergency Current -> Retired edge),
//! and publishes the verification set the envelope validator trusts.

use aegis_api::crypto::{AeadCipher, SerializableKey, SigningKey, SigningKeyPair};
use aegis_crypto::sign::{
    ecdsa_p256::{EcdsaP256KeyPair, EcdsaP256PrivateKey},
    eddsa::{Ed25519KeyPair, Ed25519PrivateKey},
};
use aegis_types::audit::AuditRecord;
use aegis_types::config::TrustCoreConfig;
use aegis_types::error::KeyRegistryError;
use aegis_types::key::{IssuerSigningKey, KeyAlgorithm, KeyState, PublicKeyJwk};
use parking_lot::RwLock;
use rand::RngCore;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};
use zeroize::Zeroizing;

/// The result of signing a message under the registry's Current key
/// (§4.2 step 4). Carries the `kid` and `alg` alongside the raw signature
/// bytes so the caller can populate a credential or envelope header
/// without re-deriving either from the registry.
#[derive(Debug, Clone)]
pub struct CurrentSignature {
    /// The id of the key that produced the signature.
    pub kid: String,
    /// The algorithm the signature was produced under.
    pub algorithm: KeyAlgorithm,
    /// The raw signature bytes.
    pub signature: Vec<u8>,
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn kid_from_public_key(public_key: &[u8]) -> Result<String, KeyRegistryError> {
    let digest = aegis_crypto::algorithms::hash::sha256(public_key).map_err(KeyRegistryError::Crypto)?;
    Ok(hex::encode(&digest[..16]))
}

/// Generates a fresh key pair for `algorithm`, returning the raw public and
/// private key bytes. Kept free of any `Box<dyn>` indirection since the
/// registry needs concrete bytes to seal, not a live signer.
fn generate_raw_keypair(algorithm: KeyAlgorithm) -> Result<(Vec<u8>, Vec<u8>), KeyRegistryError> {
    match algorithm {
        KeyAlgorithm::Ed25519 => {
            let keypair = Ed25519KeyPair::generate().map_err(KeyRegistryError::Crypto)?;
            Ok((
                keypair.public_key().to_bytes(),
                keypair.private_key().to_bytes(),
            ))
        }
        KeyAlgorithm::Es256 => {
            let keypair = EcdsaP256KeyPair::generate();
            Ok((
                keypair.public_key().to_bytes(),
                keypair.private_key().to_bytes(),
            ))
        }
    }
}

/// The issuer signing-key registry (§4.1).
///
/// Private key material never lives in the clear inside this struct: every
/// `rotate` call seals the freshly generated private key bytes through the
/// supplied [`AeadCipher`] before they are stored in `IssuerSigningKey::sealed_private_key`.
pub struct KeyRegistry {
    sealer: Box<dyn AeadCipher + Send + Sync>,
    keys: RwLock<BTreeMap<String, IssuerSigningKey>>,
    audit: RwLock<Vec<AuditRecord>>,
    grace_window_secs: i64,
}

impl KeyRegistry {
    /// Creates an empty registry bound to `sealer` for wrapping private key
    /// bytes, with every freshly rotated key's grace window taken from
    /// `config` rather than hard-coded (§9: components take their numeric
    /// knobs by reference instead of baking in the spec's example figures).
    pub fn new(sealer: Box<dyn AeadCipher + Send + Sync>, config: &TrustCoreConfig) -> Self {
        Self {
            sealer,
            keys: RwLock::new(BTreeMap::new()),
            audit: RwLock::new(Vec::new()),
            grace_window_secs: config.key_grace_window_secs,
        }
    }

    /// Returns the unique `Current` key.
    pub fn current(&self) -> Result<IssuerSigningKey, KeyRegistryError> {
        self.keys
            .read()
            .values()
            .find(|k| k.state == KeyState::Current)
            .cloned()
            .ok_or(KeyRegistryError::NoCurrentKey)
    }

    /// Returns the key with id `kid`, in whatever state it currently holds.
    pub fn by_id(&self, kid: &str) -> Result<IssuerSigningKey, KeyRegistryError> {
        self.keys
            .read()
            .get(kid)
            .cloned()
            .ok_or_else(|| KeyRegistryError::NotFound(kid.to_string()))
    }

    /// Generates a fresh key pair in state `Current`, atomically deprecating
    /// the previous `Current` key (if any). Exactly one `Current` key exists
    /// after this call returns.
    pub fn rotate(&self, algorithm: KeyAlgorithm) -> Result<IssuerSigningKey, KeyRegistryError> {
        let (public_key, private_key) = generate_raw_keypair(algorithm)?;
        let kid = kid_from_public_key(&public_key)?;

        let mut nonce = [0u8; 12];
        rand::rngs::OsRng.fill_bytes(&mut nonce);
        let mut sealed_private_key = nonce.to_vec();
        sealed_private_key.extend(
            self.sealer
                .seal(&nonce, &private_key)
                .map_err(KeyRegistryError::Crypto)?,
        );

        let now = now_unix();
        let new_key = IssuerSigningKey {
            kid: kid.clone(),
            algorithm,
            public_key,
            sealed_private_key,
            state: KeyState::Current,
            created_at: now,
            deprecated_at: None,
            retired_at: None,
            grace_window_secs: self.grace_window_secs,
        };

        let mut keys = self.keys.write();
        for key in keys.values_mut() {
            if key.state == KeyState::Current {
                key.state = KeyState::Deprecated;
                key.deprecated_at = Some(now);
            }
        }
        keys.insert(kid.clone(), new_key.clone());
        drop(keys);

        info!(target: "aegis_keyring", kid = %kid, algorithm = ?algorithm, "rotated issuer signing key");
        aegis_telemetry::key_registry_metrics().inc_key_rotation();
        Ok(new_key)
    }

    /// Retires `kid`, writing an audit record. Idempotent on an
    /// already-retired key (still writes an audit record noting the no-op).
    pub fn retire(
        &self,
        kid: &str,
        reason: &str,
        actor: &str,
    ) -> Result<(), KeyRegistryError> {
        let now = now_unix();
        let mut keys = self.keys.write();
        let key = keys
            .get_mut(kid)
            .ok_or_else(|| KeyRegistryError::NotFound(kid.to_string()))?;

        let already_retired = key.state == KeyState::Retired;
        let emergency = key.state == KeyState::Current;
        if !already_retired {
            key.state = KeyState::Retired;
            key.retired_at = Some(now);
        }
        drop(keys);

        let detail = if already_retired {
            "no-op: key was already retired".to_string()
        } else {
            "key retired".to_string()
        };
        self.audit.write().push(AuditRecord::new(
            now,
            actor,
            "retire_key",
            kid,
            reason,
            detail,
        ));
        warn!(target: "aegis_keyring", kid = %kid, reason = %reason, already_retired, "issuer signing key retired");
        if !already_retired {
            aegis_telemetry::key_registry_metrics().inc_key_retirement(emergency);
        }
        Ok(())
    }

    /// Unseals the Current key's private material and signs `message` with
    /// it, returning the raw signature alongside the kid/algorithm it was
    /// produced under. The unsealed private key bytes live only for the
    /// duration of this call and are zeroized on drop; they are never
    /// returned to the caller.
    pub fn sign_with_current(&self, message: &[u8]) -> Result<CurrentSignature, KeyRegistryError> {
        let key = self.current()?;
        if !key.can_sign() {
            return Err(KeyRegistryError::InvalidState {
                kid: key.kid,
                state: key.state.label(),
                action: "sign",
            });
        }
        self.sign_with_key(&key, message)
    }

    fn sign_with_key(
        &self,
        key: &IssuerSigningKey,
        message: &[u8],
    ) -> Result<CurrentSignature, KeyRegistryError> {
        if key.sealed_private_key.len() < 12 {
            return Err(KeyRegistryError::InvalidState {
                kid: key.kid.clone(),
                state: key.state.label(),
                action: "sign",
            });
        }
        let (nonce_bytes, ciphertext) = key.sealed_private_key.split_at(12);
        let mut nonce = [0u8; 12];
        nonce.copy_from_slice(nonce_bytes);
        let private_key_bytes = Zeroizing::new(
            self.sealer
                .open(&nonce, ciphertext)
                .map_err(KeyRegistryError::Crypto)?,
        );

        let signature = match key.algorithm {
            KeyAlgorithm::Ed25519 => {
                let private_key = Ed25519PrivateKey::from_bytes(&private_key_bytes)
                    .map_err(KeyRegistryError::Crypto)?;
                private_key
                    .sign(message)
                    .map_err(KeyRegistryError::Crypto)?
                    .to_bytes()
            }
            KeyAlgorithm::Es256 => {
                let private_key = EcdsaP256PrivateKey::from_bytes(&private_key_bytes)
                    .map_err(KeyRegistryError::Crypto)?;
                private_key
                    .sign(message)
                    .map_err(KeyRegistryError::Crypto)?
                    .to_bytes()
            }
        };

        Ok(CurrentSignature {
            kid: key.kid.clone(),
            algorithm: key.algorithm,
            signature,
        })
    }

    /// Every non-`Retired` key currently eligible to verify a signature —
    /// `Current`, or `Deprecated` within its grace window. This is the set
    /// the envelope validator trusts (§4.7 step 9).
    pub fn verification_set(&self) -> Vec<IssuerSigningKey> {
        let now = now_unix();
        self.keys
            .read()
            .values()
            .filter(|k| k.can_verify(now))
            .cloned()
            .collect()
    }

    /// Retires every `Deprecated` key whose grace window has elapsed.
    /// Returns the number of keys retired.
    pub fn sweep(&self) -> usize {
        let now = now_unix();
        let mut swept = Vec::new();
        {
            let mut keys = self.keys.write();
            for key in keys.values_mut() {
                if key.state == KeyState::Deprecated {
                    if let Some(at) = key.deprecated_at {
                        if now.saturating_sub(at) > key.grace_window_secs {
                            key.state = KeyState::Retired;
                            key.retired_at = Some(now);
                            swept.push(key.kid.clone());
                        }
                    }
                }
            }
        }
        let count = swept.len();
        if count > 0 {
            let mut audit = self.audit.write();
            for kid in swept {
                audit.push(AuditRecord::new(
                    now,
                    "system",
                    "retire_key",
                    &kid,
                    "grace_window_expired",
                    "retired by scheduled sweep",
                ));
            }
            info!(target: "aegis_keyring", count, "swept expired deprecated keys into retirement");
        }
        let deprecated_remaining = self
            .keys
            .read()
            .values()
            .filter(|k| k.state == KeyState::Deprecated)
            .count() as u64;
        aegis_telemetry::key_registry_metrics().set_deprecated_key_count(deprecated_remaining);
        count
    }

    /// The read-only JWKS-style view exposed to relying parties (§6),
    /// filtered to the verification set.
    pub fn jwks(&self) -> aegis_types::key::JwksDocument {
        aegis_types::key::JwksDocument {
            keys: self
                .verification_set()
                .iter()
                .map(PublicKeyJwk::from)
                .collect(),
        }
    }

    /// A snapshot of every audit record written so far.
    pub fn audit_log(&self) -> Vec<AuditRecord> {
        self.audit.read().clone()
    }
}
