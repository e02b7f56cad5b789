// Path: crates/aegis-crypto/src/sign/ecdsa_p256.rs
//! ES256 (ECDSA over P-256) signing.
//!
//! The issuer key algorithm set (§3) names `ES256` alongside `Ed25519`;
//! the workspace's dcrypt dependency has no P-256 primitive, so this
//! module is built directly on `p256`/`ecdsa`/`signature` instead, the way
//! the rest of the crate is built directly on `dcrypt`.

use crate::error::CryptoError;
use aegis_api::crypto::{SerializableKey, Signature, SigningKey, SigningKeyPair, VerifyingKey};
use ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature as P256Signature, SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};
use rand::rngs::OsRng;

/// An ES256 key pair.
#[derive(Clone)]
pub struct EcdsaP256KeyPair {
    signing_key: P256SigningKey,
}

/// An ES256 public key.
#[derive(Clone)]
pub struct EcdsaP256PublicKey(P256VerifyingKey);

/// An ES256 private key.
#[derive(Clone)]
pub struct EcdsaP256PrivateKey(P256SigningKey);

/// A fixed-size ES256 (r || s) signature.
pub struct EcdsaP256Signature(P256Signature);

impl EcdsaP256KeyPair {
    /// Generates a new ES256 key pair.
    pub fn generate() -> Self {
        Self {
            signing_key: P256SigningKey::random(&mut OsRng),
        }
    }

    /// Reconstructs a key pair from an existing private key.
    pub fn from_private_key(private_key: &EcdsaP256PrivateKey) -> Self {
        Self {
            signing_key: private_key.0.clone(),
        }
    }
}

impl SigningKeyPair for EcdsaP256KeyPair {
    type PublicKey = EcdsaP256PublicKey;
    type PrivateKey = EcdsaP256PrivateKey;
    type Signature = EcdsaP256Signature;

    fn public_key(&self) -> Self::PublicKey {
        EcdsaP256PublicKey(*self.signing_key.verifying_key())
    }

    fn private_key(&self) -> Self::PrivateKey {
        EcdsaP256PrivateKey(self.signing_key.clone())
    }

    fn sign(&self, message: &[u8]) -> Result<Self::Signature, CryptoError> {
        let signature: P256Signature = self.signing_key.sign(message);
        Ok(EcdsaP256Signature(signature))
    }
}

impl VerifyingKey for EcdsaP256PublicKey {
    type Signature = EcdsaP256Signature;

    fn verify(&self, message: &[u8], signature: &Self::Signature) -> Result<(), CryptoError> {
        self.0
            .verify(message, &signature.0)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

impl SerializableKey for EcdsaP256PublicKey {
    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_encoded_point(true).as_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        P256VerifyingKey::from_sec1_bytes(bytes)
            .map(EcdsaP256PublicKey)
            .map_err(|e| CryptoError::InvalidKey(format!("invalid P-256 public key: {}", e)))
    }
}

impl SigningKey for EcdsaP256PrivateKey {
    type Signature = EcdsaP256Signature;

    fn sign(&self, message: &[u8]) -> Result<Self::Signature, CryptoError> {
        let signature: P256Signature = self.0.sign(message);
        Ok(EcdsaP256Signature(signature))
    }
}

impl SerializableKey for EcdsaP256PrivateKey {
    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        P256SigningKey::from_slice(bytes)
            .map(EcdsaP256PrivateKey)
            .map_err(|e| CryptoError::InvalidKey(format!("invalid P-256 private key: {}", e)))
    }
}

impl SerializableKey for EcdsaP256Signature {
    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        P256Signature::from_slice(bytes)
            .map(EcdsaP256Signature)
            .map_err(|e| CryptoError::InvalidSignature(format!("invalid ES256 signature: {}", e)))
    }
}

impl Signature for EcdsaP256Signature {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_roundtrip() {
        let keypair = EcdsaP256KeyPair::generate();
        let message = b"aegis envelope bytes";
        let signature = keypair.sign(message).unwrap();
        assert!(keypair.public_key().verify(message, &signature).is_ok());
    }

    #[test]
    fn tampered_message_fails_verification() {
        let keypair = EcdsaP256KeyPair::generate();
        let signature = keypair.sign(b"original").unwrap();
        assert!(keypair.public_key().verify(b"tampered", &signature).is_err());
    }

    #[test]
    fn public_key_serialization_roundtrip() {
        let keypair = EcdsaP256KeyPair::generate();
        let bytes = keypair.public_key().to_bytes();
        let restored = EcdsaP256PublicKey::from_bytes(&bytes).unwrap();
        let message = b"roundtrip check";
        let signature = keypair.sign(message).unwrap();
        assert!(restored.verify(message, &signature).is_ok());
    }
}
