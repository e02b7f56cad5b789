//! Unified traits for cryptographic primitives, adapted from the teacher's
//! `ioi_api::crypto` module to this crate's narrower needs (signing and
//! AEAD only — no KEM, no post-quantum suites, since the spec treats
//! "which AEAD/signature library" as an open implementation choice, not a
//! contract the core needs to abstract over multiple backends for).

use aegis_types::error::CryptoError;

/// A trait for any key that can be serialized to and from bytes.
pub trait SerializableKey {
    /// Converts the key to a byte vector.
    fn to_bytes(&self) -> Vec<u8>;

    /// Creates a key from a byte slice.
    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError>
    where
        Self: Sized;
}

/// A marker trait for a cryptographic signature.
pub trait Signature: SerializableKey {}

/// A trait for a public key used for signature verification.
pub trait VerifyingKey: SerializableKey {
    /// The signature type this key can verify.
    type Signature: Signature;
    /// Verifies a signature against a message.
    fn verify(&self, message: &[u8], signature: &Self::Signature) -> Result<(), CryptoError>;
}

/// A trait for a private key used for signing operations.
pub trait SigningKey: SerializableKey {
    /// The signature type this key produces.
    type Signature: Signature;
    /// Signs a message.
    fn sign(&self, message: &[u8]) -> Result<Self::Signature, CryptoError>;
}

/// A trait for a key pair used in a signature algorithm.
pub trait SigningKeyPair {
    /// The public key type used for verification.
    type PublicKey: VerifyingKey<Signature = Self::Signature>;
    /// The private key type used for signing.
    type PrivateKey: SigningKey<Signature = Self::Signature>;
    /// The signature type produced.
    type Signature: Signature;

    /// Gets the public key.
    fn public_key(&self) -> Self::PublicKey;
    /// Gets the private key.
    fn private_key(&self) -> Self::PrivateKey;
    /// Signs a message with the private key.
    fn sign(&self, message: &[u8]) -> Result<Self::Signature, CryptoError>;
}

/// A trait for an authenticated-encryption-with-associated-data cipher,
/// the seam the sealed-credential store (§4.3) and key-wrapping (§4.1)
/// are built on. Kept abstract so the concrete AEAD choice stays a single
/// swappable implementation behind `aegis-crypto`.
pub trait AeadCipher {
    /// Encrypts `plaintext` under `nonce`, returning ciphertext with the
    /// authentication tag appended.
    fn seal(&self, nonce: &[u8; 12], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Decrypts `ciphertext` (tag included) under `nonce`. Fails with
    /// `CryptoError::AuthenticationFailed` on any tamper.
    fn open(&self, nonce: &[u8; 12], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}
