//! Error taxonomy for the aegis trust core.
//!
//! Every component crate defines its own `thiserror`-derived enum scoped to
//! its own failure modes, and every one of them implements [`ErrorCode`] so a
//! caller (or a log line) can key off a stable string tag instead of the
//! `Display` message, which may change wording without notice.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
///
/// Codes are PII-free by construction: they name the failure mode, never the
/// data that triggered it.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors from cryptographic primitives (hashing, signing, AEAD).
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The signature failed cryptographic verification.
    #[error("signature verification failed")]
    VerificationFailed,
    /// The provided key material is malformed or invalid for the algorithm.
    #[error("invalid cryptographic key: {0}")]
    InvalidKey(String),
    /// The provided signature material is malformed.
    #[error("invalid signature format: {0}")]
    InvalidSignature(String),
    /// AEAD authentication failed (tampered ciphertext, nonce, or tag).
    #[error("AEAD authentication failed")]
    AuthenticationFailed,
    /// A hash digest had an unexpected length.
    #[error("invalid hash length: expected {expected}, got {got}")]
    InvalidHashLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        got: usize,
    },
    /// A generic failure in an underlying cryptographic library.
    #[error("cryptographic operation failed: {0}")]
    OperationFailed(String),
    /// An input to a cryptographic operation was invalid.
    #[error("invalid input for operation: {0}")]
    InvalidInput(String),
    /// The requested algorithm or parameter is not supported.
    #[error("unsupported cryptographic operation: {0}")]
    Unsupported(String),
}

impl ErrorCode for CryptoError {
    fn code(&self) -> &'static str {
        match self {
            Self::VerificationFailed => "CRYPTO_VERIFICATION_FAILED",
            Self::InvalidKey(_) => "CRYPTO_INVALID_KEY",
            Self::InvalidSignature(_) => "CRYPTO_INVALID_SIGNATURE",
            Self::AuthenticationFailed => "CRYPTO_AEAD_AUTH_FAILED",
            Self::InvalidHashLength { .. } => "CRYPTO_INVALID_HASH_LENGTH",
            Self::OperationFailed(_) => "CRYPTO_OPERATION_FAILED",
            Self::InvalidInput(_) => "CRYPTO_INVALID_INPUT",
            Self::Unsupported(_) => "CRYPTO_UNSUPPORTED",
        }
    }
}

impl From<dcrypt::Error> for CryptoError {
    fn from(e: dcrypt::Error) -> Self {
        CryptoError::OperationFailed(e.to_string())
    }
}

/// Errors from the issuer signing-key registry (§4.1).
#[derive(Error, Debug)]
pub enum KeyRegistryError {
    /// No key is currently in the `Current` state.
    #[error("no current signing key is registered")]
    NoCurrentKey,
    /// The requested key id is not present in the registry at all.
    #[error("signing key not found: {0}")]
    NotFound(String),
    /// The key is in a state that does not permit the requested operation.
    #[error("signing key {kid} is {state} and cannot {action}")]
    InvalidState {
        /// The key id.
        kid: String,
        /// Its current state, for the message.
        state: &'static str,
        /// The action that was attempted.
        action: &'static str,
    },
    /// An underlying cryptographic operation failed.
    #[error("cryptographic error: {0}")]
    Crypto(#[from] CryptoError),
}

impl ErrorCode for KeyRegistryError {
    fn code(&self) -> &'static str {
        match self {
            Self::NoCurrentKey => "KEYRING_NO_CURRENT_KEY",
            Self::NotFound(_) => "KEYRING_NOT_FOUND",
            Self::InvalidState { .. } => "KEYRING_INVALID_STATE",
            Self::Crypto(_) => "KEYRING_CRYPTO_ERROR",
        }
    }
}

/// Errors from the credential factory (§4.2).
#[derive(Error, Debug)]
pub enum CredentialError {
    /// The named policy id has no descriptor registered.
    #[error("unknown policy: {0}")]
    UnknownPolicy(String),
    /// The policy exists but its lifecycle status is `Blocked`.
    #[error("policy is blocked: {0}")]
    PolicyBlocked(String),
    /// A claim required by the policy was missing from the supplied claim map.
    #[error("missing required claim: {0}")]
    MissingClaim(String),
    /// No `Current` signing key was available to issue under.
    #[error("no current signing key")]
    NoCurrentKey,
    /// A cryptographic operation (signing, encoding) failed.
    #[error("cryptographic error: {0}")]
    Crypto(#[from] CryptoError),
}

impl ErrorCode for CredentialError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownPolicy(_) => "CREDENTIAL_UNKNOWN_POLICY",
            Self::PolicyBlocked(_) => "CREDENTIAL_POLICY_BLOCKED",
            Self::MissingClaim(_) => "CREDENTIAL_MISSING_CLAIM",
            Self::NoCurrentKey => "CREDENTIAL_NO_CURRENT_KEY",
            Self::Crypto(_) => "CREDENTIAL_CRYPTO_ERROR",
        }
    }
}

/// Errors from the on-device sealed-credential store (§4.3).
#[derive(Error, Debug)]
pub enum SealedStoreError {
    /// No sealed credential exists under the requested id.
    #[error("sealed credential not found: {0}")]
    NotFound(String),
    /// AEAD decryption failed: ciphertext, nonce, or tag does not match the device key.
    #[error("sealed credential failed authentication (tampered or wrong device key)")]
    Tampered,
    /// The device-local AEAD key could not be produced or accessed.
    #[error("device key unavailable: {0}")]
    DeviceKeyUnavailable(String),
    /// A cryptographic operation failed.
    #[error("cryptographic error: {0}")]
    Crypto(#[from] CryptoError),
}

impl ErrorCode for SealedStoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "SEALED_STORE_NOT_FOUND",
            Self::Tampered => "SEALED_STORE_TAMPERED",
            Self::DeviceKeyUnavailable(_) => "SEALED_STORE_DEVICE_KEY_UNAVAILABLE",
            Self::Crypto(_) => "SEALED_STORE_CRYPTO_ERROR",
        }
    }
}

/// Errors from the circuit artifact loader (§4.4).
#[derive(Error, Debug)]
pub enum CircuitLoaderError {
    /// The circuit id is not registered at all.
    #[error("unknown circuit: {0}")]
    UnknownCircuit(String),
    /// The requested version is strictly below the registered minimum floor.
    #[error("circuit version {requested} is below the minimum {minimum} for {circuit_id}")]
    DowngradeRejected {
        /// The circuit id.
        circuit_id: String,
        /// The version that was requested.
        requested: String,
        /// The registered floor.
        minimum: String,
    },
    /// The manifest's offline signature did not verify.
    #[error("manifest signature invalid")]
    ManifestSignatureInvalid,
    /// A fetched artifact's recomputed hash did not match the manifest.
    #[error("artifact tampered: {0}")]
    ArtifactTampered(String),
    /// Fetching the manifest or an artifact from the artifact source failed.
    #[error("artifact fetch failed: {0}")]
    FetchFailed(String),
    /// A cryptographic operation failed.
    #[error("cryptographic error: {0}")]
    Crypto(#[from] CryptoError),
}

impl ErrorCode for CircuitLoaderError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownCircuit(_) => "CIRCUIT_UNKNOWN",
            Self::DowngradeRejected { .. } => "CIRCUIT_DOWNGRADE_REJECTED",
            Self::ManifestSignatureInvalid => "CIRCUIT_MANIFEST_SIGNATURE_INVALID",
            Self::ArtifactTampered(_) => "CIRCUIT_ARTIFACT_TAMPERED",
            Self::FetchFailed(_) => "CIRCUIT_FETCH_FAILED",
            Self::Crypto(_) => "CIRCUIT_CRYPTO_ERROR",
        }
    }
}

/// Errors from the bounded nonce replay cache (§4.8).
#[derive(Error, Debug)]
pub enum NonceCacheError {
    /// The cache's backing store could not be reached.
    #[error("nonce cache backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl ErrorCode for NonceCacheError {
    fn code(&self) -> &'static str {
        match self {
            Self::BackendUnavailable(_) => "NONCE_CACHE_BACKEND_UNAVAILABLE",
        }
    }
}

/// The ten invariant reason codes surfaced by the proof envelope validator
/// (§4.7, §6), plus `Valid` for the success path. These are the only values
/// that ever cross the trust boundary to a relying party.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonCode {
    /// Validation succeeded.
    #[error("valid")]
    Valid,
    /// Structural completeness check failed (step 1).
    #[error("missing or malformed mandatory field")]
    MissingField,
    /// Protocol version is not a supported major version (step 2).
    #[error("unsupported protocol version")]
    UnsupportedProtocol,
    /// Policy (or circuit) version is below the registered minimum floor (step 3, step 10).
    #[error("policy or circuit version below the minimum floor")]
    DowngradeRejected,
    /// Envelope origin does not match the expected or embedded origin (step 4).
    #[error("origin mismatch")]
    OriginMismatch,
    /// Envelope `policyHash` does not match the recomputed hash (step 5).
    #[error("policy hash mismatch")]
    PolicyMismatch,
    /// `|now - issued_at|` exceeds the allowed clock skew (step 6).
    #[error("clock skew exceeded")]
    ClockSkew,
    /// The nonce has already been observed within its TTL (step 7).
    #[error("nonce already used")]
    NonceAlreadyUsed,
    /// The envelope signature did not verify (step 8).
    #[error("invalid envelope signature")]
    SignatureInvalid,
    /// The credential's signing key has been retired (step 9).
    #[error("credential signing key has been retired")]
    RetiredKey,
    /// The credential's signing key id is not known to the registry (step 9).
    #[error("unknown credential signing key")]
    UnknownKey,
    /// The zero-knowledge proof did not verify (step 10).
    #[error("invalid proof")]
    InvalidProof,
}

impl ErrorCode for ReasonCode {
    fn code(&self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::MissingField => "MISSING_FIELD",
            Self::UnsupportedProtocol => "UNSUPPORTED_PROTOCOL",
            Self::DowngradeRejected => "DOWNGRADE_REJECTED",
            Self::OriginMismatch => "ORIGIN_MISMATCH",
            Self::PolicyMismatch => "POLICY_MISMATCH",
            Self::ClockSkew => "CLOCK_SKEW",
            Self::NonceAlreadyUsed => "NONCE_ALREADY_USED",
            Self::SignatureInvalid => "SIGNATURE_INVALID",
            Self::RetiredKey => "RETIRED_KEY",
            Self::UnknownKey => "UNKNOWN_KEY",
            Self::InvalidProof => "INVALID_PROOF",
        }
    }
}

/// Errors from the proof envelope builder and validator (§4.5, §4.7).
#[derive(Error, Debug)]
pub enum EnvelopeError {
    /// The validator rejected the envelope; carries the specific reason code.
    #[error("envelope rejected: {0}")]
    Rejected(ReasonCode),
    /// An error originating from the key registry.
    #[error("key registry error: {0}")]
    KeyRegistry(#[from] KeyRegistryError),
    /// An error originating from the circuit loader.
    #[error("circuit loader error: {0}")]
    CircuitLoader(#[from] CircuitLoaderError),
    /// An error originating from the nonce cache.
    #[error("nonce cache error: {0}")]
    NonceCache(#[from] NonceCacheError),
    /// A cryptographic operation failed.
    #[error("cryptographic error: {0}")]
    Crypto(#[from] CryptoError),
    /// The caller-supplied cancellation signal fired before the operation completed.
    #[error("validation cancelled")]
    Cancelled,
}

impl ErrorCode for EnvelopeError {
    fn code(&self) -> &'static str {
        match self {
            Self::Rejected(reason) => reason.code(),
            Self::KeyRegistry(e) => e.code(),
            Self::CircuitLoader(e) => e.code(),
            Self::NonceCache(e) => e.code(),
            Self::Crypto(e) => e.code(),
            Self::Cancelled => "ENVELOPE_VALIDATION_CANCELLED",
        }
    }
}
