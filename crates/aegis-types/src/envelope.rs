//! Proof envelope data model (§3, §4.5, §4.7, §6).

use crate::semver::Version;
use serde::{Deserialize, Serialize};

/// Minimum number of entries the public-signals vector must carry (§6).
pub const MIN_PUBLIC_SIGNALS: usize = 7;

/// Minimum entropy (in bytes, pre-hex-encoding) required of a nonce (§3).
pub const MIN_NONCE_BYTES: usize = 32;

/// Allowed clock skew between `issuedAt` and validation time, in seconds (§4.7 step 6).
pub const CLOCK_SKEW_SECS: i64 = 300;

/// TTL applied to a nonce once it is committed to the replay cache (§4.7 step 7).
pub const NONCE_TTL_SECS: i64 = 600;

/// The relying-party challenge that seeds envelope construction (§4.5).
/// Not part of the wire format; it is the input the builder consumes.
#[derive(Debug, Clone)]
pub struct Challenge {
    /// Scheme+host+port of the relying party.
    pub origin: String,
    /// ≥32 bytes of entropy, hex-encoded.
    pub nonce: String,
}

/// The opaque proof object: field elements of the proving system, kept as
/// an ordered vector of decimal-string scalars to stay agnostic to the
/// concrete backend (§1 Non-goals: the arithmetic circuits are opaque).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProofObject(pub Vec<String>);

/// The ordered public-signals vector (§6): at least the seven mandatory
/// entries, optionally followed by policy-specific signals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicSignals(pub Vec<String>);

impl PublicSignals {
    /// Index of the mandatory `challengeHash` entry.
    pub const CHALLENGE_HASH: usize = 0;
    /// Index of the mandatory `credentialHash` entry.
    pub const CREDENTIAL_HASH: usize = 1;
    /// Index of the mandatory `policyHash` entry.
    pub const POLICY_HASH: usize = 2;
    /// Index of the mandatory `originHash` entry.
    pub const ORIGIN_HASH: usize = 3;
    /// Index of the mandatory `issuedAt` entry.
    pub const ISSUED_AT: usize = 4;
    /// Index of the mandatory `expiresAt` entry.
    pub const EXPIRES_AT: usize = 5;
    /// Index of the mandatory `resultBit` entry.
    pub const RESULT_BIT: usize = 6;

    /// Whether this vector meets the §6 minimum-length requirement.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() >= MIN_PUBLIC_SIGNALS
    }
}

/// The full proof envelope (§3, §6), canonical-JSON wire format with the
/// mandatory field names from §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofEnvelope {
    /// Protocol semver, e.g. `"1.0.0"`.
    pub protocol_version: String,
    /// Policy id.
    pub policy_id: String,
    /// Policy version.
    pub policy_version: Version,
    /// Scheme+host+port of the relying party this proof targets.
    pub origin: String,
    /// ≥32 bytes of entropy, hex-encoded.
    pub nonce: String,
    /// Issuance instant, Unix seconds.
    pub issued_at: i64,
    /// The opaque proof object.
    pub proof: ProofObject,
    /// The ordered public-signals vector.
    pub public_signals: PublicSignals,
    /// SHA-256 of the encoded credential, hex-encoded.
    pub credential_hash: String,
    /// SHA-256 of `policyId@version`, hex-encoded.
    pub policy_hash: String,
    /// Base64-encoded device signature over the canonical envelope with
    /// this field absent.
    pub signature: String,
}

/// The canonical-encoding view of an envelope with `signature` removed
/// (§4.6). A dedicated type rather than a runtime-stripped map, so the
/// signed bytes are defined at compile time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedEnvelope {
    /// Protocol semver.
    pub protocol_version: String,
    /// Policy id.
    pub policy_id: String,
    /// Policy version.
    pub policy_version: Version,
    /// Origin.
    pub origin: String,
    /// Nonce.
    pub nonce: String,
    /// Issuance instant.
    pub issued_at: i64,
    /// Proof object.
    pub proof: ProofObject,
    /// Public signals.
    pub public_signals: PublicSignals,
    /// Credential hash.
    pub credential_hash: String,
    /// Policy hash.
    pub policy_hash: String,
}

impl From<&ProofEnvelope> for UnsignedEnvelope {
    fn from(envelope: &ProofEnvelope) -> Self {
        Self {
            protocol_version: envelope.protocol_version.clone(),
            policy_id: envelope.policy_id.clone(),
            policy_version: envelope.policy_version,
            origin: envelope.origin.clone(),
            nonce: envelope.nonce.clone(),
            issued_at: envelope.issued_at,
            proof: envelope.proof.clone(),
            public_signals: envelope.public_signals.clone(),
            credential_hash: envelope.credential_hash.clone(),
            policy_hash: envelope.policy_hash.clone(),
        }
    }
}

/// The result returned to a relying party on successful validation (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// The policy that was proven against.
    pub policy_id: String,
    /// The proof's claimed result bit (e.g. "over 18: yes/no").
    pub claim_result_bit: bool,
    /// Unix seconds when validation completed.
    pub validated_at: i64,
    /// The origin the envelope was bound to.
    pub origin: String,
}
