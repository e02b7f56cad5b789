//! Policy descriptor data model (§3).

use crate::semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lifecycle status of a published policy descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyStatus {
    /// May be used to issue credentials and validate envelopes.
    Active,
    /// Still verifiable but no longer recommended for new issuance.
    Deprecated,
    /// Refused outright, regardless of version.
    Blocked,
}

/// An immutable, versioned policy descriptor (§3). New versions are
/// appended; a published descriptor is never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDescriptor {
    /// ASCII slug identifying the policy family, e.g. `"age_over_18"`.
    pub policy_id: String,
    /// The semantic version of this particular descriptor.
    pub version: Version,
    /// The circuit id this policy proves against.
    pub circuit_id: String,
    /// The minimum acceptable policy version for `policy_id` (anti-downgrade floor).
    pub minimum_version: Version,
    /// Hex-encoded fingerprint of the verification key this policy expects.
    pub verification_key_fingerprint: String,
    /// Claim keys the credential factory must see populated before issuance.
    pub required_claims: BTreeSet<String>,
    /// Default credential TTL in seconds.
    pub default_ttl_secs: i64,
    /// Lifecycle status.
    pub status: PolicyStatus,
}
