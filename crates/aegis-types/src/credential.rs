//! Credential data model (§3, §6).

use crate::semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A policy-dependent claim map. Values are kept as strings at this layer;
/// policy-specific typed claim records can be layered by the caller on top
/// of this generic map (§9: "Dynamic claim maps ... replace with either a
/// schema-driven map validated at the credential factory boundary, or a
/// per-policy strongly typed claim record"). This crate implements the
/// schema-driven option: the policy descriptor's `required_claims` is the
/// schema, and `aegis-credential` validates against it at issuance.
pub type ClaimMap = BTreeMap<String, String>;

/// The JOSE-style header segment of an issued credential (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialHeader {
    /// Algorithm tag, e.g. `"ES256"` or `"EdDSA"`.
    pub alg: &'static str,
    /// The signing key id used.
    pub kid: String,
    /// Token type, always `"aegis-cred+jwt"`.
    pub typ: &'static str,
}

/// The payload segment of an issued credential: the §3 attributes plus the
/// standard JWT-style names the wire format names in §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPayload {
    /// Credential id (`jti`), 128 bits, hex-encoded.
    pub jti: String,
    /// Issuer identifier (stable string naming this trust core deployment).
    pub iss: String,
    /// Subject id (opaque, never PII).
    pub sub: String,
    /// Intended audience — the policy id this credential was issued for.
    pub aud: String,
    /// Policy version.
    pub policy_version: Version,
    /// Issuance instant, Unix seconds.
    pub iat: i64,
    /// Expiry instant, Unix seconds. Invariant: `exp > iat`.
    pub exp: i64,
    /// Optional not-before instant. Invariant: if present, `nbf >= iat`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    /// Policy-dependent claims. Never logged.
    pub claims: ClaimMap,
    /// Hex digest binding this credential to the device that will seal it.
    pub device_tag: String,
}

/// A fully issued, three-segment encoded credential (§3, §6):
/// `base64url(header) "." base64url(payload) "." base64url(signature)`.
#[derive(Debug, Clone)]
pub struct EncodedCredential {
    /// The compact three-segment string.
    pub compact: String,
}

impl EncodedCredential {
    /// Splits the compact form into its three base64url segments without
    /// decoding them. Returns `None` if the shape is wrong.
    pub fn segments(&self) -> Option<(&str, &str, &str)> {
        let mut parts = self.compact.splitn(3, '.');
        let header = parts.next()?;
        let payload = parts.next()?;
        let signature = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Some((header, payload, signature))
    }
}
