//! The identity-provider boundary (§6, §9).
//!
//! §9 REDESIGN FLAGS: "Inheritance of provider adapters (MitID, BankID, ...)
//! -> replace with a trait/interface {start(), callback(session_id) ->
//! attributes} holding only the contract the core consumes." HTTP routing,
//! OIDC flows, and the concrete providers themselves are out of scope
//! (§1); only the contract is specified here.

use async_trait::async_trait;
use std::collections::BTreeMap;

/// Opaque session handle returned by `start` and round-tripped by the
/// caller to `callback`. The core never interprets its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderSessionId(pub String);

/// What an identity provider hands back after a successful authentication:
/// a hashed subject id (never raw PII) plus whatever attributes the policy
/// needs to populate its claim map.
#[derive(Debug, Clone)]
pub struct ProviderAttributes {
    /// Opaque, pre-hashed subject identifier.
    pub subject_id_hash: String,
    /// Raw attributes as strings; the credential factory maps these onto
    /// the policy's required claim keys. Raw PII never crosses this
    /// boundary into the core (§6) — providers are expected to hash or
    /// redact before attributes reach this struct.
    pub attributes: BTreeMap<String, String>,
}

/// The contract the trust core consumes from any identity provider
/// adapter. Concrete providers (MitID, BankID, ...) are enumerated in
/// configuration and implement this trait; the core never depends on a
/// specific provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Provider-specific error surfaced back to the caller untransformed
    /// (§7: resource faults bubble up so callers can distinguish them from
    /// cryptographic failures).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Begins an authentication session, returning a session id the caller
    /// later presents to `callback`.
    async fn start(&self) -> Result<ProviderSessionId, Self::Error>;

    /// Completes a previously-started session, returning the attributes to
    /// feed into credential issuance.
    async fn callback(
        &self,
        session_id: &ProviderSessionId,
    ) -> Result<ProviderAttributes, Self::Error>;
}
