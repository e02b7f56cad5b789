//! The credential-persistence boundary (§1, §6).
//!
//! §1 lists "database persistence (addressed abstractly as repositories)"
//! as out of scope for the core; §4.2 states the credential factory "never
//! persists the credential itself; persistence is the caller's
//! responsibility." This trait is that caller-side contract, named but not
//! implemented here, the same way [`crate::identity::IdentityProvider`] and
//! [`crate::artifact::ArtifactSource`] name boundaries this crate never
//! fulfills.

use async_trait::async_trait;

/// The persistence contract a caller implements to durably store issued,
/// compact-encoded credentials (e.g. in a relational store, keyed by
/// `jti`). The trust core never implements this trait itself.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Repository-specific error (connection faults, constraint violations, ...).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persists the compact-encoded credential under its `jti`.
    async fn save(&self, credential_id: &str, compact: &str) -> Result<(), Self::Error>;

    /// Loads a previously persisted compact-encoded credential by `jti`.
    async fn load(&self, credential_id: &str) -> Result<Option<String>, Self::Error>;

    /// Deletes a persisted credential by `jti`. Idempotent: deleting an
    /// already-absent id is not an error.
    async fn delete(&self, credential_id: &str) -> Result<(), Self::Error>;
}
