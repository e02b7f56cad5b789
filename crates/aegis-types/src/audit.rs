//! Audit records for the two operations the spec calls irreversible:
//! key retirement (§4.1) and sealed-store panic-wipe (§4.3).

use serde::{Deserialize, Serialize};

/// A single audit entry. `detail` is free-form and must never carry claim
/// values, subject ids, or nonces (§6: telemetry never sees those either).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unix seconds when the action was recorded.
    pub at: i64,
    /// Who performed the action (an operator id, or "system" for scheduled sweeps).
    pub actor: String,
    /// The action taken, e.g. `"retire_key"`, `"panic_wipe"`.
    pub action: String,
    /// What the action applied to, e.g. a key id.
    pub subject: String,
    /// Why, e.g. `"compromise"`, `"grace_expiry"`.
    pub reason: String,
    /// Any additional non-sensitive detail (e.g. a wipe count).
    pub detail: String,
}

impl AuditRecord {
    /// Convenience constructor.
    pub fn new(
        at: i64,
        actor: impl Into<String>,
        action: impl Into<String>,
        subject: impl Into<String>,
        reason: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            at,
            actor: actor.into(),
            action: action.into(),
            subject: subject.into(),
            reason: reason.into(),
            detail: detail.into(),
        }
    }
}
