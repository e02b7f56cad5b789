//! Central configuration for numeric/temporal knobs the spec names in
//! prose. Deserialized from TOML so a deployment can override the defaults
//! without touching code, matching the teacher's `WorkloadConfig` pattern.

use serde::{Deserialize, Serialize};

/// Trust-core-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustCoreConfig {
    /// Default grace window applied to newly-deprecated keys, in seconds.
    pub key_grace_window_secs: i64,
    /// Allowed clock skew between envelope `issuedAt` and validation time.
    pub clock_skew_secs: i64,
    /// TTL applied to a nonce once committed to the replay cache.
    pub nonce_ttl_secs: i64,
    /// Hard upper bound on simultaneously-tracked nonces before oldest-entry eviction.
    pub nonce_cache_capacity: usize,
    /// Supported protocol major version prefix, e.g. `"1"`.
    pub supported_protocol_major: String,
}

impl Default for TrustCoreConfig {
    fn default() -> Self {
        Self {
            key_grace_window_secs: crate::key::DEFAULT_GRACE_WINDOW.as_secs() as i64,
            clock_skew_secs: crate::envelope::CLOCK_SKEW_SECS,
            nonce_ttl_secs: crate::envelope::NONCE_TTL_SECS,
            nonce_cache_capacity: 1_000_000,
            supported_protocol_major: "1".to_string(),
        }
    }
}

impl TrustCoreConfig {
    /// Parses configuration from a TOML document, falling back to defaults
    /// for any field the document omits.
    pub fn from_toml(src: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = TrustCoreConfig::from_toml("").unwrap();
        assert_eq!(cfg.clock_skew_secs, 300);
        assert_eq!(cfg.nonce_ttl_secs, 600);
    }

    #[test]
    fn partial_override_keeps_remaining_defaults() {
        let cfg = TrustCoreConfig::from_toml("clock_skew_secs = 120\n").unwrap();
        assert_eq!(cfg.clock_skew_secs, 120);
        assert_eq!(cfg.nonce_ttl_secs, 600);
    }
}
