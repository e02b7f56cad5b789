//! Nonce replay-cache entry data model (§3, §4.8).

/// A single tracked nonce and its expiry instant.
#[derive(Debug, Clone)]
pub struct NonceEntry {
    /// The nonce bytes (hex-decoded from the envelope's `nonce` field).
    pub nonce: Vec<u8>,
    /// Unix seconds after which this entry may be evicted/ignored.
    pub expires_at: i64,
}
