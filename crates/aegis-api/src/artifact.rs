//! The circuit-artifact source boundary (§4.4, §6).
//!
//! Fetching manifests and artifact bytes from wherever they're hosted
//! (object storage, a CDN, a local directory) is explicitly left open by
//! the spec ("Non-goal: ... where artifacts are actually hosted"); this
//! trait is the seam the circuit loader calls through so that choice stays
//! pluggable.

use async_trait::async_trait;
use std::collections::BTreeMap;

/// Raw bytes for a circuit manifest plus its referenced artifacts, keyed by
/// filename as they appear in `CircuitManifest::artifacts`.
pub struct ArtifactBundle {
    /// The manifest document's raw bytes, still signed and unparsed.
    pub manifest_bytes: Vec<u8>,
    /// Artifact filename -> raw bytes, for every file the manifest names.
    pub artifacts: BTreeMap<String, Vec<u8>>,
}

/// The contract the circuit loader (§4.4) consumes to retrieve a
/// manifest and its artifacts for a given circuit id and requested
/// version. Implementations own the actual transport.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Source-specific error (network faults, missing objects, ...),
    /// surfaced distinctly from the loader's own validation errors (§7).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetches the manifest and artifact bytes for `circuit_id` at
    /// `version`. Returns an error if no such bundle is known to this
    /// source; the loader maps that onto `CircuitLoaderError::UnknownCircuit`.
    async fn fetch(
        &self,
        circuit_id: &str,
        version: &str,
    ) -> Result<ArtifactBundle, Self::Error>;
}
