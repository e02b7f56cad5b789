//! Circuit manifest data model (§3, §4.4, §6).

use crate::semver::Version;
use serde::{Deserialize, Serialize};

/// Descriptor for a single artifact blob referenced by a manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactDescriptor {
    /// Path or filename of the artifact at the artifact source.
    pub filename: String,
    /// Expected length in bytes.
    pub size: u64,
    /// Expected SHA-256 digest, hex-encoded.
    pub sha256: String,
}

/// Metadata about who/what produced the circuit build, carried through
/// verification unmodified.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderMetadata {
    /// Name of the build tool or pipeline.
    pub name: String,
    /// Version of that tool.
    pub version: String,
}

/// The two artifacts a circuit manifest pins (§3): the prover blob and the
/// verification-key blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestArtifacts {
    /// The prover blob descriptor.
    pub prover: ArtifactDescriptor,
    /// The verification-key blob descriptor.
    pub verification_key: ArtifactDescriptor,
}

/// A circuit manifest as received from the artifact source, before
/// signature/hash verification (§4.4, §6). `signature` is excluded from the
/// canonically-encoded bytes that are signed (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitManifest {
    /// Circuit id.
    pub circuit_id: String,
    /// Circuit version.
    pub version: Version,
    /// Unix seconds when this circuit build was produced.
    pub build_timestamp: i64,
    /// Artifact descriptors.
    pub artifacts: ManifestArtifacts,
    /// Builder metadata.
    pub builder: BuilderMetadata,
    /// Base64-encoded offline signature over the canonical manifest with
    /// this field absent.
    pub signature: String,
}

/// The canonical-encoding view of a manifest with the signature field
/// removed, per §4.6 ("The designated signature field ... is removed before
/// encoding"). Kept as a distinct type rather than stripped at runtime so
/// the omission is enforced at compile time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedManifest {
    /// Circuit id.
    pub circuit_id: String,
    /// Circuit version.
    pub version: Version,
    /// Build timestamp.
    pub build_timestamp: i64,
    /// Artifact descriptors.
    pub artifacts: ManifestArtifacts,
    /// Builder metadata.
    pub builder: BuilderMetadata,
}

impl From<&CircuitManifest> for UnsignedManifest {
    fn from(manifest: &CircuitManifest) -> Self {
        Self {
            circuit_id: manifest.circuit_id.clone(),
            version: manifest.version,
            build_timestamp: manifest.build_timestamp,
            artifacts: manifest.artifacts.clone(),
            builder: manifest.builder.clone(),
        }
    }
}
