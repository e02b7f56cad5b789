// Path: crates/aegis-circuit/src/lib.rs
//! Circuit artifact loader (§4.4).
//!
//! Resolves a `(circuit_id, version)` pair into a [`LoadedCircuit`]: a
//! parsed, hash-verified prover blob and a constructed [`ZkVerifier`], after
//! checking the requested version against a registered anti-downgrade floor
//! and the manifest's offline signature. The artifact transport (HTTP, a
//! CDN, a local directory) and the proving backend (Groth16, Halo2, ...) are
//! both pluggable seams supplied by the caller; this crate only enforces the
//! verification sequence in between.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::indexing_slicing))]

use aegis_api::artifact::ArtifactSource;
use aegis_api::wipe::Wipeable;
use aegis_api::zk::{ZkBackend, ZkProver, ZkVerifier};
use aegis_crypto::algorithms::hash::sha256;
use aegis_crypto::canonical::canonical_bytes;
use aegis_crypto::sign::eddsa::{Ed25519PublicKey, Ed25519Signature};
use aegis_api::crypto::{SerializableKey, VerifyingKey};
use aegis_types::circuit::{CircuitManifest, UnsignedManifest};
use aegis_types::error::CircuitLoaderError;
use aegis_types::registry::InMemoryCircuitRegistry;
use aegis_types::semver::Version;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::str::FromStr;

/// An opaque, fully-verified circuit bundle: the step 7 return value of
/// `load`. Holds the prover bytes, a ready-to-use verifier, and the
/// manifest they were pinned against.
pub struct LoadedCircuit {
    /// Circuit id this bundle was loaded for.
    pub circuit_id: String,
    /// Circuit version this bundle was loaded for.
    pub version: Version,
    /// Raw prover artifact bytes, hash-verified against the manifest.
    pub prover_bytes: Vec<u8>,
    /// A prover constructed from the hash-verified prover bytes, for the
    /// envelope builder (§4.5 step 2).
    pub prover: Box<dyn ZkProver>,
    /// A verifier constructed from the hash-verified verification-key bytes.
    pub verifier: Box<dyn ZkVerifier>,
    /// The manifest this bundle was loaded and verified against.
    pub manifest: CircuitManifest,
}

/// Loads and verifies circuit artifacts from an [`ArtifactSource`],
/// enforcing the minimum-version floor, offline manifest signature, and
/// per-artifact hash pinning described in §4.4.
///
/// `manifest_public_key` is the compile-time-embedded offline public key
/// manifests are signed under; it is supplied by the caller at
/// construction (typically a `const` byte array baked into the binary)
/// rather than hardcoded here, so the loader itself stays testable against
/// a throwaway key pair.
pub struct CircuitLoader<S: ArtifactSource> {
    source: S,
    registry: InMemoryCircuitRegistry,
    backend: Box<dyn ZkBackend>,
    manifest_public_key: Ed25519PublicKey,
    cache: RwLock<HashMap<(String, Version), std::sync::Arc<LoadedCircuit>>>,
}

impl<S: ArtifactSource> CircuitLoader<S> {
    /// Constructs a loader over the given artifact source, proving backend,
    /// and offline manifest-signing public key. The registry starts empty;
    /// callers register minimum-version floors with
    /// [`CircuitLoader::set_minimum_version`] before serving `load` calls.
    pub fn new(source: S, backend: Box<dyn ZkBackend>, manifest_public_key: Ed25519PublicKey) -> Self {
        Self {
            source,
            registry: InMemoryCircuitRegistry::new(),
            backend,
            manifest_public_key,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Registers (or overwrites) the minimum-version floor for a circuit id.
    pub fn set_minimum_version(&self, circuit_id: impl Into<String>, minimum: Version) {
        self.registry.set_minimum(circuit_id, minimum);
    }

    /// Drops every cached verified bundle, forcing the next `load` of each
    /// circuit to re-fetch and re-verify from scratch. Used by the
    /// sealed-store panic-wipe (§4.3: "clears any cached circuit
    /// artifacts").
    pub fn clear_cache(&self) -> usize {
        let mut cache = self.cache.write();
        let count = cache.len();
        cache.clear();
        count
    }

    /// Returns a cached bundle if one has already been verified for this
    /// exact `(circuit_id, version)`, without touching the artifact source.
    pub fn cached(&self, circuit_id: &str, version: Version) -> Option<std::sync::Arc<LoadedCircuit>> {
        self.cache
            .read()
            .get(&(circuit_id.to_string(), version))
            .cloned()
    }

    /// Loads circuit `circuit_id` at `version`, running the full
    /// verification sequence of §4.4 step 1-7 in order. Each step's failure
    /// short-circuits the rest: a downgraded version is never fetched, an
    /// unsigned manifest's artifacts are never hashed.
    pub async fn load(
        &self,
        circuit_id: &str,
        version: Version,
    ) -> Result<std::sync::Arc<LoadedCircuit>, CircuitLoaderError> {
        let timer_start = std::time::Instant::now();
        let result = self.load_uncached(circuit_id, version).await;
        aegis_telemetry::circuit_metrics().observe_circuit_load_duration(
            circuit_id,
            timer_start.elapsed().as_secs_f64(),
        );
        match &result {
            Ok(_) => {
                aegis_telemetry::circuit_metrics().inc_circuit_load(circuit_id, "ok");
                tracing::info!(target: "aegis_circuit", circuit_id, version = %version, "circuit loaded");
            }
            Err(e) => {
                aegis_telemetry::circuit_metrics().inc_circuit_load(circuit_id, e.code());
                tracing::warn!(target: "aegis_circuit", circuit_id, version = %version, error = %e, "circuit load failed");
            }
        }
        result
    }

    async fn load_uncached(
        &self,
        circuit_id: &str,
        version: Version,
    ) -> Result<std::sync::Arc<LoadedCircuit>, CircuitLoaderError> {
        if let Some(cached) = self.cached(circuit_id, version) {
            return Ok(cached);
        }

        // Step 1: minimum-version floor lookup.
        let minimum = self
            .registry
            .minimum_version(circuit_id)
            .ok_or_else(|| CircuitLoaderError::UnknownCircuit(circuit_id.to_string()))?;

        // Step 2: anti-downgrade check.
        if version < minimum {
            return Err(CircuitLoaderError::DowngradeRejected {
                circuit_id: circuit_id.to_string(),
                requested: version.to_string(),
                minimum: minimum.to_string(),
            });
        }

        // Step 3: fetch the manifest (and its artifacts) from the source.
        let bundle = self
            .source
            .fetch(circuit_id, &version.to_string())
            .await
            .map_err(|e| CircuitLoaderError::FetchFailed(e.to_string()))?;
        let manifest: CircuitManifest = serde_json::from_slice(&bundle.manifest_bytes)
            .map_err(|e| CircuitLoaderError::FetchFailed(format!("malformed manifest: {e}")))?;

        // Step 4: offline manifest signature verification, over the
        // canonical bytes of every field except the signature itself.
        let unsigned = UnsignedManifest::from(&manifest);
        let signed_bytes = canonical_bytes(&unsigned)?;
        let signature_bytes = base64_url_decode(&manifest.signature)
            .map_err(|_| CircuitLoaderError::ManifestSignatureInvalid)?;
        let signature = Ed25519Signature::from_bytes(&signature_bytes)
            .map_err(|_| CircuitLoaderError::ManifestSignatureInvalid)?;
        self.manifest_public_key
            .verify(&signed_bytes, &signature)
            .map_err(|_| CircuitLoaderError::ManifestSignatureInvalid)?;

        // Step 5: prover blob hash pinning.
        let prover_bytes = bundle
            .artifacts
            .get(&manifest.artifacts.prover.filename)
            .ok_or_else(|| {
                CircuitLoaderError::FetchFailed(format!(
                    "prover artifact {} missing from bundle",
                    manifest.artifacts.prover.filename
                ))
            })?
            .clone();
        verify_artifact_hash(&prover_bytes, &manifest.artifacts.prover.sha256)?;

        // Step 6: verification-key blob hash pinning.
        let verification_key_bytes = bundle
            .artifacts
            .get(&manifest.artifacts.verification_key.filename)
            .ok_or_else(|| {
                CircuitLoaderError::FetchFailed(format!(
                    "verification-key artifact {} missing from bundle",
                    manifest.artifacts.verification_key.filename
                ))
            })?
            .clone();
        verify_artifact_hash(&verification_key_bytes, &manifest.artifacts.verification_key.sha256)?;

        // Step 7: construct the opaque loaded-circuit value.
        let verifier = self.backend.load_verifier(&verification_key_bytes)?;
        let prover = self.backend.load_prover(&prover_bytes)?;
        let loaded = std::sync::Arc::new(LoadedCircuit {
            circuit_id: circuit_id.to_string(),
            version,
            prover_bytes,
            prover,
            verifier,
            manifest,
        });

        self.cache
            .write()
            .insert((circuit_id.to_string(), version), loaded.clone());

        Ok(loaded)
    }
}

impl<S: ArtifactSource> Wipeable for CircuitLoader<S> {
    fn wipe(&self) -> usize {
        self.clear_cache()
    }
}

fn verify_artifact_hash(bytes: &[u8], expected_hex: &str) -> Result<(), CircuitLoaderError> {
    let digest = sha256(bytes)?;
    if hex::encode(digest) != expected_hex.to_lowercase() {
        return Err(CircuitLoaderError::ArtifactTampered(format!(
            "expected sha256 {expected_hex}, got {}",
            hex::encode(digest)
        )));
    }
    Ok(())
}

fn base64_url_decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(s)
}

trait CircuitLoaderErrorCodeExt {
    fn code(&self) -> &'static str;
}

impl CircuitLoaderErrorCodeExt for CircuitLoaderError {
    fn code(&self) -> &'static str {
        use aegis_types::error::ErrorCode;
        ErrorCode::code(self)
    }
}

#[allow(dead_code)]
fn parse_version(s: &str) -> Result<Version, CircuitLoaderError> {
    Version::from_str(s).map_err(|e| CircuitLoaderError::FetchFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_api::artifact::ArtifactBundle;
    use aegis_api::crypto::SigningKeyPair;
    use aegis_crypto::sign::eddsa::Ed25519KeyPair;
    use aegis_types::circuit::{ArtifactDescriptor, BuilderMetadata, ManifestArtifacts};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Debug, thiserror::Error)]
    #[error("stub artifact source error: {0}")]
    struct StubSourceError(String);

    struct StubSource {
        bundle: Mutex<Option<ArtifactBundle>>,
    }

    #[async_trait]
    impl ArtifactSource for StubSource {
        type Error = StubSourceError;

        async fn fetch(&self, _circuit_id: &str, _version: &str) -> Result<ArtifactBundle, Self::Error> {
            let mut guard = self.bundle.lock().unwrap_or_else(|e| e.into_inner());
            guard
                .take()
                .ok_or_else(|| StubSourceError("no bundle configured".to_string()))
        }
    }

    struct StubVerifier(bool);

    impl ZkVerifier for StubVerifier {
        fn verify(
            &self,
            _proof: &aegis_types::envelope::ProofObject,
            _public_signals: &aegis_types::envelope::PublicSignals,
        ) -> Result<bool, aegis_types::error::CryptoError> {
            Ok(self.0)
        }
    }

    struct StubProver;

    impl ZkProver for StubProver {
        fn prove(
            &self,
            _private_inputs: &aegis_api::zk::ProverInputs,
            _public_signals: &aegis_types::envelope::PublicSignals,
        ) -> Result<aegis_types::envelope::ProofObject, aegis_types::error::CryptoError> {
            Ok(aegis_types::envelope::ProofObject(vec!["0".to_string()]))
        }
    }

    struct StubBackend;

    impl ZkBackend for StubBackend {
        fn load_verifier(
            &self,
            _verification_key_bytes: &[u8],
        ) -> Result<Box<dyn ZkVerifier>, aegis_types::error::CryptoError> {
            Ok(Box::new(StubVerifier(true)))
        }

        fn load_prover(
            &self,
            _prover_bytes: &[u8],
        ) -> Result<Box<dyn ZkProver>, aegis_types::error::CryptoError> {
            Ok(Box::new(StubProver))
        }
    }

    fn signed_manifest(key_pair: &Ed25519KeyPair, circuit_id: &str, version: Version) -> (CircuitManifest, Vec<u8>, Vec<u8>) {
        let prover_bytes = b"prover-blob-bytes".to_vec();
        let vk_bytes = b"verification-key-bytes".to_vec();
        let prover_hash = hex::encode(sha256(&prover_bytes).unwrap());
        let vk_hash = hex::encode(sha256(&vk_bytes).unwrap());

        let unsigned = UnsignedManifest {
            circuit_id: circuit_id.to_string(),
            version,
            build_timestamp: 1_700_000_000,
            artifacts: ManifestArtifacts {
                prover: ArtifactDescriptor {
                    filename: "prover.bin".to_string(),
                    size: prover_bytes.len() as u64,
                    sha256: prover_hash,
                },
                verification_key: ArtifactDescriptor {
                    filename: "vk.bin".to_string(),
                    size: vk_bytes.len() as u64,
                    sha256: vk_hash,
                },
            },
            builder: BuilderMetadata {
                name: "test-builder".to_string(),
                version: "0.0.1".to_string(),
            },
        };
        let signed_bytes = canonical_bytes(&unsigned).unwrap();
        let signature = key_pair.sign(&signed_bytes).unwrap();
        let signature_b64 = base64::Engine::encode(
            &base64::engine::general_purpose::URL_SAFE_NO_PAD,
            signature.to_bytes(),
        );

        let manifest = CircuitManifest {
            circuit_id: unsigned.circuit_id,
            version: unsigned.version,
            build_timestamp: unsigned.build_timestamp,
            artifacts: unsigned.artifacts,
            builder: unsigned.builder,
            signature: signature_b64,
        };
        (manifest, prover_bytes, vk_bytes)
    }

    fn loader_with_bundle(
        key_pair: &Ed25519KeyPair,
        circuit_id: &str,
        version: Version,
        floor: Version,
        corrupt_prover: bool,
        corrupt_signature: bool,
    ) -> CircuitLoader<StubSource> {
        let (mut manifest, prover_bytes, vk_bytes) = signed_manifest(key_pair, circuit_id, version);
        if corrupt_signature {
            manifest.signature = base64::Engine::encode(
                &base64::engine::general_purpose::URL_SAFE_NO_PAD,
                vec![0u8; 64],
            );
        }
        let manifest_bytes = serde_json::to_vec(&manifest).unwrap();

        let mut prover_for_bundle = prover_bytes;
        if corrupt_prover {
            prover_for_bundle[0] ^= 0xFF;
        }

        let mut artifacts = BTreeMap::new();
        artifacts.insert("prover.bin".to_string(), prover_for_bundle);
        artifacts.insert("vk.bin".to_string(), vk_bytes);

        let source = StubSource {
            bundle: Mutex::new(Some(ArtifactBundle {
                manifest_bytes,
                artifacts,
            })),
        };
        let loader = CircuitLoader::new(source, Box::new(StubBackend), key_pair.public_key());
        loader.set_minimum_version(circuit_id, floor);
        loader
    }

    #[tokio::test]
    async fn loads_a_well_formed_circuit() {
        let key_pair = Ed25519KeyPair::generate().unwrap();
        let version = Version::new(1, 0, 0);
        let loader = loader_with_bundle(&key_pair, "age_over_18", version, Version::new(1, 0, 0), false, false);

        let loaded = loader.load("age_over_18", version).await.unwrap();
        assert_eq!(loaded.circuit_id, "age_over_18");
        assert_eq!(loaded.version, version);
    }

    #[tokio::test]
    async fn rejects_unregistered_circuit() {
        let key_pair = Ed25519KeyPair::generate().unwrap();
        let source = StubSource { bundle: Mutex::new(None) };
        let loader = CircuitLoader::new(source, Box::new(StubBackend), key_pair.public_key());

        let err = loader.load("unknown_circuit", Version::new(1, 0, 0)).await.unwrap_err();
        assert!(matches!(err, CircuitLoaderError::UnknownCircuit(_)));
    }

    #[tokio::test]
    async fn rejects_version_below_floor_without_fetching() {
        let key_pair = Ed25519KeyPair::generate().unwrap();
        let loader = loader_with_bundle(
            &key_pair,
            "age_over_18",
            Version::new(1, 0, 0),
            Version::new(2, 0, 0),
            false,
            false,
        );

        let err = loader.load("age_over_18", Version::new(1, 0, 0)).await.unwrap_err();
        assert!(matches!(err, CircuitLoaderError::DowngradeRejected { .. }));
    }

    #[tokio::test]
    async fn rejects_invalid_manifest_signature() {
        let key_pair = Ed25519KeyPair::generate().unwrap();
        let version = Version::new(1, 0, 0);
        let loader = loader_with_bundle(&key_pair, "age_over_18", version, Version::new(1, 0, 0), false, true);

        let err = loader.load("age_over_18", version).await.unwrap_err();
        assert!(matches!(err, CircuitLoaderError::ManifestSignatureInvalid));
    }

    #[tokio::test]
    async fn rejects_tampered_prover_artifact() {
        let key_pair = Ed25519KeyPair::generate().unwrap();
        let version = Version::new(1, 0, 0);
        let loader = loader_with_bundle(&key_pair, "age_over_18", version, Version::new(1, 0, 0), true, false);

        let err = loader.load("age_over_18", version).await.unwrap_err();
        assert!(matches!(err, CircuitLoaderError::ArtifactTampered(_)));
    }

    #[tokio::test]
    async fn caches_a_successful_load() {
        let key_pair = Ed25519KeyPair::generate().unwrap();
        let version = Version::new(1, 0, 0);
        let loader = loader_with_bundle(&key_pair, "age_over_18", version, Version::new(1, 0, 0), false, false);

        loader.load("age_over_18", version).await.unwrap();
        // The stub source's bundle is consumed by the first fetch; a second
        // `load` must be served from cache rather than fetching again.
        let loaded_again = loader.load("age_over_18", version).await.unwrap();
        assert_eq!(loaded_again.circuit_id, "age_over_18");
    }

    #[tokio::test]
    async fn wipe_clears_the_cache() {
        let key_pair = Ed25519KeyPair::generate().unwrap();
        let version = Version::new(1, 0, 0);
        let loader = loader_with_bundle(&key_pair, "age_over_18", version, Version::new(1, 0, 0), false, false);

        loader.load("age_over_18", version).await.unwrap();
        assert!(loader.cached("age_over_18", version).is_some());

        let cleared = Wipeable::wipe(&loader);
        assert_eq!(cleared, 1);
        assert!(loader.cached("age_over_18", version).is_none());
    }
}
