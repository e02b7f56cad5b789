//! The proof envelope validator (§4.7): the ten fail-closed security
//! invariants a relying party checks before trusting an envelope. Order is
//! load-bearing — cheap structural checks run before expensive
//! cryptographic ones, and the nonce is only committed once every other
//! check has passed.

use crate::decode_credential;
use aegis_api::artifact::ArtifactSource;
use aegis_api::crypto::{SerializableKey, VerifyingKey};
use aegis_api::device::DeviceKeyDirectory;
use aegis_circuit::CircuitLoader;
use aegis_crypto::algorithms::hash::sha256;
use aegis_crypto::canonical::canonical_bytes;
use aegis_crypto::sign::ecdsa_p256::{EcdsaP256PublicKey, EcdsaP256Signature};
use aegis_crypto::sign::eddsa::{Ed25519PublicKey, Ed25519Signature};
use aegis_keyring::KeyRegistry;
use aegis_noncecache::NonceCache;
use aegis_types::config::TrustCoreConfig;
use aegis_types::credential::EncodedCredential;
use aegis_types::envelope::{ProofEnvelope, UnsignedEnvelope, ValidationOutcome, MIN_NONCE_BYTES};
use aegis_types::error::{EnvelopeError, ErrorCode, ReasonCode};
use aegis_types::key::KeyAlgorithm;
use aegis_types::registry::InMemoryPolicyRegistry;

/// Validates proof envelopes against a policy registry, a circuit loader,
/// an issuer key registry, a device-key directory, and a nonce replay
/// cache — every collaborator named in §2's pipeline diagram downstream of
/// the builder.
pub struct EnvelopeValidator<'a, S: ArtifactSource, D: DeviceKeyDirectory> {
    keyring: &'a KeyRegistry,
    policies: &'a InMemoryPolicyRegistry,
    circuits: &'a CircuitLoader<S>,
    devices: &'a D,
    nonces: &'a NonceCache,
    config: &'a TrustCoreConfig,
}

impl<'a, S: ArtifactSource, D: DeviceKeyDirectory> EnvelopeValidator<'a, S, D> {
    /// Binds a validator to its collaborators. None of these are owned by
    /// the validator; it only ever takes shared references, matching the
    /// §5 "shared-read-mostly state" concurrency model. `config` supplies
    /// the numeric knobs (clock skew, nonce TTL, supported protocol major)
    /// rather than the validator hard-coding the spec's example numbers.
    pub fn new(
        keyring: &'a KeyRegistry,
        policies: &'a InMemoryPolicyRegistry,
        circuits: &'a CircuitLoader<S>,
        devices: &'a D,
        nonces: &'a NonceCache,
        config: &'a TrustCoreConfig,
    ) -> Self {
        Self {
            keyring,
            policies,
            circuits,
            devices,
            nonces,
            config,
        }
    }

    /// Runs the full §4.7 sequence against `envelope`, given the relying
    /// party's `expected_origin` and the credential the envelope was built
    /// over (the caller is expected to have already resolved this
    /// credential — e.g. via its own `CredentialRepository` lookup keyed by
    /// `envelope.credential_hash` — before calling `validate`).
    pub async fn validate(
        &self,
        envelope: &ProofEnvelope,
        expected_origin: &str,
        credential: &EncodedCredential,
    ) -> Result<ValidationOutcome, EnvelopeError> {
        let timer_start = std::time::Instant::now();
        let result = self.validate_uncounted(envelope, expected_origin, credential).await;
        aegis_telemetry::validation_metrics()
            .observe_validation_duration(timer_start.elapsed().as_secs_f64());
        match &result {
            Ok(_) => {
                aegis_telemetry::validation_metrics().inc_validation_result(ReasonCode::Valid.code());
                tracing::info!(target: "aegis_envelope", policy_id = %envelope.policy_id, "envelope validated");
            }
            Err(e) => {
                let code = e.code();
                aegis_telemetry::validation_metrics().inc_validation_result(code);
                tracing::warn!(target: "aegis_envelope", policy_id = %envelope.policy_id, reason = %e, "envelope rejected");
            }
        }
        result
    }

    async fn validate_uncounted(
        &self,
        envelope: &ProofEnvelope,
        expected_origin: &str,
        credential: &EncodedCredential,
    ) -> Result<ValidationOutcome, EnvelopeError> {
        // Step 1: structural completeness.
        if envelope.protocol_version.is_empty()
            || envelope.policy_id.is_empty()
            || envelope.origin.is_empty()
            || envelope.signature.is_empty()
            || !envelope.public_signals.is_well_formed()
        {
            return Err(EnvelopeError::Rejected(ReasonCode::MissingField));
        }
        let nonce_bytes = hex::decode(&envelope.nonce)
            .map_err(|_| EnvelopeError::Rejected(ReasonCode::MissingField))?;
        if nonce_bytes.len() < MIN_NONCE_BYTES {
            return Err(EnvelopeError::Rejected(ReasonCode::MissingField));
        }
        let credential_hash = hex::encode(sha256(credential.compact.as_bytes())?);
        if credential_hash != envelope.credential_hash {
            return Err(EnvelopeError::Rejected(ReasonCode::MissingField));
        }

        // Step 2: protocol version (supported major version "N.x").
        if !envelope
            .protocol_version
            .starts_with(&format!("{}.", self.config.supported_protocol_major))
        {
            return Err(EnvelopeError::Rejected(ReasonCode::UnsupportedProtocol));
        }

        // Step 3: anti-downgrade on the policy version, and resolve the
        // policy descriptor the rest of validation needs.
        let minimum = self
            .policies
            .minimum_version(&envelope.policy_id)
            .ok_or(EnvelopeError::Rejected(ReasonCode::DowngradeRejected))?;
        if envelope.policy_version < minimum {
            return Err(EnvelopeError::Rejected(ReasonCode::DowngradeRejected));
        }
        let policy = self
            .policies
            .get(&envelope.policy_id, envelope.policy_version)
            .ok_or(EnvelopeError::Rejected(ReasonCode::DowngradeRejected))?;

        // Step 4: origin binding, case-insensitively, against both the
        // caller's expectation and the hash embedded in the public signals.
        if !envelope.origin.eq_ignore_ascii_case(expected_origin) {
            return Err(EnvelopeError::Rejected(ReasonCode::OriginMismatch));
        }
        let expected_origin_hash = hex::encode(sha256(envelope.origin.to_lowercase().as_bytes())?);
        if envelope.public_signals.0[aegis_types::envelope::PublicSignals::ORIGIN_HASH]
            != expected_origin_hash
        {
            return Err(EnvelopeError::Rejected(ReasonCode::OriginMismatch));
        }

        // Step 5: policy binding.
        let expected_policy_hash = hex::encode(sha256(
            format!("{}@{}", envelope.policy_id, envelope.policy_version).as_bytes(),
        )?);
        if envelope.policy_hash != expected_policy_hash {
            return Err(EnvelopeError::Rejected(ReasonCode::PolicyMismatch));
        }

        // Step 6: clock skew.
        let now = crate::now_unix();
        if (now - envelope.issued_at).abs() > self.config.clock_skew_secs {
            return Err(EnvelopeError::Rejected(ReasonCode::ClockSkew));
        }

        // Step 7: nonce freshness. The commit is deferred to the end of
        // this sequence; this is only the early fail-fast check.
        if self.nonces.contains(&nonce_bytes) {
            return Err(EnvelopeError::Rejected(ReasonCode::NonceAlreadyUsed));
        }

        // Step 8: envelope signature, under the device key bound to the
        // credential's device tag.
        let (header, payload) = decode_credential(credential)?;
        let device_key = self
            .devices
            .resolve(&payload.device_tag)
            .await
            .map_err(|_| EnvelopeError::Rejected(ReasonCode::SignatureInvalid))?;
        let unsigned = UnsignedEnvelope::from(envelope);
        let signed_bytes = canonical_bytes(&unsigned)?;
        let signature_bytes = crate::base64_url_decode(&envelope.signature)
            .map_err(|_| EnvelopeError::Rejected(ReasonCode::SignatureInvalid))?;
        verify_device_signature(&device_key.algorithm, &device_key.public_key, &signed_bytes, &signature_bytes)
            .map_err(|_| EnvelopeError::Rejected(ReasonCode::SignatureInvalid))?;

        // Step 9: key state of the credential signer.
        let signer = self
            .keyring
            .by_id(&header.kid)
            .map_err(|_| EnvelopeError::Rejected(ReasonCode::UnknownKey))?;
        if !signer.can_verify(now) {
            return Err(EnvelopeError::Rejected(ReasonCode::RetiredKey));
        }

        // Step 10: zero-knowledge proof, over the circuit version itself
        // passing anti-downgrade (enforced inside `CircuitLoader::load`).
        let loaded = self
            .circuits
            .load(&policy.circuit_id, envelope.policy_version)
            .await
            .map_err(|_| EnvelopeError::Rejected(ReasonCode::InvalidProof))?;
        let claim_result_bit = loaded
            .verifier
            .verify(&envelope.proof, &envelope.public_signals)
            .map_err(|_| EnvelopeError::Rejected(ReasonCode::InvalidProof))?;

        // Every check passed: commit the nonce (step 7's deferred write).
        if !self
            .nonces
            .try_insert_at(&nonce_bytes, self.config.nonce_ttl_secs, now)
        {
            return Err(EnvelopeError::Rejected(ReasonCode::NonceAlreadyUsed));
        }

        Ok(ValidationOutcome {
            policy_id: envelope.policy_id.clone(),
            claim_result_bit,
            validated_at: now,
            origin: envelope.origin.clone(),
        })
    }
}

fn verify_device_signature(
    algorithm: &KeyAlgorithm,
    public_key_bytes: &[u8],
    message: &[u8],
    signature_bytes: &[u8],
) -> Result<(), EnvelopeError> {
    match algorithm {
        KeyAlgorithm::Ed25519 => {
            let public_key = Ed25519PublicKey::from_bytes(public_key_bytes)?;
            let signature = Ed25519Signature::from_bytes(signature_bytes)?;
            public_key.verify(message, &signature)?;
        }
        KeyAlgorithm::Es256 => {
            let public_key = EcdsaP256PublicKey::from_bytes(public_key_bytes)?;
            let signature = EcdsaP256Signature::from_bytes(signature_bytes)?;
            public_key.verify(message, &signature)?;
        }
    }
    Ok(())
}

trait EnvelopeErrorCodeExt {
    fn code(&self) -> &'static str;
}

impl EnvelopeErrorCodeExt for EnvelopeError {
    fn code(&self) -> &'static str {
        use aegis_types::error::ErrorCode;
        ErrorCode::code(self)
    }
}

trait ReasonCodeExt {
    fn code(&self) -> &'static str;
}

impl ReasonCodeExt for ReasonCode {
    fn code(&self) -> &'static str {
        use aegis_types::error::ErrorCode;
        ErrorCode::code(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_api::artifact::ArtifactBundle;
    use aegis_api::crypto::{SigningKey, SigningKeyPair};
    use aegis_api::device::DeviceSigningKey;
    use aegis_api::zk::{ProverInputs, ZkBackend, ZkProver, ZkVerifier};
    use aegis_crypto::aead::DeviceAead;
    use aegis_crypto::sign::eddsa::Ed25519KeyPair;
    use aegis_types::circuit::{ArtifactDescriptor, BuilderMetadata, CircuitManifest, ManifestArtifacts, UnsignedManifest};
    use aegis_types::credential::{ClaimMap, CredentialHeader, CredentialPayload};
    use aegis_types::envelope::{Challenge, ProofObject, PublicSignals};
    use aegis_types::policy::{PolicyDescriptor, PolicyStatus};
    use aegis_types::semver::Version;
    use async_trait::async_trait;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Mutex;

    struct StubVerifier;
    impl ZkVerifier for StubVerifier {
        fn verify(
            &self,
            _proof: &ProofObject,
            public_signals: &PublicSignals,
        ) -> Result<bool, aegis_types::error::CryptoError> {
            Ok(public_signals.0[PublicSignals::RESULT_BIT] == "1")
        }
    }

    struct StubProver;
    impl ZkProver for StubProver {
        fn prove(
            &self,
            _private_inputs: &ProverInputs,
            public_signals: &PublicSignals,
        ) -> Result<ProofObject, aegis_types::error::CryptoError> {
            Ok(ProofObject(public_signals.0.clone()))
        }
    }

    struct StubBackend;
    impl ZkBackend for StubBackend {
        fn load_verifier(
            &self,
            _verification_key_bytes: &[u8],
        ) -> Result<Box<dyn ZkVerifier>, aegis_types::error::CryptoError> {
            Ok(Box::new(StubVerifier))
        }
        fn load_prover(
            &self,
            _prover_bytes: &[u8],
        ) -> Result<Box<dyn ZkProver>, aegis_types::error::CryptoError> {
            Ok(Box::new(StubProver))
        }
    }

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
            self.bundle
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .take()
                .ok_or_else(|| StubSourceError("bundle already consumed".to_string()))
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("unknown device tag")]
    struct UnknownDeviceError;

    struct StubDirectory {
        device_tag: String,
        key: DeviceSigningKey,
    }

    #[async_trait]
    impl DeviceKeyDirectory for StubDirectory {
        type Error = UnknownDeviceError;
        async fn resolve(&self, device_tag: &str) -> Result<DeviceSigningKey, Self::Error> {
            if device_tag == self.device_tag {
                Ok(self.key.clone())
            } else {
                Err(UnknownDeviceError)
            }
        }
    }

    impl Clone for DeviceSigningKey {
        fn clone(&self) -> Self {
            Self {
                algorithm: self.algorithm,
                public_key: self.public_key.clone(),
            }
        }
    }

    struct Harness {
        keyring: KeyRegistry,
        policies: InMemoryPolicyRegistry,
        circuits: CircuitLoader<StubSource>,
        devices: StubDirectory,
        nonces: NonceCache,
        config: aegis_types::config::TrustCoreConfig,
        device_signing_key: aegis_crypto::sign::eddsa::Ed25519PrivateKey,
        credential: EncodedCredential,
    }

    fn manifest_bundle(manifest_key: &Ed25519KeyPair, circuit_id: &str, version: Version) -> ArtifactBundle {
        let prover_bytes = b"prover-bytes".to_vec();
        let vk_bytes = b"vk-bytes".to_vec();
        let unsigned = UnsignedManifest {
            circuit_id: circuit_id.to_string(),
            version,
            build_timestamp: 1_700_000_000,
            artifacts: ManifestArtifacts {
                prover: ArtifactDescriptor {
                    filename: "prover.bin".to_string(),
                    size: prover_bytes.len() as u64,
                    sha256: hex::encode(sha256(&prover_bytes).unwrap()),
                },
                verification_key: ArtifactDescriptor {
                    filename: "vk.bin".to_string(),
                    size: vk_bytes.len() as u64,
                    sha256: hex::encode(sha256(&vk_bytes).unwrap()),
                },
            },
            builder: BuilderMetadata {
                name: "test".to_string(),
                version: "0.0.1".to_string(),
            },
        };
        let signed_bytes = canonical_bytes(&unsigned).unwrap();
        let signature = manifest_key.sign(&signed_bytes).unwrap();
        let manifest = CircuitManifest {
            circuit_id: unsigned.circuit_id,
            version: unsigned.version,
            build_timestamp: unsigned.build_timestamp,
            artifacts: unsigned.artifacts,
            builder: unsigned.builder,
            signature: crate::base64_url_encode(&signature.to_bytes()),
        };
        let mut artifacts = BTreeMap::new();
        artifacts.insert("prover.bin".to_string(), prover_bytes);
        artifacts.insert("vk.bin".to_string(), vk_bytes);
        ArtifactBundle {
            manifest_bytes: serde_json::to_vec(&manifest).unwrap(),
            artifacts,
        }
    }

    fn harness() -> Harness {
        let config = aegis_types::config::TrustCoreConfig::default();
        let keyring = KeyRegistry::new(Box::new(DeviceAead::new([9u8; 32])), &config);
        let issuer_key = keyring.rotate(KeyAlgorithm::Ed25519).unwrap();

        let policies = InMemoryPolicyRegistry::new();
        let mut required_claims = BTreeSet::new();
        required_claims.insert("birth_year".to_string());
        policies
            .publish(PolicyDescriptor {
                policy_id: "age_over_18".to_string(),
                version: Version::new(1, 2, 0),
                circuit_id: "age_over_18_circuit".to_string(),
                minimum_version: Version::new(1, 0, 0),
                verification_key_fingerprint: "deadbeef".to_string(),
                required_claims,
                default_ttl_secs: 3600,
                status: PolicyStatus::Active,
            })
            .unwrap();
        policies.set_minimum("age_over_18", Version::new(1, 0, 0));

        let manifest_key = Ed25519KeyPair::generate().unwrap();
        let circuits = CircuitLoader::new(
            StubSource {
                bundle: Mutex::new(Some(manifest_bundle(&manifest_key, "age_over_18_circuit", Version::new(1, 2, 0)))),
            },
            Box::new(StubBackend),
            manifest_key.public_key(),
        );
        circuits.set_minimum_version("age_over_18_circuit", Version::new(1, 0, 0));

        let device_pair = Ed25519KeyPair::generate().unwrap();
        let device_signing_key = device_pair.private_key();
        let device_tag = "device-tag-1".to_string();
        let devices = StubDirectory {
            device_tag: device_tag.clone(),
            key: DeviceSigningKey {
                algorithm: KeyAlgorithm::Ed25519,
                public_key: device_pair.public_key().to_bytes(),
            },
        };

        let header = CredentialHeader {
            alg: issuer_key.algorithm.header_tag(),
            kid: issuer_key.kid.clone(),
            typ: "aegis-cred+jwt",
        };
        let mut claims = ClaimMap::new();
        claims.insert("birth_year".to_string(), "1990".to_string());
        let payload = CredentialPayload {
            jti: "jti-1".to_string(),
            iss: "aegis-issuer".to_string(),
            sub: "subject-hash".to_string(),
            aud: "age_over_18".to_string(),
            policy_version: Version::new(1, 2, 0),
            iat: 1_700_000_000,
            exp: 1_900_000_000,
            nbf: None,
            claims,
            device_tag,
        };
        let header_b64 = crate::base64_url_encode(&canonical_bytes(&header).unwrap());
        let payload_b64 = crate::base64_url_encode(&canonical_bytes(&payload).unwrap());
        let signing_input = format!("{header_b64}.{payload_b64}");
        let signed = keyring.sign_with_current(signing_input.as_bytes()).unwrap();
        let credential = EncodedCredential {
            compact: format!(
                "{header_b64}.{payload_b64}.{}",
                crate::base64_url_encode(&signed.signature)
            ),
        };

        Harness {
            keyring,
            policies,
            circuits,
            devices,
            nonces: NonceCache::new(&config),
            config,
            device_signing_key,
            credential,
        }
    }

    fn challenge() -> Challenge {
        Challenge {
            origin: "https://example.com".to_string(),
            nonce: hex::encode([4u8; 32]),
        }
    }

    async fn build_envelope(h: &Harness) -> ProofEnvelope {
        build_envelope_at(h, None).await
    }

    async fn build_envelope_at(h: &Harness, issued_at: Option<i64>) -> ProofEnvelope {
        let loaded = h.circuits.load("age_over_18_circuit", Version::new(1, 2, 0)).await.unwrap();
        let builder = crate::builder::ProofEnvelopeBuilder::new(&h.device_signing_key);
        let mut claims = ClaimMap::new();
        claims.insert("birth_year".to_string(), "1990".to_string());
        builder
            .build(
                "age_over_18",
                Version::new(1, 2, 0),
                &challenge(),
                &h.credential,
                claims,
                b"device-secret".to_vec(),
                &loaded,
                true,
                issued_at,
            )
            .unwrap()
    }

    #[tokio::test]
    async fn happy_path_validates() {
        let h = harness();
        let envelope = build_envelope(&h).await;
        let validator = EnvelopeValidator::new(&h.keyring, &h.policies, &h.circuits, &h.devices, &h.nonces, &h.config);

        let outcome = validator
            .validate(&envelope, "https://example.com", &h.credential)
            .await
            .unwrap();
        assert_eq!(outcome.policy_id, "age_over_18");
        assert!(outcome.claim_result_bit);
    }

    #[tokio::test]
    async fn cross_domain_replay_is_rejected() {
        let h = harness();
        let envelope = build_envelope(&h).await;
        let validator = EnvelopeValidator::new(&h.keyring, &h.policies, &h.circuits, &h.devices, &h.nonces, &h.config);

        let err = validator
            .validate(&envelope, "https://attacker.com", &h.credential)
            .await
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::Rejected(ReasonCode::OriginMismatch)));
    }

    #[tokio::test]
    async fn nonce_replay_is_rejected_on_the_second_call() {
        let h = harness();
        let envelope = build_envelope(&h).await;
        let validator = EnvelopeValidator::new(&h.keyring, &h.policies, &h.circuits, &h.devices, &h.nonces, &h.config);

        validator.validate(&envelope, "https://example.com", &h.credential).await.unwrap();
        let err = validator
            .validate(&envelope, "https://example.com", &h.credential)
            .await
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::Rejected(ReasonCode::NonceAlreadyUsed)));
    }

    #[tokio::test]
    async fn downgraded_policy_version_is_rejected_before_proof_verification() {
        let h = harness();
        h.policies.set_minimum("age_over_18", Version::new(2, 0, 0));
        let envelope = build_envelope(&h).await;
        let validator = EnvelopeValidator::new(&h.keyring, &h.policies, &h.circuits, &h.devices, &h.nonces, &h.config);

        let err = validator
            .validate(&envelope, "https://example.com", &h.credential)
            .await
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::Rejected(ReasonCode::DowngradeRejected)));
    }

    #[tokio::test]
    async fn retired_signing_key_is_rejected_even_before_expiry() {
        let h = harness();
        let envelope = build_envelope(&h).await;
        let kid = h.keyring.current().unwrap().kid;
        h.keyring.retire(&kid, "compromised", "security-team").unwrap();
        let validator = EnvelopeValidator::new(&h.keyring, &h.policies, &h.circuits, &h.devices, &h.nonces, &h.config);

        let err = validator
            .validate(&envelope, "https://example.com", &h.credential)
            .await
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::Rejected(ReasonCode::RetiredKey)));
    }

    #[tokio::test]
    async fn clock_skew_boundary() {
        let h = harness();
        let issued_at = crate::now_unix() - 299;
        let envelope = build_envelope_at(&h, Some(issued_at)).await;
        let validator = EnvelopeValidator::new(&h.keyring, &h.policies, &h.circuits, &h.devices, &h.nonces, &h.config);

        assert!(validator
            .validate(&envelope, "https://example.com", &h.credential)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn clock_skew_rejected_past_threshold() {
        let h = harness();
        let issued_at = crate::now_unix() - 301;
        let envelope = build_envelope_at(&h, Some(issued_at)).await;
        let validator = EnvelopeValidator::new(&h.keyring, &h.policies, &h.circuits, &h.devices, &h.nonces, &h.config);

        let err = validator
            .validate(&envelope, "https://example.com", &h.credential)
            .await
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::Rejected(ReasonCode::ClockSkew)));
    }
}
