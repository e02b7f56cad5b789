//! The proof envelope builder (§4.5): assembles, signs, and emits a proof
//! envelope over a loaded circuit and a sealed credential.

use crate::{base64_url_encode, decode_credential};
use aegis_api::crypto::{SerializableKey, SigningKey};
use aegis_api::zk::ProverInputs;
use aegis_circuit::LoadedCircuit;
use aegis_crypto::algorithms::hash::sha256;
use aegis_crypto::canonical::canonical_bytes;
use aegis_types::credential::{ClaimMap, EncodedCredential};
use aegis_types::envelope::{Challenge, ProofEnvelope, PublicSignals, UnsignedEnvelope};
use aegis_types::error::EnvelopeError;
use aegis_types::semver::Version;

/// Builds proof envelopes signed under a single device signing key.
///
/// Generic over the device's signing-key type (`Ed25519PrivateKey` or
/// `EcdsaP256PrivateKey`) the same way the key registry signs under
/// whichever issuer key algorithm is Current — the builder itself does not
/// care which algorithm the device uses, only that it implements
/// [`SigningKey`].
pub struct ProofEnvelopeBuilder<'a, K: SigningKey> {
    device_signing_key: &'a K,
}

impl<'a, K: SigningKey> ProofEnvelopeBuilder<'a, K> {
    /// Binds a builder to the device's signing key. This key is distinct
    /// from the sealed-credential store's AEAD key (§4.5, §9).
    pub fn new(device_signing_key: &'a K) -> Self {
        Self { device_signing_key }
    }

    /// Assembles a proof envelope for `policy_id`/`policy_version` against
    /// `challenge`, binding `credential` and proving `claims` under
    /// `loaded_circuit`, per §4.5 steps 1-4.
    ///
    /// `result_bit` is the claim outcome the proof attests to (e.g. "over
    /// 18: yes"); the circuit itself is out of scope (§1 Non-goals), so the
    /// caller supplies the bit the prover is asked to prove rather than the
    /// builder deriving it from the opaque circuit logic.
    ///
    /// `issued_at` overrides the wall-clock instant baked into the envelope
    /// (and therefore into its signed bytes) when `Some`; pass `None` to use
    /// `now`. This lets callers — chiefly tests exercising the validator's
    /// clock-skew boundary (§4.7 step 6) — produce an envelope whose
    /// signature is valid for a specific `issued_at` from the start, rather
    /// than mutating an already-signed envelope and breaking its signature.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        &self,
        policy_id: &str,
        policy_version: Version,
        challenge: &Challenge,
        credential: &EncodedCredential,
        claims: ClaimMap,
        device_secret: Vec<u8>,
        loaded_circuit: &LoadedCircuit,
        result_bit: bool,
        issued_at: Option<i64>,
    ) -> Result<ProofEnvelope, EnvelopeError> {
        let now = issued_at.unwrap_or_else(crate::now_unix);
        let (_header, payload) = decode_credential(credential)?;

        // Step 1: construct the seven mandatory public signals.
        let credential_hash = hex::encode(sha256(credential.compact.as_bytes())?);
        let policy_hash = hex::encode(sha256(format!("{policy_id}@{policy_version}").as_bytes())?);
        let origin_hash = hex::encode(sha256(challenge.origin.to_lowercase().as_bytes())?);
        let challenge_hash = hex::encode(sha256(
            format!("{}:{}", challenge.origin.to_lowercase(), challenge.nonce).as_bytes(),
        )?);
        let issuance_instant = now;
        let expiry_instant = payload.exp;

        let public_signals = PublicSignals(vec![
            challenge_hash,
            credential_hash.clone(),
            policy_hash.clone(),
            origin_hash,
            issuance_instant.to_string(),
            expiry_instant.to_string(),
            if result_bit { "1" } else { "0" }.to_string(),
        ]);

        // Step 2: invoke the prover.
        let prover_inputs = ProverInputs {
            claims,
            device_secret,
        };
        let proof = loaded_circuit.prover.prove(&prover_inputs, &public_signals)?;

        // Step 3: fill the envelope struct.
        let mut envelope = ProofEnvelope {
            protocol_version: "1.0.0".to_string(),
            policy_id: policy_id.to_string(),
            policy_version,
            origin: challenge.origin.clone(),
            nonce: challenge.nonce.clone(),
            issued_at: now,
            proof,
            public_signals,
            credential_hash,
            policy_hash,
            signature: String::new(),
        };

        // Step 4: sign the canonical bytes with the signature field absent.
        let unsigned = UnsignedEnvelope::from(&envelope);
        let signed_bytes = canonical_bytes(&unsigned)?;
        let signature = self.device_signing_key.sign(&signed_bytes)?;
        envelope.signature = base64_url_encode(&signature.to_bytes());

        tracing::info!(
            target: "aegis_envelope",
            policy_id,
            policy_version = %policy_version,
            origin = %envelope.origin,
            "built proof envelope"
        );

        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_api::crypto::SigningKeyPair;
    use aegis_api::zk::{ZkBackend, ZkProver, ZkVerifier};
    use aegis_crypto::sign::eddsa::Ed25519KeyPair;
    use aegis_types::circuit::{ArtifactDescriptor, BuilderMetadata, CircuitManifest, ManifestArtifacts};
    use aegis_types::credential::{CredentialHeader, CredentialPayload};
    use aegis_types::envelope::ProofObject;

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

    struct StubVerifier;

    impl ZkVerifier for StubVerifier {
        fn verify(
            &self,
            _proof: &ProofObject,
            _public_signals: &PublicSignals,
        ) -> Result<bool, aegis_types::error::CryptoError> {
            Ok(true)
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

    fn loaded_circuit() -> LoadedCircuit {
        LoadedCircuit {
            circuit_id: "age_over_18".to_string(),
            version: Version::new(1, 0, 0),
            prover_bytes: b"prover-bytes".to_vec(),
            prover: Box::new(StubProver),
            verifier: Box::new(StubVerifier),
            manifest: CircuitManifest {
                circuit_id: "age_over_18".to_string(),
                version: Version::new(1, 0, 0),
                build_timestamp: 1_700_000_000,
                artifacts: ManifestArtifacts {
                    prover: ArtifactDescriptor {
                        filename: "prover.bin".to_string(),
                        size: 12,
                        sha256: "deadbeef".to_string(),
                    },
                    verification_key: ArtifactDescriptor {
                        filename: "vk.bin".to_string(),
                        size: 12,
                        sha256: "deadbeef".to_string(),
                    },
                },
                builder: BuilderMetadata {
                    name: "test-builder".to_string(),
                    version: "0.0.1".to_string(),
                },
                signature: "".to_string(),
            },
        }
    }

    fn encoded_credential(exp: i64) -> EncodedCredential {
        let header = CredentialHeader {
            alg: "EdDSA",
            kid: "kid-1".to_string(),
            typ: "aegis-cred+jwt",
        };
        let payload = CredentialPayload {
            jti: "jti-1".to_string(),
            iss: "aegis-issuer".to_string(),
            sub: "subject-hash".to_string(),
            aud: "age_over_18".to_string(),
            policy_version: Version::new(1, 0, 0),
            iat: 1_700_000_000,
            exp,
            nbf: None,
            claims: ClaimMap::new(),
            device_tag: "device-tag".to_string(),
        };
        let header_b64 = crate::base64_url_encode(&canonical_bytes(&header).unwrap());
        let payload_b64 = crate::base64_url_encode(&canonical_bytes(&payload).unwrap());
        EncodedCredential {
            compact: format!("{header_b64}.{payload_b64}.c2ln"),
        }
    }

    #[test]
    fn build_produces_a_self_consistent_envelope() {
        let key_pair = Ed25519KeyPair::generate().unwrap();
        let device_key = key_pair.private_key();
        let builder = ProofEnvelopeBuilder::new(&device_key);
        let challenge = Challenge {
            origin: "https://example.com".to_string(),
            nonce: hex::encode([7u8; 32]),
        };
        let credential = encoded_credential(1_700_003_600);
        let circuit = loaded_circuit();

        let envelope = builder
            .build(
                "age_over_18",
                Version::new(1, 0, 0),
                &challenge,
                &credential,
                ClaimMap::new(),
                b"device-secret".to_vec(),
                &circuit,
                true,
                None,
            )
            .unwrap();

        assert_eq!(envelope.origin, challenge.origin);
        assert_eq!(envelope.nonce, challenge.nonce);
        assert!(envelope.public_signals.is_well_formed());
        assert_eq!(
            envelope.public_signals.0[PublicSignals::RESULT_BIT],
            "1"
        );
        assert!(!envelope.signature.is_empty());
    }

    #[test]
    fn build_binds_expiry_from_the_credential_payload() {
        let key_pair = Ed25519KeyPair::generate().unwrap();
        let device_key = key_pair.private_key();
        let builder = ProofEnvelopeBuilder::new(&device_key);
        let challenge = Challenge {
            origin: "https://example.com".to_string(),
            nonce: hex::encode([3u8; 32]),
        };
        let credential = encoded_credential(1_800_000_000);
        let circuit = loaded_circuit();

        let envelope = builder
            .build(
                "age_over_18",
                Version::new(1, 0, 0),
                &challenge,
                &credential,
                ClaimMap::new(),
                Vec::new(),
                &circuit,
                false,
                None,
            )
            .unwrap();

        assert_eq!(
            envelope.public_signals.0[PublicSignals::EXPIRES_AT],
            "1800000000"
        );
    }
}
