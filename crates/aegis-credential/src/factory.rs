//! The credential factory (§4.2): issues a signed, TTL-bounded credential
//! binding a subject, a policy, claims, and a device tag.

use crate::{base64_url_encode, now_unix};
use aegis_crypto::canonical::canonical_bytes;
use aegis_keyring::KeyRegistry;
use aegis_types::credential::{ClaimMap, CredentialHeader, CredentialPayload, EncodedCredential};
use aegis_types::error::CredentialError;
use aegis_types::policy::PolicyStatus;
use aegis_types::registry::InMemoryPolicyRegistry;
use std::time::Duration;
use uuid::Uuid;

/// Issues credentials under a fixed issuer identity, resolving policies from
/// `policies` and signing under `keyring`'s Current key.
pub struct CredentialFactory<'a> {
    keyring: &'a KeyRegistry,
    policies: &'a InMemoryPolicyRegistry,
    issuer: String,
}

impl<'a> CredentialFactory<'a> {
    /// Binds a factory to its key registry, policy registry, and the
    /// `iss` string this deployment issues credentials under.
    pub fn new(
        keyring: &'a KeyRegistry,
        policies: &'a InMemoryPolicyRegistry,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            keyring,
            policies,
            issuer: issuer.into(),
        }
    }

    /// Issues a credential for `subject_id` under `policy_id`, carrying
    /// `claims` and bound to `device_tag`. `ttl` overrides the policy's
    /// default TTL when supplied, per §4.2 steps 1-6.
    pub fn issue(
        &self,
        subject_id: &str,
        policy_id: &str,
        claims: ClaimMap,
        device_tag: &str,
        ttl: Option<Duration>,
    ) -> Result<EncodedCredential, CredentialError> {
        // Step 1: resolve the policy descriptor.
        let policy = self
            .policies
            .latest(policy_id)
            .ok_or_else(|| CredentialError::UnknownPolicy(policy_id.to_string()))?;
        if policy.status == PolicyStatus::Blocked {
            return Err(CredentialError::PolicyBlocked(policy_id.to_string()));
        }

        // Step 2: validate the claim map against the policy's required claims.
        for required in &policy.required_claims {
            if !claims.contains_key(required) {
                return Err(CredentialError::MissingClaim(required.clone()));
            }
        }

        // Step 3: obtain the Current key.
        let current = self
            .keyring
            .current()
            .map_err(|_| CredentialError::NoCurrentKey)?;

        // Step 4: construct the credential attributes.
        let now = now_unix();
        let ttl_secs = ttl
            .map(|d| d.as_secs() as i64)
            .unwrap_or(policy.default_ttl_secs);
        let payload = CredentialPayload {
            jti: generate_jti(),
            iss: self.issuer.clone(),
            sub: subject_id.to_string(),
            aud: policy_id.to_string(),
            policy_version: policy.version,
            iat: now,
            exp: now + ttl_secs,
            nbf: None,
            claims,
            device_tag: device_tag.to_string(),
        };
        let header = CredentialHeader {
            alg: current.algorithm.header_tag(),
            kid: current.kid.clone(),
            typ: "aegis-cred+jwt",
        };

        // Step 5: canonically encode and sign.
        let header_b64 = base64_url_encode(&canonical_bytes(&header)?);
        let payload_b64 = base64_url_encode(&canonical_bytes(&payload)?);
        let signing_input = format!("{header_b64}.{payload_b64}");
        let signed = self
            .keyring
            .sign_with_current(signing_input.as_bytes())
            .map_err(|e| match e {
                aegis_types::error::KeyRegistryError::Crypto(crypto) => CredentialError::Crypto(crypto),
                _ => CredentialError::NoCurrentKey,
            })?;
        let signature_b64 = base64_url_encode(&signed.signature);

        tracing::info!(
            target: "aegis_credential",
            policy_id,
            kid = %current.kid,
            "issued credential"
        );

        // Step 6: the factory never persists the credential itself.
        Ok(EncodedCredential {
            compact: format!("{header_b64}.{payload_b64}.{signature_b64}"),
        })
    }
}

fn generate_jti() -> String {
    hex::encode(Uuid::new_v4().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_api::crypto::{SerializableKey, VerifyingKey};
    use aegis_crypto::aead::DeviceAead;
    use aegis_crypto::sign::eddsa::{Ed25519PublicKey, Ed25519Signature};
    use aegis_types::policy::PolicyDescriptor;
    use aegis_types::semver::Version;
    use std::collections::BTreeSet;

    fn registry() -> KeyRegistry {
        KeyRegistry::new(Box::new(DeviceAead::new([5u8; 32])), &aegis_types::config::TrustCoreConfig::default())
    }

    fn publish_policy(policies: &InMemoryPolicyRegistry, policy_id: &str, status: PolicyStatus) {
        let mut required_claims = BTreeSet::new();
        required_claims.insert("birth_year".to_string());
        policies
            .publish(PolicyDescriptor {
                policy_id: policy_id.to_string(),
                version: Version::new(1, 0, 0),
                circuit_id: "age_over_18".to_string(),
                minimum_version: Version::new(1, 0, 0),
                verification_key_fingerprint: "deadbeef".to_string(),
                required_claims,
                default_ttl_secs: 3600,
                status,
            })
            .unwrap();
    }

    fn claim_map() -> ClaimMap {
        let mut claims = ClaimMap::new();
        claims.insert("birth_year".to_string(), "1990".to_string());
        claims
    }

    #[test]
    fn issues_a_credential_verifiable_under_the_current_key() {
        let keyring = registry();
        let key = keyring.rotate(aegis_types::key::KeyAlgorithm::Ed25519).unwrap();
        let policies = InMemoryPolicyRegistry::new();
        publish_policy(&policies, "age_over_18", PolicyStatus::Active);
        let factory = CredentialFactory::new(&keyring, &policies, "aegis-issuer");

        let encoded = factory
            .issue("subject-hash", "age_over_18", claim_map(), "device-tag", None)
            .unwrap();

        let (header_b64, payload_b64, signature_b64) = encoded.segments().unwrap();
        let signing_input = format!("{header_b64}.{payload_b64}");
        let signature_bytes = crate::base64_url_decode(signature_b64).unwrap();
        let public_key = Ed25519PublicKey::from_bytes(&key.public_key).unwrap();
        let signature = Ed25519Signature::from_bytes(&signature_bytes).unwrap();
        public_key.verify(signing_input.as_bytes(), &signature).unwrap();
    }

    #[test]
    fn rejects_unknown_policy() {
        let keyring = registry();
        keyring.rotate(aegis_types::key::KeyAlgorithm::Ed25519).unwrap();
        let policies = InMemoryPolicyRegistry::new();
        let factory = CredentialFactory::new(&keyring, &policies, "aegis-issuer");

        let err = factory
            .issue("subject-hash", "unknown_policy", claim_map(), "device-tag", None)
            .unwrap_err();
        assert!(matches!(err, CredentialError::UnknownPolicy(_)));
    }

    #[test]
    fn rejects_blocked_policy() {
        let keyring = registry();
        keyring.rotate(aegis_types::key::KeyAlgorithm::Ed25519).unwrap();
        let policies = InMemoryPolicyRegistry::new();
        publish_policy(&policies, "age_over_18", PolicyStatus::Blocked);
        let factory = CredentialFactory::new(&keyring, &policies, "aegis-issuer");

        let err = factory
            .issue("subject-hash", "age_over_18", claim_map(), "device-tag", None)
            .unwrap_err();
        assert!(matches!(err, CredentialError::PolicyBlocked(_)));
    }

    #[test]
    fn rejects_missing_required_claim() {
        let keyring = registry();
        keyring.rotate(aegis_types::key::KeyAlgorithm::Ed25519).unwrap();
        let policies = InMemoryPolicyRegistry::new();
        publish_policy(&policies, "age_over_18", PolicyStatus::Active);
        let factory = CredentialFactory::new(&keyring, &policies, "aegis-issuer");

        let err = factory
            .issue("subject-hash", "age_over_18", ClaimMap::new(), "device-tag", None)
            .unwrap_err();
        assert!(matches!(err, CredentialError::MissingClaim(_)));
    }

    #[test]
    fn rejects_issuance_with_no_current_key() {
        let keyring = registry();
        let policies = InMemoryPolicyRegistry::new();
        publish_policy(&policies, "age_over_18", PolicyStatus::Active);
        let factory = CredentialFactory::new(&keyring, &policies, "aegis-issuer");

        let err = factory
            .issue("subject-hash", "age_over_18", claim_map(), "device-tag", None)
            .unwrap_err();
        assert!(matches!(err, CredentialError::NoCurrentKey));
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn a_ttl_override_always_wins_over_the_policy_default(ttl_secs in 1i64..1_000_000) {
            let keyring = registry();
            keyring.rotate(aegis_types::key::KeyAlgorithm::Ed25519).unwrap();
            let policies = InMemoryPolicyRegistry::new();
            publish_policy(&policies, "age_over_18", PolicyStatus::Active);
            let factory = CredentialFactory::new(&keyring, &policies, "aegis-issuer");

            let encoded = factory
                .issue(
                    "subject-hash",
                    "age_over_18",
                    claim_map(),
                    "device-tag",
                    Some(std::time::Duration::from_secs(ttl_secs as u64)),
                )
                .unwrap();

            let (_, payload_b64, _) = encoded.segments().unwrap();
            let payload_bytes = crate::base64_url_decode(payload_b64).unwrap();
            let payload: aegis_types::credential::CredentialPayload =
                serde_json::from_slice(&payload_bytes).unwrap();
            prop_assert_eq!(payload.exp - payload.iat, ttl_secs);
        }
    }
}
