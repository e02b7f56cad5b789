//! In-memory, `BTreeMap`-backed registries for policy descriptors and
//! circuit minimum-version floors. These satisfy the `aegis-api` registry
//! traits and are suitable for tests and small deployments; a persistence
//! layer can implement the same traits over a real database.

use crate::policy::PolicyDescriptor;
use crate::semver::Version;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory store of published policy descriptors, keyed by
/// `(policy_id, version)`. Descriptors are immutable once inserted (§3).
#[derive(Default)]
pub struct InMemoryPolicyRegistry {
    descriptors: RwLock<BTreeMap<(String, Version), PolicyDescriptor>>,
    minimums: RwLock<BTreeMap<String, Version>>,
}

impl InMemoryPolicyRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a new policy descriptor version. Overwriting an existing
    /// `(policy_id, version)` pair is refused to preserve immutability.
    pub fn publish(&self, descriptor: PolicyDescriptor) -> Result<(), PolicyDescriptor> {
        let key = (descriptor.policy_id.clone(), descriptor.version);
        let mut descriptors = self.descriptors.write();
        if descriptors.contains_key(&key) {
            return Err(descriptor);
        }
        descriptors.insert(key, descriptor);
        Ok(())
    }

    /// Sets the anti-downgrade minimum version floor for a policy id.
    pub fn set_minimum(&self, policy_id: impl Into<String>, minimum: Version) {
        self.minimums.write().insert(policy_id.into(), minimum);
    }

    /// Looks up a specific published version of a policy.
    pub fn get(&self, policy_id: &str, version: Version) -> Option<PolicyDescriptor> {
        self.descriptors
            .read()
            .get(&(policy_id.to_string(), version))
            .cloned()
    }

    /// Looks up the latest published version of a policy, if any.
    pub fn latest(&self, policy_id: &str) -> Option<PolicyDescriptor> {
        self.descriptors
            .read()
            .range((policy_id.to_string(), Version::new(0, 0, 0))..)
            .take_while(|((id, _), _)| id == policy_id)
            .map(|(_, descriptor)| descriptor.clone())
            .max_by_key(|descriptor| descriptor.version)
    }

    /// The registered anti-downgrade floor for a policy id, if any.
    pub fn minimum_version(&self, policy_id: &str) -> Option<Version> {
        self.minimums.read().get(policy_id).copied()
    }
}

/// An in-memory store of per-circuit minimum-version floors (§4.4 step 1).
#[derive(Default)]
pub struct InMemoryCircuitRegistry {
    minimums: RwLock<BTreeMap<String, Version>>,
}

impl InMemoryCircuitRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or overwrites) the minimum-version floor for a circuit id.
    pub fn set_minimum(&self, circuit_id: impl Into<String>, minimum: Version) {
        self.minimums.write().insert(circuit_id.into(), minimum);
    }

    /// The registered floor, if the circuit id is known at all.
    pub fn minimum_version(&self, circuit_id: &str) -> Option<Version> {
        self.minimums.read().get(circuit_id).copied()
    }
}
