//! Core abstraction for the zero-knowledge proving/verifying backend.
//!
//! The circuits themselves are explicitly out of scope (§1 Non-goals); this
//! trait is the opaque seam the envelope validator (§4.7 step 10) calls
//! into. It is generic over the backend (Groth16, Plonky2, Halo2, ...) the
//! way the teacher's `ZkProofSystem` is generic over its chain's proving
//! system.

use aegis_types::envelope::{ProofObject, PublicSignals};
use aegis_types::error::CryptoError;
use std::collections::BTreeMap;

/// A verifier for a single loaded circuit's proving system.
///
/// Implementations wrap whatever verification key bytes the circuit loader
/// (§4.4) produced; this trait is the only way the rest of the core talks
/// to the prover/verifier pair.
pub trait ZkVerifier: Send + Sync {
    /// Verifies `proof` against `public_signals` under this verifier's
    /// verification key. Returns the circuit's result bit on success.
    fn verify(
        &self,
        proof: &ProofObject,
        public_signals: &PublicSignals,
    ) -> Result<bool, CryptoError>;
}

/// The private inputs the proof envelope builder (§4.5 step 2) feeds to the
/// prover alongside the public signals: the decrypted credential claims and
/// the device secret. Kept as a string map to stay agnostic to the proving
/// system's witness encoding, the same way [`ProofObject`] stays agnostic
/// to its field-element representation.
#[derive(Debug, Clone, Default)]
pub struct ProverInputs {
    /// Decrypted credential claims, keyed by claim name.
    pub claims: BTreeMap<String, String>,
    /// The device secret bound into the proof (never the AEAD key itself).
    pub device_secret: Vec<u8>,
}

/// A prover for a single loaded circuit's proving system — the other half
/// of the [`ZkVerifier`] pair named by §1 ("an opaque prover/verifier
/// pair with a verification key").
pub trait ZkProver: Send + Sync {
    /// Produces a proof object attesting that `public_signals` holds given
    /// `private_inputs`, under this prover's circuit.
    fn prove(
        &self,
        private_inputs: &ProverInputs,
        public_signals: &PublicSignals,
    ) -> Result<ProofObject, CryptoError>;
}

/// Parses raw prover/verification-key bytes (as pinned by a circuit
/// manifest) into ready-to-use [`ZkProver`]/[`ZkVerifier`] instances. One
/// backend (Groth16, Plonky2, Halo2, ...) implements this; the circuit
/// loader (§4.4) is generic over it the way the teacher's loader is generic
/// over its chain's proving system.
pub trait ZkBackend: Send + Sync {
    /// Parses `verification_key_bytes` and returns a verifier bound to it.
    fn load_verifier(
        &self,
        verification_key_bytes: &[u8],
    ) -> Result<Box<dyn ZkVerifier>, CryptoError>;

    /// Parses `prover_bytes` and returns a prover bound to it.
    fn load_prover(&self, prover_bytes: &[u8]) -> Result<Box<dyn ZkProver>, CryptoError>;
}
