//! The panic-wipe coordination seam (§4.3).
//!
//! `panic()` is specified as spanning more than the sealed-credential store
//! alone: "clears any cached circuit artifacts" names a second component
//! (the circuit loader's verified-bundle cache, §4.4) that the store has no
//! direct handle to. Rather than having the store depend on `aegis-circuit`
//! directly — which would invert the crate dependency order in §10 — the
//! store accepts any number of these as opaque handles and wipes them
//! best-effort alongside its own state.

/// A component that holds cached or stored state a device panic-wipe must
/// clear. Implemented by [`aegis_circuit`]'s loader cache and by the sealed
/// store itself.
pub trait Wipeable: Send + Sync {
    /// Clears this component's state. Returns the number of items cleared.
    /// Must not panic: a wipe is best-effort and one component's failure
    /// must not prevent the others from being cleared.
    fn wipe(&self) -> usize;
}
