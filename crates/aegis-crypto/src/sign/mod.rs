// Path: crates/aegis-crypto/src/sign/mod.rs

pub mod ecdsa_p256;
pub mod eddsa;
