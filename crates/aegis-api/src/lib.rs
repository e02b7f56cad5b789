//! Trait contracts shared across the aegis trust core.
//!
//! This crate carries no logic of its own: it is the seam layer the
//! component crates (`aegis-crypto`, `aegis-keyring`, `aegis-credential`,
//! `aegis-circuit`, `aegis-envelope`, `aegis-noncecache`) implement or
//! depend on, and the boundary the core's collaborators (identity
//! providers, artifact hosting, the ZK backend) implement against.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::indexing_slicing)]

pub mod artifact;
pub mod crypto;
pub mod device;
pub mod identity;
pub mod repository;
pub mod wipe;
pub mod zk;
