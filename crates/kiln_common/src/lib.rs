//! Shared foundational types used across the kiln asset pipeline.
//!
//! This crate provides content fingerprints, fragment and output kinds, and the
//! group identity that keys every ledger record and artifact filename.

#![warn(missing_docs)]

pub mod fingerprint;
pub mod group;
pub mod kind;

pub use fingerprint::{Fingerprint, ParseFingerprintError};
pub use group::GroupId;
pub use kind::{FragmentKind, OutputKind};
