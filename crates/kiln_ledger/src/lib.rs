//! Generation ledger and artifact storage for kiln asset groups.
//!
//! The ledger remembers, per group and output kind, which artifact was last
//! written and the fingerprints of the fragments that produced it. The artifact
//! store writes, retires, and sweeps the content-addressed output files.

#![warn(missing_docs)]

pub mod artifact;
mod atomic;
pub mod error;
pub mod ledger;
pub mod record;

pub use artifact::ArtifactStore;
pub use error::LedgerError;
pub use ledger::{FileLedger, Ledger, MemoryLedger};
pub use record::LedgerRecord;
