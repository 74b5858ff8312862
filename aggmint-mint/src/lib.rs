//! Replay-protected minting behind aggregation inclusion proofs.
//!
//! A mint is granted exactly once per (nullifier, public-input digest)
//! pair, and only for a leaf whose inclusion in a registered
//! aggregation root verifies locally. Replay protection is a hard gate
//! in front of the value transfer, not an advisory check.

mod gateway;
mod ledger;

pub use gateway::{InMemoryTokenSink, MintGateway, RootRegistry, TokenSink};
pub use ledger::ReplayLedger;

use aggmint_verifier::InclusionError;
use thiserror::Error;

/// Failures of the mint gate.
#[derive(Debug, Error)]
pub enum MintError {
    /// The nullifier or the public-input digest was already claimed.
    #[error("nullifier or public input digest already used")]
    ReplayDetected,

    /// The inclusion proof is structurally inconsistent.
    #[error("invalid inclusion proof: {0}")]
    InvalidProof(#[from] InclusionError),

    /// The recomputed or presented root disagrees with the registered one.
    #[error("root does not match the registered aggregation root")]
    RootMismatch,

    /// No root has been registered for this aggregation.
    #[error("no registered root for domain {domain_id} aggregation {aggregation_id}")]
    UnknownRoot { domain_id: u64, aggregation_id: u64 },

    #[error("ledger error: {0}")]
    Ledger(String),

    #[error("transfer failed: {0}")]
    Transfer(String),
}
