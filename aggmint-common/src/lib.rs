//! Shared types and hashing helpers for the aggmint pipeline.
//!
//! Everything here is plain data: the proof submission that goes to the
//! remote aggregator, the job lifecycle it moves through, and the
//! aggregation descriptor that comes back. The descriptor is untrusted
//! input until `aggmint-verifier` has independently reconfirmed it.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Compute keccak-256 of a byte slice.
///
/// This is the hash the remote aggregator commits its Merkle tree with,
/// so every local recomputation must use it as well.
pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Keccak-256 over the concatenation of several byte slices.
pub fn keccak_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Digest of an ordered public-input vector.
///
/// This is the value recorded in the used-digest set of the replay
/// ledger: keccak over the concatenated 32-byte input hashes in order.
pub fn public_inputs_digest(hashes: &[[u8; 32]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for hash in hashes {
        hasher.update(hash);
    }
    hasher.finalize().into()
}

/// Derive a nullifier from a secret preimage.
///
/// Domain-separated so a preimage reused for another purpose can never
/// collide with a ledger key.
pub fn nullifier_from_preimage(preimage: &[u8; 32]) -> [u8; 32] {
    keccak_concat(&[b"aggmint.nullifier.v1", preimage])
}

/// Encode a 32-byte value as a 0x-prefixed hex string.
pub fn encode_hex32(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode a 0x-prefixed (or bare) hex string into a 32-byte value.
pub fn decode_hex32(s: &str) -> Result<[u8; 32], CodecError> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(stripped).map_err(|_| CodecError::InvalidHex(s.to_string()))?;
    let len = bytes.len();
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| CodecError::Length(len))
}

/// Errors from hex digest decoding at the wire boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid hex string '{0}'")]
    InvalidHex(String),

    #[error("expected 32 bytes, got {0}")]
    Length(usize),
}

/// Proving systems the aggregator accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvingSystem {
    #[serde(rename = "sp1")]
    Sp1,
    #[serde(rename = "groth16")]
    Groth16,
    #[serde(rename = "risc0")]
    Risc0,
}

impl ProvingSystem {
    /// Tag used in the aggregator's JSON API.
    pub fn wire_tag(&self) -> &'static str {
        match self {
            ProvingSystem::Sp1 => "sp1",
            ProvingSystem::Groth16 => "groth16",
            ProvingSystem::Risc0 => "risc0",
        }
    }

    /// 32-byte proving-system identifier committed into the leaf.
    pub fn id_hash(&self) -> [u8; 32] {
        keccak256(self.wire_tag().as_bytes())
    }

    /// Version hash committed into the leaf for this proving system.
    ///
    /// The aggregator currently pins the empty version for every
    /// supported system.
    pub fn version_hash(&self) -> [u8; 32] {
        keccak256(&[])
    }
}

/// A proof plus the metadata the aggregator needs to bundle it.
///
/// Immutable once submitted; the orchestrator validates shape before
/// anything leaves the process.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProofSubmission {
    pub proving_system: ProvingSystem,
    /// Opaque proof artifact bytes.
    pub proof: Vec<u8>,
    /// Ordered public-input hashes of the statement.
    pub public_signals: Vec<[u8; 32]>,
    /// Serialized verification key.
    pub verification_key: Vec<u8>,
    /// Target chain / domain identifier.
    pub chain_id: u64,
}

impl ProofSubmission {
    /// Check the artifact's presence and shape before submission.
    pub fn validate(&self) -> Result<(), SubmissionError> {
        if self.proof.is_empty() {
            return Err(SubmissionError::EmptyProof);
        }
        if self.public_signals.is_empty() {
            return Err(SubmissionError::EmptySignals);
        }
        if self.verification_key.is_empty() {
            return Err(SubmissionError::EmptyVerificationKey);
        }
        Ok(())
    }

    /// Hash of the verification key as committed by the aggregator.
    pub fn vk_hash(&self) -> [u8; 32] {
        keccak256(&self.verification_key)
    }

    /// Hash of the ordered public-input vector.
    pub fn public_inputs_hash(&self) -> [u8; 32] {
        public_inputs_digest(&self.public_signals)
    }
}

/// Shape violations caught before a submission leaves the process.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("proof artifact is empty")]
    EmptyProof,

    #[error("public signal vector is empty")]
    EmptySignals,

    #[error("verification key is empty")]
    EmptyVerificationKey,
}

/// Handle for a submitted aggregation job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_id: String,
}

/// Lifecycle of an aggregation job.
///
/// Transitions are monotonic; `Aggregated`, `Failed` and `TimedOut`
/// are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Submitted,
    Pending,
    Aggregated,
    Failed,
    TimedOut,
}

impl JobStatus {
    /// Parse the aggregator's wire status string.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "Submitted" => Some(JobStatus::Submitted),
            "Pending" => Some(JobStatus::Pending),
            "Aggregated" => Some(JobStatus::Aggregated),
            "Failed" => Some(JobStatus::Failed),
            "TimedOut" => Some(JobStatus::TimedOut),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Aggregated | JobStatus::Failed | JobStatus::TimedOut
        )
    }
}

/// Inclusion data for one proof inside an aggregated batch.
///
/// Produced only by a terminal `Aggregated` job. A descriptor received
/// from the network carries no authority of its own: the leaf must be
/// rebuilt locally and the root recomputed before it is acted on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationDescriptor {
    pub domain_id: u64,
    pub aggregation_id: u64,
    /// Sibling hashes from the leaf level upward.
    pub merkle_path: Vec<[u8; 32]>,
    pub leaf_index: u64,
    pub leaf_count: u64,
    /// Root claimed by the aggregator.
    pub root: [u8; 32],
}

/// A one-time value-transfer request gated by the replay ledger.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MintRequest {
    pub recipient: String,
    pub amount: u128,
    pub nullifier: [u8; 32],
    pub public_input_hashes: Vec<[u8; 32]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak_concat_matches_single_buffer() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"left");
        buf.extend_from_slice(b"right");
        assert_eq!(keccak_concat(&[b"left", b"right"]), keccak256(&buf));
    }

    #[test]
    fn public_inputs_digest_is_order_sensitive() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_ne!(
            public_inputs_digest(&[a, b]),
            public_inputs_digest(&[b, a])
        );
    }

    #[test]
    fn nullifier_derivation_is_domain_separated() {
        let preimage = [7u8; 32];
        let nullifier = nullifier_from_preimage(&preimage);
        assert_ne!(nullifier, keccak256(&preimage));
        assert_eq!(nullifier, nullifier_from_preimage(&preimage));
    }

    #[test]
    fn hex32_round_trip() {
        let value = keccak256(b"round trip");
        let encoded = encode_hex32(&value);
        assert!(encoded.starts_with("0x"));
        assert_eq!(decode_hex32(&encoded).unwrap(), value);
        assert_eq!(decode_hex32(&encoded[2..]).unwrap(), value);
    }

    #[test]
    fn decode_hex32_rejects_bad_input() {
        assert_eq!(
            decode_hex32("0x1234"),
            Err(CodecError::Length(2)),
        );
        assert!(matches!(
            decode_hex32("0xzz"),
            Err(CodecError::InvalidHex(_))
        ));
    }

    #[test]
    fn proving_system_id_hashes_differ() {
        assert_ne!(ProvingSystem::Sp1.id_hash(), ProvingSystem::Groth16.id_hash());
        assert_eq!(ProvingSystem::Sp1.id_hash(), keccak256(b"sp1"));
    }

    #[test]
    fn submission_shape_validation() {
        let good = ProofSubmission {
            proving_system: ProvingSystem::Sp1,
            proof: vec![1, 2, 3],
            public_signals: vec![[9u8; 32]],
            verification_key: vec![4, 5],
            chain_id: 845_320_009,
        };
        assert!(good.validate().is_ok());

        let mut empty_proof = good.clone();
        empty_proof.proof.clear();
        assert_eq!(empty_proof.validate(), Err(SubmissionError::EmptyProof));

        let mut no_signals = good.clone();
        no_signals.public_signals.clear();
        assert_eq!(no_signals.validate(), Err(SubmissionError::EmptySignals));

        let mut no_vk = good;
        no_vk.verification_key.clear();
        assert_eq!(no_vk.validate(), Err(SubmissionError::EmptyVerificationKey));
    }

    #[test]
    fn job_status_wire_parsing() {
        assert_eq!(JobStatus::from_wire("Pending"), Some(JobStatus::Pending));
        assert_eq!(JobStatus::from_wire("Aggregated"), Some(JobStatus::Aggregated));
        assert_eq!(JobStatus::from_wire("bogus"), None);
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Submitted.is_terminal());
    }

    #[test]
    fn descriptor_json_round_trip() {
        let descriptor = AggregationDescriptor {
            domain_id: 1,
            aggregation_id: 42,
            merkle_path: vec![[3u8; 32], [4u8; 32]],
            leaf_index: 1,
            leaf_count: 3,
            root: [5u8; 32],
        };
        let json = serde_json::to_string(&descriptor).unwrap();
        let decoded: AggregationDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, descriptor);
    }
}
