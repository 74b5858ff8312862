//! Leaf construction and Merkle inclusion verification.
//!
//! The aggregator commits each submitted proof as
//! `keccak256(provingSystemId ‖ vkHash ‖ versionHash ‖ keccak256(publicInputHash))`
//! and bundles the leaves into a keccak-256 binary tree. At every level
//! an unpaired rightmost node is promoted to the next level without
//! hashing, which is how the tree supports leaf counts that are not a
//! power of two.
//!
//! Everything in this crate is pure and stateless. Verification fails
//! closed: a structurally inconsistent proof is an error, never a
//! silent `true`.

use aggmint_common::{keccak256, keccak_concat, AggregationDescriptor, ProofSubmission};
use thiserror::Error;

/// Structural failures of an inclusion proof.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InclusionError {
    #[error("leaf index {index} out of range for {leaf_count} leaves")]
    IndexOutOfRange { index: u64, leaf_count: u64 },

    #[error("an empty tree has no inclusion proofs")]
    EmptyTree,

    #[error("sibling path length {actual} does not match tree shape (expected {expected})")]
    PathLength { expected: usize, actual: usize },
}

/// Build the leaf value the aggregator committed for a proof.
///
/// Deterministic and referentially transparent; any divergence from the
/// aggregator's own construction makes verification fail downstream
/// instead of silently passing.
pub fn build_leaf(
    proving_system_id: &[u8; 32],
    vk_hash: &[u8; 32],
    version_hash: &[u8; 32],
    public_input_hash: &[u8; 32],
) -> [u8; 32] {
    let inner = keccak256(public_input_hash);
    keccak_concat(&[proving_system_id, vk_hash, version_hash, &inner])
}

/// Build the committed leaf directly from a submission.
pub fn leaf_for_submission(submission: &ProofSubmission) -> [u8; 32] {
    build_leaf(
        &submission.proving_system.id_hash(),
        &submission.vk_hash(),
        &submission.proving_system.version_hash(),
        &submission.public_inputs_hash(),
    )
}

/// Number of siblings an inclusion proof must carry for this position.
pub fn expected_path_len(mut index: u64, mut leaf_count: u64) -> usize {
    let mut len = 0;
    while leaf_count > 1 {
        if index % 2 == 1 || index + 1 < leaf_count {
            len += 1;
        }
        index /= 2;
        leaf_count = (leaf_count + 1) / 2;
    }
    len
}

/// Recompute the tree root from a leaf and its sibling path.
///
/// The sibling path must be exactly consumed: too short or too long is
/// a [`InclusionError::PathLength`] failure.
pub fn compute_root(
    leaf: [u8; 32],
    path: &[[u8; 32]],
    index: u64,
    leaf_count: u64,
) -> Result<[u8; 32], InclusionError> {
    if leaf_count == 0 {
        return Err(InclusionError::EmptyTree);
    }
    if index >= leaf_count {
        return Err(InclusionError::IndexOutOfRange { index, leaf_count });
    }

    let expected = expected_path_len(index, leaf_count);
    if path.len() != expected {
        return Err(InclusionError::PathLength {
            expected,
            actual: path.len(),
        });
    }

    let mut hash = leaf;
    let mut idx = index;
    let mut remaining = leaf_count;
    let mut consumed = 0;

    while remaining > 1 {
        if idx % 2 == 1 {
            hash = keccak_concat(&[&path[consumed], &hash]);
            consumed += 1;
        } else if idx + 1 < remaining {
            hash = keccak_concat(&[&hash, &path[consumed]]);
            consumed += 1;
        }
        // An even node with no right neighbour is promoted unhashed.
        idx /= 2;
        remaining = (remaining + 1) / 2;
    }

    Ok(hash)
}

/// Verify a leaf against a claimed root.
///
/// Returns `Ok(true)` only when the recomputed root equals
/// `claimed_root` exactly; structural inconsistencies are surfaced as
/// errors rather than `Ok(false)`.
pub fn verify(
    leaf: [u8; 32],
    path: &[[u8; 32]],
    index: u64,
    leaf_count: u64,
    claimed_root: &[u8; 32],
) -> Result<bool, InclusionError> {
    let root = compute_root(leaf, path, index, leaf_count)?;
    Ok(&root == claimed_root)
}

/// Verify a locally built leaf against an aggregation descriptor.
pub fn verify_descriptor(
    descriptor: &AggregationDescriptor,
    leaf: [u8; 32],
) -> Result<bool, InclusionError> {
    verify(
        leaf,
        &descriptor.merkle_path,
        descriptor.leaf_index,
        descriptor.leaf_count,
        &descriptor.root,
    )
}
