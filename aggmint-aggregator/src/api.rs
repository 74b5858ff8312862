//! Wire schema for the aggregation service.
//!
//! The remote API is JSON over HTTP. Responses are deserialized into
//! the typed structs here and converted to domain types through
//! validating accessors; a shape mismatch is an
//! [`AggregatorError::SchemaMismatch`], never a crash or a silent
//! default.

use aggmint_common::{decode_hex32, AggregationDescriptor, JobStatus, ProofSubmission};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AggregatorError;

/// The aggregator's optimistic-verification success marker.
pub const OPTIMISTIC_SUCCESS: &str = "success";

/// Proof submission request body.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProofRequest {
    /// Proving system tag, e.g. `"sp1"`.
    pub proof_type: String,
    /// Whether the verification key is already registered remotely.
    pub verification_key_registered: bool,
    /// Target chain identifier.
    pub chain_id: u64,
    pub proof_data: ProofData,
}

/// Proof payload (hex at the boundary).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofData {
    pub proof: String,
    pub public_signals: Vec<String>,
    pub verification_key: String,
}

impl SubmitProofRequest {
    /// Encode a validated submission for the wire.
    pub fn from_submission(submission: &ProofSubmission, vk_registered: bool) -> Self {
        Self {
            proof_type: submission.proving_system.wire_tag().to_string(),
            verification_key_registered: vk_registered,
            chain_id: submission.chain_id,
            proof_data: ProofData {
                proof: format!("0x{}", hex::encode(&submission.proof)),
                public_signals: submission
                    .public_signals
                    .iter()
                    .map(|signal| format!("0x{}", hex::encode(signal)))
                    .collect(),
                verification_key: format!("0x{}", hex::encode(&submission.verification_key)),
            },
        }
    }
}

/// Response to a proof submission.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProofResponse {
    pub optimistic_verify: String,
    pub job_id: String,
}

/// Aggregation detail block returned for an aggregated job.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationDetails {
    pub domain_id: u64,
    pub merkle_path: Vec<String>,
    pub leaf_count: u64,
    pub index: u64,
    pub root: String,
}

/// Response to a job status query.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_details: Option<AggregationDetails>,
}

impl JobStatusResponse {
    /// Parse the wire status string into the job lifecycle enum.
    pub fn job_status(&self) -> Result<JobStatus, AggregatorError> {
        JobStatus::from_wire(&self.status).ok_or_else(|| {
            AggregatorError::SchemaMismatch(format!("unknown job status '{}'", self.status))
        })
    }

    /// Extract the validated aggregation descriptor.
    ///
    /// Only meaningful for an `Aggregated` job; a terminal success
    /// without a complete detail block is a schema mismatch.
    pub fn descriptor(&self) -> Result<AggregationDescriptor, AggregatorError> {
        let aggregation_id = self.aggregation_id.ok_or_else(|| {
            AggregatorError::SchemaMismatch("aggregated job is missing aggregationId".into())
        })?;
        let details = self.aggregation_details.as_ref().ok_or_else(|| {
            AggregatorError::SchemaMismatch("aggregated job is missing aggregationDetails".into())
        })?;

        let merkle_path = details
            .merkle_path
            .iter()
            .map(|entry| decode_hex32(entry))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                AggregatorError::SchemaMismatch(format!("bad merklePath entry: {err}"))
            })?;
        let root = decode_hex32(&details.root)
            .map_err(|err| AggregatorError::SchemaMismatch(format!("bad root: {err}")))?;

        Ok(AggregationDescriptor {
            domain_id: details.domain_id,
            aggregation_id,
            merkle_path,
            leaf_index: details.index,
            leaf_count: details.leaf_count,
            root,
        })
    }
}

/// Seam to the remote aggregation service.
///
/// The HTTP client implements this for production; tests substitute a
/// scripted implementation so polling is exercised without a network.
#[async_trait]
pub trait AggregatorApi: Send + Sync {
    /// Submit a proof for aggregation.
    async fn submit_proof(
        &self,
        request: &SubmitProofRequest,
    ) -> Result<SubmitProofResponse, AggregatorError>;

    /// Query the status of a submitted job.
    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse, AggregatorError>;
}
