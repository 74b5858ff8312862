//! Error types for the aggregator client.

use thiserror::Error;

/// Errors from proof submission and aggregation polling.
///
/// Every failure in this crate is a typed, reportable result; there is
/// no fatal crash path.
#[derive(Debug, Error)]
pub enum AggregatorError {
    /// The proof was malformed locally or failed the aggregator's
    /// optimistic check. No job handle exists.
    #[error("submission rejected: {0}")]
    SubmissionRejected(String),

    /// The aggregator reported terminal failure for the job.
    #[error("aggregation failed for job {job_id}")]
    AggregationFailed { job_id: String },

    /// The attempt cap was exhausted (or the aggregator itself timed
    /// the job out) without reaching `Aggregated`.
    #[error("aggregation timed out after {attempts} status attempts")]
    AggregationTimeout { attempts: u32 },

    /// The remote response did not match the expected schema.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Network-level failure talking to the aggregator. Retried during
    /// polling, but only within the attempt cap.
    #[error("transport error: {0}")]
    Transport(String),

    /// Descriptor store failure.
    #[error("descriptor store error: {0}")]
    Store(String),

    /// Polling was cancelled by the caller's token.
    #[error("polling cancelled")]
    Cancelled,
}
