//! Submission orchestration and bounded polling.

use aggmint_common::{AggregationDescriptor, JobHandle, JobStatus, ProofSubmission};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{AggregatorApi, SubmitProofRequest, OPTIMISTIC_SUCCESS};
use crate::config::PollPolicy;
use crate::error::AggregatorError;
use crate::store::DescriptorStore;

/// Drives a proof from submission to a verified-ready descriptor.
///
/// The orchestrator is the only component that touches the network.
/// Concurrent submissions poll independently; the descriptor store is
/// the only shared state and is written once per successful job.
pub struct Orchestrator<A: AggregatorApi> {
    api: A,
    policy: PollPolicy,
    store: DescriptorStore,
    vk_registered: bool,
}

impl<A: AggregatorApi> Orchestrator<A> {
    pub fn new(api: A, policy: PollPolicy, store: DescriptorStore) -> Self {
        Self {
            api,
            policy,
            store,
            vk_registered: false,
        }
    }

    /// Mark submissions as using an already registered verification key.
    pub fn with_vk_registered(mut self, vk_registered: bool) -> Self {
        self.vk_registered = vk_registered;
        self
    }

    /// Submit a proof to the aggregator.
    ///
    /// Local shape validation happens first; the remote optimistic
    /// check is the second gate. Either failure is
    /// [`AggregatorError::SubmissionRejected`] and no job handle
    /// exists.
    pub async fn submit(
        &self,
        submission: &ProofSubmission,
    ) -> Result<JobHandle, AggregatorError> {
        submission
            .validate()
            .map_err(|err| AggregatorError::SubmissionRejected(err.to_string()))?;

        let request = SubmitProofRequest::from_submission(submission, self.vk_registered);
        let response = self.api.submit_proof(&request).await?;

        if response.optimistic_verify != OPTIMISTIC_SUCCESS {
            return Err(AggregatorError::SubmissionRejected(format!(
                "optimistic verification returned '{}'",
                response.optimistic_verify
            )));
        }

        info!(job_id = %response.job_id, chain_id = submission.chain_id, "proof accepted by aggregator");
        Ok(JobHandle {
            job_id: response.job_id,
        })
    }

    /// Poll a job until it is aggregated, the attempt budget runs out,
    /// or the caller cancels.
    ///
    /// The status endpoint is queried at most `max_attempts` times with
    /// `interval` between queries, so the call terminates within
    /// `max_attempts x interval`. Transient transport errors consume an
    /// attempt; they are never retried beyond the cap. On success the
    /// descriptor is persisted keyed by job id before it is returned.
    /// No state is written on any failure path.
    pub async fn poll_until_aggregated(
        &self,
        job: &JobHandle,
        cancel: &CancellationToken,
    ) -> Result<AggregationDescriptor, AggregatorError> {
        for attempt in 1..=self.policy.max_attempts {
            match self.api.job_status(&job.job_id).await {
                Ok(response) => {
                    let status = response.job_status()?;
                    match status {
                        JobStatus::Aggregated => {
                            let descriptor = response.descriptor()?;
                            self.store.insert(&job.job_id, &descriptor)?;
                            info!(
                                job_id = %job.job_id,
                                aggregation_id = descriptor.aggregation_id,
                                leaf_index = descriptor.leaf_index,
                                "job aggregated"
                            );
                            return Ok(descriptor);
                        }
                        JobStatus::Failed => {
                            return Err(AggregatorError::AggregationFailed {
                                job_id: job.job_id.clone(),
                            });
                        }
                        JobStatus::TimedOut => {
                            return Err(AggregatorError::AggregationTimeout { attempts: attempt });
                        }
                        JobStatus::Submitted | JobStatus::Pending => {
                            debug!(job_id = %job.job_id, attempt, ?status, "job not yet aggregated");
                        }
                    }
                }
                Err(AggregatorError::Transport(err)) => {
                    warn!(job_id = %job.job_id, attempt, %err, "status query failed");
                }
                Err(other) => return Err(other),
            }

            if attempt < self.policy.max_attempts {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(AggregatorError::Cancelled),
                    _ = tokio::time::sleep(self.policy.interval) => {}
                }
            }
        }

        Err(AggregatorError::AggregationTimeout {
            attempts: self.policy.max_attempts,
        })
    }

    /// Descriptor persisted for a previously completed job, if any.
    ///
    /// Lets the surrounding system re-drive the value-transfer boundary
    /// when the first attempt was interrupted.
    pub fn stored_descriptor(
        &self,
        job_id: &str,
    ) -> Result<Option<AggregationDescriptor>, AggregatorError> {
        self.store.get(job_id)
    }

    pub fn store(&self) -> &DescriptorStore {
        &self.store
    }
}
