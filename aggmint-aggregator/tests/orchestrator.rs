use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aggmint_aggregator::{
    AggregationDetails, AggregatorApi, AggregatorError, DescriptorStore, JobStatusResponse,
    Orchestrator, PollPolicy, SubmitProofRequest, SubmitProofResponse,
};
use aggmint_common::{encode_hex32, keccak256, JobHandle, ProofSubmission, ProvingSystem};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// One scripted reply from the status endpoint.
enum Step {
    Status(JobStatusResponse),
    Transport(String),
}

/// Aggregator stand-in that replays a fixed status script.
///
/// Clones share the script and the submission log, so a test can keep
/// a handle while the orchestrator owns its own copy.
#[derive(Clone)]
struct ScriptedApi {
    optimistic_verify: String,
    submissions: Arc<Mutex<Vec<SubmitProofRequest>>>,
    script: Arc<Mutex<VecDeque<Step>>>,
}

impl ScriptedApi {
    fn new(optimistic_verify: &str, script: Vec<Step>) -> Self {
        Self {
            optimistic_verify: optimistic_verify.to_string(),
            submissions: Arc::new(Mutex::new(Vec::new())),
            script: Arc::new(Mutex::new(script.into_iter().collect())),
        }
    }
}

#[async_trait]
impl AggregatorApi for ScriptedApi {
    async fn submit_proof(
        &self,
        request: &SubmitProofRequest,
    ) -> Result<SubmitProofResponse, AggregatorError> {
        self.submissions.lock().unwrap().push(request.clone());
        Ok(SubmitProofResponse {
            optimistic_verify: self.optimistic_verify.clone(),
            job_id: "job-0xaggmint".to_string(),
        })
    }

    async fn job_status(&self, _job_id: &str) -> Result<JobStatusResponse, AggregatorError> {
        match self.script.lock().unwrap().pop_front() {
            Some(Step::Status(response)) => Ok(response),
            Some(Step::Transport(err)) => Err(AggregatorError::Transport(err)),
            // Script exhausted: the job just stays pending.
            None => Ok(pending()),
        }
    }
}

fn pending() -> JobStatusResponse {
    JobStatusResponse {
        status: "Pending".to_string(),
        aggregation_id: None,
        aggregation_details: None,
    }
}

fn terminal(status: &str) -> JobStatusResponse {
    JobStatusResponse {
        status: status.to_string(),
        aggregation_id: None,
        aggregation_details: None,
    }
}

fn aggregated(root: [u8; 32], path: &[[u8; 32]], index: u64, leaf_count: u64) -> JobStatusResponse {
    JobStatusResponse {
        status: "Aggregated".to_string(),
        aggregation_id: Some(7),
        aggregation_details: Some(AggregationDetails {
            domain_id: 1,
            merkle_path: path.iter().map(encode_hex32).collect(),
            leaf_count,
            index,
            root: encode_hex32(&root),
        }),
    }
}

fn sp1_submission() -> ProofSubmission {
    ProofSubmission {
        proving_system: ProvingSystem::Sp1,
        proof: vec![0xaa; 128],
        public_signals: vec![keccak256(b"signal-0")],
        verification_key: vec![0xbb; 32],
        chain_id: 845_320_009,
    }
}

fn fast_policy(max_attempts: u32) -> PollPolicy {
    PollPolicy {
        interval: Duration::from_secs(20),
        max_attempts,
    }
}

#[tokio::test(start_paused = true)]
async fn pending_pending_aggregated_returns_and_persists_descriptor() {
    let root = keccak256(b"R");
    let s1 = keccak256(b"s1");
    let s2 = keccak256(b"s2");
    let api = ScriptedApi::new(
        "success",
        vec![
            Step::Status(pending()),
            Step::Status(pending()),
            Step::Status(aggregated(root, &[s1, s2], 1, 3)),
        ],
    );
    let orchestrator = Orchestrator::new(api, fast_policy(60), DescriptorStore::in_memory());

    let job = orchestrator.submit(&sp1_submission()).await.unwrap();
    let descriptor = orchestrator
        .poll_until_aggregated(&job, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(descriptor.root, root);
    assert_eq!(descriptor.merkle_path, vec![s1, s2]);
    assert_eq!(descriptor.leaf_index, 1);
    assert_eq!(descriptor.leaf_count, 3);
    assert_eq!(descriptor.aggregation_id, 7);

    // Persisted keyed by job id, available for re-drive.
    assert_eq!(
        orchestrator.stored_descriptor(&job.job_id).unwrap(),
        Some(descriptor)
    );
}

#[tokio::test(start_paused = true)]
async fn submission_carries_wire_fields() {
    let api = ScriptedApi::new("success", vec![]);
    let orchestrator = Orchestrator::new(api.clone(), fast_policy(1), DescriptorStore::in_memory());

    orchestrator.submit(&sp1_submission()).await.unwrap();

    let submissions = api.submissions.lock().unwrap();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].proof_type, "sp1");
    assert_eq!(submissions[0].chain_id, 845_320_009);
    assert!(!submissions[0].verification_key_registered);
}

#[tokio::test(start_paused = true)]
async fn optimistic_failure_is_submission_rejected() {
    let api = ScriptedApi::new("failed", vec![]);
    let orchestrator = Orchestrator::new(api, fast_policy(1), DescriptorStore::in_memory());

    let err = orchestrator.submit(&sp1_submission()).await.unwrap_err();
    assert!(matches!(err, AggregatorError::SubmissionRejected(_)));
}

#[tokio::test(start_paused = true)]
async fn empty_proof_is_rejected_locally() {
    let api = ScriptedApi::new("success", vec![]);
    let orchestrator = Orchestrator::new(api.clone(), fast_policy(1), DescriptorStore::in_memory());

    let mut submission = sp1_submission();
    submission.proof.clear();
    let err = orchestrator.submit(&submission).await.unwrap_err();
    assert!(matches!(err, AggregatorError::SubmissionRejected(_)));
    // Nothing reached the remote.
    assert!(api.submissions.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_job_surfaces_aggregation_failed() {
    let api = ScriptedApi::new(
        "success",
        vec![Step::Status(pending()), Step::Status(terminal("Failed"))],
    );
    let orchestrator = Orchestrator::new(api, fast_policy(10), DescriptorStore::in_memory());

    let job = orchestrator.submit(&sp1_submission()).await.unwrap();
    let err = orchestrator
        .poll_until_aggregated(&job, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AggregatorError::AggregationFailed { .. }));
}

#[tokio::test(start_paused = true)]
async fn attempt_cap_exhaustion_is_timeout_within_budget() {
    let api = ScriptedApi::new("success", vec![]);
    let policy = fast_policy(5);
    let orchestrator = Orchestrator::new(api, policy, DescriptorStore::in_memory());

    let job = JobHandle {
        job_id: "job-timeout".to_string(),
    };
    let started = tokio::time::Instant::now();
    let err = orchestrator
        .poll_until_aggregated(&job, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AggregatorError::AggregationTimeout { attempts: 5 }
    ));
    assert!(started.elapsed() <= policy.interval * 5);
    assert_eq!(orchestrator.stored_descriptor("job-timeout").unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn transport_errors_consume_the_attempt_budget() {
    let api = ScriptedApi::new(
        "success",
        vec![
            Step::Transport("connection refused".into()),
            Step::Transport("connection refused".into()),
            Step::Transport("connection refused".into()),
        ],
    );
    let orchestrator = Orchestrator::new(api, fast_policy(3), DescriptorStore::in_memory());

    let job = JobHandle {
        job_id: "job-flaky".to_string(),
    };
    let err = orchestrator
        .poll_until_aggregated(&job, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AggregatorError::AggregationTimeout { attempts: 3 }
    ));
}

#[tokio::test(start_paused = true)]
async fn remote_timed_out_status_is_timeout() {
    let api = ScriptedApi::new("success", vec![Step::Status(terminal("TimedOut"))]);
    let orchestrator = Orchestrator::new(api, fast_policy(10), DescriptorStore::in_memory());

    let job = JobHandle {
        job_id: "job-remote-timeout".to_string(),
    };
    let err = orchestrator
        .poll_until_aggregated(&job, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AggregatorError::AggregationTimeout { .. }));
}

#[tokio::test(start_paused = true)]
async fn aggregated_without_details_is_schema_mismatch_and_persists_nothing() {
    let api = ScriptedApi::new("success", vec![Step::Status(terminal("Aggregated"))]);
    let orchestrator = Orchestrator::new(api, fast_policy(10), DescriptorStore::in_memory());

    let job = JobHandle {
        job_id: "job-bad-schema".to_string(),
    };
    let err = orchestrator
        .poll_until_aggregated(&job, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AggregatorError::SchemaMismatch(_)));
    assert_eq!(
        orchestrator.stored_descriptor("job-bad-schema").unwrap(),
        None
    );
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_polling() {
    let api = ScriptedApi::new("success", vec![]);
    let orchestrator = Orchestrator::new(api, fast_policy(60), DescriptorStore::in_memory());

    let job = JobHandle {
        job_id: "job-cancelled".to_string(),
    };
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = orchestrator
        .poll_until_aggregated(&job, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, AggregatorError::Cancelled));
}
