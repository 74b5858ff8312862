//! HTTP client for the aggregation service.

use async_trait::async_trait;
use tracing::debug;

use crate::api::{AggregatorApi, JobStatusResponse, SubmitProofRequest, SubmitProofResponse};
use crate::config::AggregatorConfig;
use crate::error::AggregatorError;

/// Aggregation service client over HTTP.
pub struct HttpAggregatorClient {
    config: AggregatorConfig,
    http: reqwest::Client,
}

impl HttpAggregatorClient {
    /// Create a new client.
    pub fn new(config: AggregatorConfig) -> Result<Self, AggregatorError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| AggregatorError::Transport(err.to_string()))?;

        Ok(Self { config, http })
    }

    /// Create a client for a specific base URL with default settings.
    pub fn with_url(base_url: impl Into<String>) -> Result<Self, AggregatorError> {
        Self::new(AggregatorConfig {
            base_url: base_url.into(),
            ..Default::default()
        })
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }
}

#[async_trait]
impl AggregatorApi for HttpAggregatorClient {
    async fn submit_proof(
        &self,
        request: &SubmitProofRequest,
    ) -> Result<SubmitProofResponse, AggregatorError> {
        let url = format!("{}/submit", self.config.base_url);
        debug!(%url, proof_type = %request.proof_type, "submitting proof");

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|err| AggregatorError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .map_err(|err| AggregatorError::SchemaMismatch(err.to_string()))
        } else if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            Err(AggregatorError::SubmissionRejected(format!(
                "HTTP {status}: {body}"
            )))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(AggregatorError::Transport(format!("HTTP {status}: {body}")))
        }
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse, AggregatorError> {
        let url = format!("{}/job-status/{}", self.config.base_url, job_id);
        debug!(%url, "querying job status");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| AggregatorError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .map_err(|err| AggregatorError::SchemaMismatch(err.to_string()))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(AggregatorError::Transport(format!("HTTP {status}: {body}")))
        }
    }
}
