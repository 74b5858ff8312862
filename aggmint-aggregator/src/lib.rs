//! aggmint-aggregator
//!
//! Client for the remote aggregation service.
//!
//! Flow:
//! 1. Submit a proof; the aggregator runs an optimistic check and
//!    returns a job id.
//! 2. Poll the job at a fixed interval with a bounded attempt budget.
//! 3. On `Aggregated`, validate the inclusion descriptor at the wire
//!    boundary, persist it keyed by job id, and hand it to the caller
//!    for independent Merkle re-verification.

mod api;
mod client;
mod config;
mod error;
mod orchestrator;
mod store;

pub use api::{
    AggregationDetails, AggregatorApi, ProofData, SubmitProofRequest, SubmitProofResponse,
    JobStatusResponse, OPTIMISTIC_SUCCESS,
};
pub use client::HttpAggregatorClient;
pub use config::{AggregatorConfig, PollPolicy};
pub use error::AggregatorError;
pub use orchestrator::Orchestrator;
pub use store::DescriptorStore;
