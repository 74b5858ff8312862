//! Client configuration.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

/// Polling policy for aggregation jobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait between status queries.
    pub interval: Duration,
    /// Maximum number of status queries before giving up.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        // 60 attempts at 20s apiece, roughly twenty minutes of waiting.
        Self {
            interval: Duration::from_secs(20),
            max_attempts: 60,
        }
    }
}

impl PollPolicy {
    /// Load the policy from environment variables, with defaults.
    pub fn from_env() -> Self {
        let interval_secs: u64 = env::var("AGGMINT_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(20);

        let max_attempts: u32 = env::var("AGGMINT_MAX_POLL_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);

        Self {
            interval: Duration::from_secs(interval_secs),
            max_attempts,
        }
    }
}

/// Configuration for the aggregator HTTP client.
#[derive(Clone, Debug)]
pub struct AggregatorConfig {
    /// Base URL of the aggregation service.
    pub base_url: String,
    /// Target chain identifier for submissions.
    pub chain_id: u64,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Whether the verification key is already registered with the
    /// aggregator. Observed deployments always submit unregistered
    /// keys, so this defaults to false.
    pub vk_registered: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            chain_id: 845_320_009,
            timeout: Duration::from_secs(30),
            vk_registered: false,
        }
    }
}

impl AggregatorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let base_url =
            env::var("AGGMINT_AGGREGATOR_URL").context("AGGMINT_AGGREGATOR_URL must be set")?;

        let chain_id: u64 = env::var("AGGMINT_CHAIN_ID")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(845_320_009);

        let timeout_secs: u64 = env::var("AGGMINT_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let vk_registered = env::var("AGGMINT_VK_REGISTERED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(false);

        Ok(Self {
            base_url,
            chain_id,
            timeout: Duration::from_secs(timeout_secs),
            vk_registered,
        })
    }
}
