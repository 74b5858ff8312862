//! Durable store for aggregation descriptors.
//!
//! One record per completed job, keyed by job id, so an interrupted
//! run can re-drive the value-transfer boundary after a restart.

use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::sync::{Arc, Mutex};

use aggmint_common::AggregationDescriptor;

use crate::error::AggregatorError;

const DESCRIPTOR_DB_ENV: &str = "AGGMINT_DESCRIPTOR_DB";
const DEFAULT_DESCRIPTOR_DB_PATH: &str = "data/descriptors.db";

/// Store of aggregation descriptors keyed by job id.
#[derive(Clone)]
pub struct DescriptorStore {
    backend: Arc<DescriptorBackend>,
}

enum DescriptorBackend {
    InMemory(Mutex<HashMap<String, AggregationDescriptor>>),
    Persistent(sled::Db),
}

impl DescriptorStore {
    /// Volatile store for tests and one-shot runs.
    pub fn in_memory() -> Self {
        Self {
            backend: Arc::new(DescriptorBackend::InMemory(Mutex::new(HashMap::new()))),
        }
    }

    /// Sled-backed store, durable across restarts.
    pub fn persistent(path: impl AsRef<Path>) -> Result<Self, AggregatorError> {
        let db = sled::open(path.as_ref())
            .map_err(|err| AggregatorError::Store(format!("open descriptor db: {err}")))?;
        Ok(Self::with_db(db))
    }

    /// Wrap an already opened sled database.
    pub fn with_db(db: sled::Db) -> Self {
        Self {
            backend: Arc::new(DescriptorBackend::Persistent(db)),
        }
    }

    /// Open the store at the path named by `AGGMINT_DESCRIPTOR_DB`.
    pub fn from_env() -> Result<Self, AggregatorError> {
        let path = env::var(DESCRIPTOR_DB_ENV)
            .unwrap_or_else(|_| DEFAULT_DESCRIPTOR_DB_PATH.to_string());
        Self::persistent(path)
    }

    /// Persist the descriptor for a completed job.
    pub fn insert(
        &self,
        job_id: &str,
        descriptor: &AggregationDescriptor,
    ) -> Result<(), AggregatorError> {
        match &*self.backend {
            DescriptorBackend::InMemory(store) => {
                store
                    .lock()
                    .expect("descriptor store poisoned")
                    .insert(job_id.to_string(), descriptor.clone());
                Ok(())
            }
            DescriptorBackend::Persistent(db) => {
                let bytes = serde_json::to_vec(descriptor)
                    .map_err(|err| AggregatorError::Store(format!("encode descriptor: {err}")))?;
                db.insert(job_id.as_bytes(), bytes)
                    .map_err(|err| AggregatorError::Store(format!("insert descriptor: {err}")))?;
                db.flush()
                    .map_err(|err| AggregatorError::Store(format!("flush descriptor db: {err}")))?;
                Ok(())
            }
        }
    }

    /// Fetch the stored descriptor for a job, if any.
    pub fn get(&self, job_id: &str) -> Result<Option<AggregationDescriptor>, AggregatorError> {
        match &*self.backend {
            DescriptorBackend::InMemory(store) => Ok(store
                .lock()
                .expect("descriptor store poisoned")
                .get(job_id)
                .cloned()),
            DescriptorBackend::Persistent(db) => {
                let Some(bytes) = db
                    .get(job_id.as_bytes())
                    .map_err(|err| AggregatorError::Store(format!("get descriptor: {err}")))?
                else {
                    return Ok(None);
                };
                let descriptor = serde_json::from_slice(&bytes)
                    .map_err(|err| AggregatorError::Store(format!("decode descriptor: {err}")))?;
                Ok(Some(descriptor))
            }
        }
    }

    /// All job ids with a persisted descriptor.
    pub fn jobs(&self) -> Result<Vec<String>, AggregatorError> {
        match &*self.backend {
            DescriptorBackend::InMemory(store) => Ok(store
                .lock()
                .expect("descriptor store poisoned")
                .keys()
                .cloned()
                .collect()),
            DescriptorBackend::Persistent(db) => {
                let mut jobs = Vec::new();
                for entry in db.iter() {
                    let (key, _) = entry
                        .map_err(|err| AggregatorError::Store(format!("iterate db: {err}")))?;
                    jobs.push(String::from_utf8_lossy(&key).into_owned());
                }
                Ok(jobs)
            }
        }
    }
}
