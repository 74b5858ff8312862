//! One-shot replay ledger.
//!
//! Two keyed sets back the mint gate: spent nullifiers and consumed
//! public-input digests. A mint claims its keys in both sets in one
//! atomic step, so two claims sharing either key can never both
//! succeed, regardless of interleaving.

use std::collections::HashSet;
use std::env;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::MintError;

const LEDGER_DB_ENV: &str = "AGGMINT_LEDGER_DB";
const DEFAULT_LEDGER_DB_PATH: &str = "data/ledger.db";

/// Ledger of spent nullifiers and consumed public-input digests.
#[derive(Clone)]
pub struct ReplayLedger {
    backend: Arc<LedgerBackend>,
}

struct UsedSets {
    nullifiers: HashSet<[u8; 32]>,
    digests: HashSet<[u8; 32]>,
}

enum LedgerBackend {
    InMemory(Mutex<UsedSets>),
    Persistent {
        db: sled::Db,
        nullifiers: sled::Tree,
        digests: sled::Tree,
        /// Serializes the compound check-and-set across both trees.
        guard: Mutex<()>,
    },
}

impl ReplayLedger {
    /// Volatile ledger for tests and one-shot runs.
    pub fn in_memory() -> Self {
        Self {
            backend: Arc::new(LedgerBackend::InMemory(Mutex::new(UsedSets {
                nullifiers: HashSet::new(),
                digests: HashSet::new(),
            }))),
        }
    }

    /// Sled-backed ledger, durable across restarts.
    pub fn persistent(path: impl AsRef<Path>) -> Result<Self, MintError> {
        let db = sled::open(path.as_ref())
            .map_err(|err| MintError::Ledger(format!("open ledger db: {err}")))?;
        Self::with_db(db)
    }

    /// Wrap an already opened sled database.
    pub fn with_db(db: sled::Db) -> Result<Self, MintError> {
        let nullifiers = db
            .open_tree("nullifiers")
            .map_err(|err| MintError::Ledger(format!("open nullifier tree: {err}")))?;
        let digests = db
            .open_tree("digests")
            .map_err(|err| MintError::Ledger(format!("open digest tree: {err}")))?;
        Ok(Self {
            backend: Arc::new(LedgerBackend::Persistent {
                db,
                nullifiers,
                digests,
                guard: Mutex::new(()),
            }),
        })
    }

    /// Open the ledger at the path named by `AGGMINT_LEDGER_DB`.
    pub fn from_env() -> Result<Self, MintError> {
        let path =
            env::var(LEDGER_DB_ENV).unwrap_or_else(|_| DEFAULT_LEDGER_DB_PATH.to_string());
        Self::persistent(path)
    }

    /// Atomically claim a nullifier and a public-input digest.
    ///
    /// Fails with [`MintError::ReplayDetected`] when either key was
    /// already claimed, in which case neither set is modified.
    pub fn check_and_set(
        &self,
        nullifier: &[u8; 32],
        digest: &[u8; 32],
    ) -> Result<(), MintError> {
        match &*self.backend {
            LedgerBackend::InMemory(sets) => {
                let mut sets = sets.lock().expect("replay ledger poisoned");
                if sets.nullifiers.contains(nullifier) || sets.digests.contains(digest) {
                    return Err(MintError::ReplayDetected);
                }
                sets.nullifiers.insert(*nullifier);
                sets.digests.insert(*digest);
                Ok(())
            }
            LedgerBackend::Persistent {
                db,
                nullifiers,
                digests,
                guard,
            } => {
                let _guard = guard.lock().expect("replay ledger poisoned");
                let nullifier_used = nullifiers
                    .contains_key(nullifier)
                    .map_err(|err| MintError::Ledger(format!("read nullifier: {err}")))?;
                let digest_used = digests
                    .contains_key(digest)
                    .map_err(|err| MintError::Ledger(format!("read digest: {err}")))?;
                if nullifier_used || digest_used {
                    return Err(MintError::ReplayDetected);
                }

                nullifiers
                    .insert(nullifier, &[])
                    .map_err(|err| MintError::Ledger(format!("insert nullifier: {err}")))?;
                if let Err(err) = digests.insert(digest, &[]) {
                    // Keep the sets consistent when only half landed.
                    let _ = nullifiers.remove(nullifier);
                    return Err(MintError::Ledger(format!("insert digest: {err}")));
                }
                db.flush()
                    .map_err(|err| MintError::Ledger(format!("flush ledger: {err}")))?;
                Ok(())
            }
        }
    }

    /// Return both keys to the unclaimed state.
    ///
    /// Only called when the value transfer behind a successful
    /// check-and-set failed, so the claim must not stick.
    pub(crate) fn release(&self, nullifier: &[u8; 32], digest: &[u8; 32]) {
        match &*self.backend {
            LedgerBackend::InMemory(sets) => {
                let mut sets = sets.lock().expect("replay ledger poisoned");
                sets.nullifiers.remove(nullifier);
                sets.digests.remove(digest);
            }
            LedgerBackend::Persistent {
                db,
                nullifiers,
                digests,
                guard,
            } => {
                let _guard = guard.lock().expect("replay ledger poisoned");
                let _ = nullifiers.remove(nullifier);
                let _ = digests.remove(digest);
                let _ = db.flush();
            }
        }
    }

    /// Whether a nullifier has been claimed.
    pub fn nullifier_used(&self, nullifier: &[u8; 32]) -> Result<bool, MintError> {
        match &*self.backend {
            LedgerBackend::InMemory(sets) => Ok(sets
                .lock()
                .expect("replay ledger poisoned")
                .nullifiers
                .contains(nullifier)),
            LedgerBackend::Persistent { nullifiers, .. } => nullifiers
                .contains_key(nullifier)
                .map_err(|err| MintError::Ledger(format!("read nullifier: {err}"))),
        }
    }

    /// Whether a public-input digest has been consumed.
    pub fn digest_used(&self, digest: &[u8; 32]) -> Result<bool, MintError> {
        match &*self.backend {
            LedgerBackend::InMemory(sets) => Ok(sets
                .lock()
                .expect("replay ledger poisoned")
                .digests
                .contains(digest)),
            LedgerBackend::Persistent { digests, .. } => digests
                .contains_key(digest)
                .map_err(|err| MintError::Ledger(format!("read digest: {err}"))),
        }
    }
}
