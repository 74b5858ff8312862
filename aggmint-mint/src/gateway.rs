//! Mint gate behind inclusion verification and the replay ledger.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use aggmint_common::{encode_hex32, public_inputs_digest, AggregationDescriptor, MintRequest};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::ledger::ReplayLedger;
use crate::MintError;

/// Destination of minted value.
///
/// The gateway drives this after the replay claim succeeds; a failed
/// credit rolls the claim back so the request can be retried.
#[async_trait]
pub trait TokenSink: Send + Sync {
    async fn credit(&self, recipient: &str, amount: u128) -> Result<(), MintError>;
}

/// Balance map for tests and local runs.
#[derive(Default)]
pub struct InMemoryTokenSink {
    balances: Mutex<HashMap<String, u128>>,
}

impl InMemoryTokenSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, recipient: &str) -> u128 {
        self.balances
            .lock()
            .expect("balance map poisoned")
            .get(recipient)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl TokenSink for InMemoryTokenSink {
    async fn credit(&self, recipient: &str, amount: u128) -> Result<(), MintError> {
        let mut balances = self.balances.lock().expect("balance map poisoned");
        let balance = balances.entry(recipient.to_string()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| MintError::Transfer(format!("balance overflow for {recipient}")))?;
        Ok(())
    }
}

/// Registry of aggregation roots the gateway trusts.
///
/// Keyed by `(domain_id, aggregation_id)`. Roots arrive out of band
/// from whoever watches the aggregation contract; a descriptor naming
/// an unknown pair cannot mint.
#[derive(Clone, Default)]
pub struct RootRegistry {
    roots: Arc<Mutex<HashMap<(u64, u64), [u8; 32]>>>,
}

impl RootRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish_root(&self, domain_id: u64, aggregation_id: u64, root: [u8; 32]) {
        self.roots
            .lock()
            .expect("root registry poisoned")
            .insert((domain_id, aggregation_id), root);
    }

    pub fn root_for(&self, domain_id: u64, aggregation_id: u64) -> Option<[u8; 32]> {
        self.roots
            .lock()
            .expect("root registry poisoned")
            .get(&(domain_id, aggregation_id))
            .copied()
    }
}

/// One-time mint gate.
///
/// A mint goes through three checks in order: the descriptor's root
/// must be registered, the leaf must verify against it, and the
/// nullifier plus public-input digest must be unclaimed. Only then is
/// the sink credited.
pub struct MintGateway<S: TokenSink> {
    registry: RootRegistry,
    ledger: ReplayLedger,
    sink: S,
}

impl<S: TokenSink> MintGateway<S> {
    pub fn new(registry: RootRegistry, ledger: ReplayLedger, sink: S) -> Self {
        Self {
            registry,
            ledger,
            sink,
        }
    }

    pub fn registry(&self) -> &RootRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &ReplayLedger {
        &self.ledger
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Check a descriptor against the registered root and recompute the
    /// inclusion proof for `leaf`.
    pub fn verify_inclusion(
        &self,
        descriptor: &AggregationDescriptor,
        leaf: [u8; 32],
    ) -> Result<(), MintError> {
        let registered = self
            .registry
            .root_for(descriptor.domain_id, descriptor.aggregation_id)
            .ok_or(MintError::UnknownRoot {
                domain_id: descriptor.domain_id,
                aggregation_id: descriptor.aggregation_id,
            })?;
        if registered != descriptor.root {
            return Err(MintError::RootMismatch);
        }
        if !aggmint_verifier::verify_descriptor(descriptor, leaf)? {
            return Err(MintError::RootMismatch);
        }
        Ok(())
    }

    /// Claim the replay keys and credit the recipient.
    ///
    /// The ledger claim happens before the credit; if the credit fails
    /// the claim is released, so a transient sink failure does not burn
    /// the nullifier.
    pub async fn mint(&self, request: &MintRequest) -> Result<(), MintError> {
        let digest = public_inputs_digest(&request.public_input_hashes);

        if let Err(err) = self.ledger.check_and_set(&request.nullifier, &digest) {
            if matches!(err, MintError::ReplayDetected) {
                warn!(
                    nullifier = %encode_hex32(&request.nullifier),
                    recipient = %request.recipient,
                    "mint replay rejected"
                );
            }
            return Err(err);
        }

        if let Err(err) = self.sink.credit(&request.recipient, request.amount).await {
            self.ledger.release(&request.nullifier, &digest);
            return Err(err);
        }

        info!(
            target: "audit",
            nullifier = %encode_hex32(&request.nullifier),
            recipient = %request.recipient,
            amount = request.amount,
            "mint credited"
        );
        Ok(())
    }

    /// Full gate: inclusion proof first, then the one-time mint.
    pub async fn verify_and_mint(
        &self,
        descriptor: &AggregationDescriptor,
        leaf: [u8; 32],
        request: &MintRequest,
    ) -> Result<(), MintError> {
        self.verify_inclusion(descriptor, leaf)?;
        self.mint(request).await
    }
}
