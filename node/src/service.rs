//! # Vault Service
//!
//! The node's application layer. Holds the vault registry and the two
//! collaborator seams, and turns API/CLI requests into calls on the
//! contracts crate:
//!
//! ```text
//! inspect  — kind, commitment and selector table of a definition
//! evaluate — verify a proposal against the registry at the current tip
//! build    — fetch the vault's UTXOs, plan and converge a transaction
//! submit   — verify, then hand to the broadcaster
//! ```
//!
//! [`VaultService::build_and_submit`] is the full loop with a signer: it
//! rebuilds from a fresh UTXO set when the broadcaster reports a lost race.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use vaultline_contracts::planner::{plan_and_build, selection_target};
use vaultline_contracts::{
    verify_proposal, BuildRequest, Evaluation, SpendFunction, Vault, VaultError, VaultRegistry,
};
use vaultline_protocol::config::{BuilderParams, SUBMIT_RETRY_LIMIT};
use vaultline_protocol::funds::{select_single, Broadcaster, FundsError, UtxoSource};
use vaultline_protocol::policy::PolicyError;
use vaultline_protocol::transaction::{
    BuildError, BuiltTransaction, SigningError, TransactionProposal,
};
use vaultline_protocol::value::LockingCommitment;

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no vault registered for commitment {commitment}")]
    UnknownVault { commitment: String },

    #[error("no spendable UTXO for vault {commitment}")]
    NoSpendableUtxo { commitment: String },

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: usize, last: FundsError },

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Funds(#[from] FundsError),

    #[error(transparent)]
    Signing(#[from] SigningError),
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// One row of a vault's selector table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorEntry {
    pub selector: u8,
    pub function: SpendFunction,
}

/// What `inspect` reports about a vault definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSummary {
    pub kind: String,
    pub commitment: LockingCommitment,
    pub template_hash: String,
    pub functions: Vec<SelectorEntry>,
}

impl VaultSummary {
    pub fn of(vault: &Vault) -> Self {
        Self {
            kind: vault.kind.to_string(),
            commitment: vault.commitment(),
            template_hash: hex::encode(vault.template_hash()),
            functions: vault
                .functions()
                .iter()
                .enumerate()
                .map(|(i, f)| SelectorEntry {
                    selector: i as u8,
                    function: *f,
                })
                .collect(),
        }
    }
}

/// An accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub txid: String,
    pub evaluations: Vec<Evaluation>,
    /// Commitments of successor vaults recorded because of this spend.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub successors: Vec<LockingCommitment>,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct VaultService {
    registry: RwLock<VaultRegistry>,
    source: Arc<dyn UtxoSource>,
    broadcaster: Arc<dyn Broadcaster>,
    params: BuilderParams,
    metrics: SharedMetrics,
}

impl VaultService {
    pub fn new(
        source: Arc<dyn UtxoSource>,
        broadcaster: Arc<dyn Broadcaster>,
        params: BuilderParams,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            registry: RwLock::new(VaultRegistry::new()),
            source,
            broadcaster,
            params,
            metrics,
        }
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    pub fn register(&self, vault: Vault) -> Result<VaultSummary, ServiceError> {
        vault.validate()?;
        let summary = VaultSummary::of(&vault);
        let mut registry = self.registry.write();
        registry.insert(vault);
        self.metrics.registered_vaults.set(registry.len() as i64);
        Ok(summary)
    }

    pub fn vault(&self, commitment: &LockingCommitment) -> Result<Vault, ServiceError> {
        self.registry
            .read()
            .get(commitment)
            .cloned()
            .ok_or_else(|| ServiceError::UnknownVault {
                commitment: commitment.to_hex(),
            })
    }

    pub fn vault_count(&self) -> usize {
        self.registry.read().len()
    }

    /// Verify `proposal` against the registry at the current chain tip.
    pub async fn evaluate(
        &self,
        proposal: &TransactionProposal,
    ) -> Result<Vec<Evaluation>, ServiceError> {
        let tip = self.source.chain_tip().await?;
        let started = Instant::now();
        let result = verify_proposal(proposal, &self.registry.read(), tip);
        self.metrics
            .evaluation_latency_seconds
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok(evaluations) => {
                self.metrics
                    .spends_accepted_total
                    .inc_by(evaluations.len() as u64);
                Ok(evaluations)
            }
            Err(e) => {
                self.metrics.record_rejection(e.class());
                Err(e.into())
            }
        }
    }

    /// Plan and converge `function` over the largest vault UTXO that covers
    /// [`selection_target`].
    pub async fn build(
        &self,
        commitment: &LockingCommitment,
        function: SpendFunction,
        request: &BuildRequest,
    ) -> Result<BuiltTransaction, ServiceError> {
        let vault = self.vault(commitment)?;
        let utxos = self.source.utxos_for(commitment).await?;
        let target = selection_target(&vault, function, request);
        let utxo = select_single(&utxos, target).ok_or_else(|| {
            ServiceError::NoSpendableUtxo {
                commitment: commitment.to_hex(),
            }
        })?;
        let tip = self.source.chain_tip().await?;

        let built = plan_and_build(&vault, function, utxo, request, tip, &self.params)?;
        self.metrics.transactions_built_total.inc();
        self.metrics
            .build_iterations
            .observe(built.iterations as f64);
        info!(
            vault = %commitment,
            %function,
            fee = built.fee,
            size = built.size,
            pending = built.signatures.len(),
            "transaction built"
        );
        Ok(built)
    }

    /// Verify and broadcast a signed proposal.
    pub async fn submit(
        &self,
        proposal: &TransactionProposal,
    ) -> Result<SubmitReceipt, ServiceError> {
        let evaluations = self.evaluate(proposal).await?;
        let txid = self.broadcaster.submit(proposal).await?;
        self.metrics.transactions_submitted_total.inc();
        let successors = self.record_successors(proposal, &evaluations);
        info!(txid = %hex::encode(txid), vault_inputs = evaluations.len(), "transaction submitted");
        Ok(SubmitReceipt {
            txid: hex::encode(txid),
            evaluations,
            successors,
        })
    }

    /// Build, sign with `sign`, and submit. A lost UTXO race triggers a
    /// rebuild from a fresh UTXO set, up to [`SUBMIT_RETRY_LIMIT`] attempts.
    pub async fn build_and_submit<F>(
        &self,
        commitment: &LockingCommitment,
        function: SpendFunction,
        request: &BuildRequest,
        sign: F,
    ) -> Result<SubmitReceipt, ServiceError>
    where
        F: Fn(&mut BuiltTransaction) -> Result<(), SigningError> + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut built = self.build(commitment, function, request).await?;
            sign(&mut built)?;
            match self.submit(&built.proposal).await {
                Err(ServiceError::Funds(e)) if e.is_retryable() => {
                    if attempt >= SUBMIT_RETRY_LIMIT {
                        return Err(ServiceError::RetriesExhausted {
                            attempts: attempt,
                            last: e,
                        });
                    }
                    self.metrics.submit_retries_total.inc();
                    warn!(attempt, error = %e, "submission lost a race, rebuilding");
                }
                other => return other,
            }
        }
    }

    /// Record the vaults a tracker follows after recurring payments and
    /// configuration updates. Failures are logged, not returned: the
    /// transaction is already accepted.
    fn record_successors(
        &self,
        proposal: &TransactionProposal,
        evaluations: &[Evaluation],
    ) -> Vec<LockingCommitment> {
        let mut recorded = Vec::new();
        let mut registry = self.registry.write();
        for evaluation in evaluations {
            let commitment = proposal.inputs[evaluation.input].utxo.commitment().clone();
            let Some(vault) = registry.get(&commitment) else {
                continue;
            };
            let successor = match evaluation.function {
                SpendFunction::ExecuteRecurring | SpendFunction::ClaimRecurring => {
                    vault.successor_after_payment()
                }
                SpendFunction::UpdateConfig => {
                    let update = proposal.inputs[evaluation.input]
                        .unlocking
                        .witness()
                        .and_then(|w| w.update.as_ref());
                    match update {
                        Some(update) => vault.apply_update(update),
                        None => continue,
                    }
                }
                _ => continue,
            };
            match successor.and_then(|s| registry.record_successor(&commitment, s)) {
                Ok(next) => recorded.push(next),
                Err(e) => warn!(vault = %commitment, error = %e, "successor not recorded"),
            }
        }
        self.metrics.registered_vaults.set(registry.len() as i64);
        recorded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use vaultline_contracts::{RecurringPayment, VaultConfig, VaultKind};
    use vaultline_protocol::crypto::{PubkeyHash, VaultKeypair};
    use vaultline_protocol::policy::{FailureClass, SignerSlot};
    use vaultline_protocol::transaction::{sign_vault_input, ChainTip};
    use vaultline_protocol::value::{OutPoint, TxOutput, Utxo};

    use crate::ledger::Ledger;
    use crate::metrics::NodeMetrics;

    const HEIGHT: u32 = 850_000;

    fn owner() -> VaultKeypair {
        VaultKeypair::from_seed(&[1; 32])
    }

    fn dest() -> LockingCommitment {
        LockingCommitment::p2pkh(&PubkeyHash::from_bytes([0xde; 20]))
    }

    fn basic() -> Vault {
        Vault::new(
            VaultKind::Basic,
            VaultConfig::single_owner(owner().pubkey_hash()),
        )
        .unwrap()
    }

    fn fund(ledger: &Ledger, vault: &Vault, tag: u8, value: u64) -> Utxo {
        let utxo = Utxo::new(
            OutPoint::new([tag; 32], 0),
            TxOutput::new(value, vault.commitment()),
        );
        ledger.fund(utxo.clone());
        utxo
    }

    fn service_over(ledger: Arc<Ledger>, broadcaster: Arc<dyn Broadcaster>) -> VaultService {
        VaultService::new(
            ledger,
            broadcaster,
            BuilderParams::default(),
            Arc::new(NodeMetrics::new().unwrap()),
        )
    }

    fn service(ledger: Arc<Ledger>) -> VaultService {
        service_over(ledger.clone(), ledger)
    }

    fn sign_owner(built: &mut BuiltTransaction) -> Result<(), SigningError> {
        sign_vault_input(&mut built.proposal, 0, SignerSlot::First, &owner())
    }

    #[test]
    fn summary_lists_the_selector_table() {
        let summary = VaultSummary::of(&basic());
        assert_eq!(summary.kind, "basic");
        assert_eq!(summary.functions.len(), 2);
        assert_eq!(summary.functions[1].function, SpendFunction::Deposit);
        assert_eq!(summary.template_hash.len(), 64);
    }

    #[tokio::test]
    async fn build_sign_submit() {
        let ledger = Arc::new(Ledger::new(ChainTip::at_height(HEIGHT)));
        let svc = service(ledger.clone());
        let vault = basic();
        let c = svc.register(vault.clone()).unwrap().commitment;
        fund(&ledger, &vault, 1, 1_000_000);

        let mut built = svc
            .build(&c, SpendFunction::OwnerSpend, &BuildRequest::payout(200_000, dest()))
            .await
            .unwrap();
        sign_owner(&mut built).unwrap();
        let receipt = svc.submit(&built.proposal).await.unwrap();

        assert_eq!(receipt.evaluations.len(), 1);
        assert_eq!(ledger.confirmed(), 1);
        // Continuation output is back under the vault.
        let left = ledger.utxos_for(&c).await.unwrap();
        assert_eq!(left.len(), 1);
        assert!(left[0].value() >= 799_500);
    }

    #[tokio::test]
    async fn unsigned_proposal_is_rejected_and_counted() {
        let ledger = Arc::new(Ledger::new(ChainTip::at_height(HEIGHT)));
        let svc = service(ledger.clone());
        let vault = basic();
        let c = svc.register(vault.clone()).unwrap().commitment;
        fund(&ledger, &vault, 1, 1_000_000);

        let built = svc
            .build(&c, SpendFunction::OwnerSpend, &BuildRequest::payout(200_000, dest()))
            .await
            .unwrap();
        let err = svc.submit(&built.proposal).await.unwrap_err();
        assert!(matches!(&err, ServiceError::Policy(e) if e.class() == FailureClass::Authorization));
        assert_eq!(ledger.confirmed(), 0);
        assert!(svc
            .metrics()
            .encode()
            .unwrap()
            .contains("class=\"authorization_failure\"} 1"));
    }

    #[tokio::test]
    async fn unknown_vault_and_empty_vault() {
        let ledger = Arc::new(Ledger::new(ChainTip::at_height(HEIGHT)));
        let svc = service(ledger);
        let c = basic().commitment();
        let req = BuildRequest::payout(1_000, dest());
        assert!(matches!(
            svc.build(&c, SpendFunction::OwnerSpend, &req).await,
            Err(ServiceError::UnknownVault { .. })
        ));
        svc.register(basic()).unwrap();
        assert!(matches!(
            svc.build(&c, SpendFunction::OwnerSpend, &req).await,
            Err(ServiceError::NoSpendableUtxo { .. })
        ));
    }

    #[tokio::test]
    async fn deposit_larger_than_the_vault() {
        let ledger = Arc::new(Ledger::new(ChainTip::at_height(HEIGHT)));
        let svc = service(ledger.clone());
        let vault = basic();
        let c = svc.register(vault.clone()).unwrap().commitment;
        fund(&ledger, &vault, 1, 10_000);
        let funding = Utxo::new(OutPoint::new([0x22; 32], 0), TxOutput::new(5_000_000, dest()));

        let built = svc
            .build(
                &c,
                SpendFunction::Deposit,
                &BuildRequest::deposit(2_000_000, vec![funding], dest()),
            )
            .await
            .unwrap();
        assert_eq!(built.proposal.inputs.len(), 2);
        assert_eq!(built.proposal.outputs[0].commitment, c);
        assert_eq!(built.proposal.outputs[0].value, 2_010_000);
    }

    /// Reports a lost race for the first `failures` submissions.
    struct Contended {
        ledger: Arc<Ledger>,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl Broadcaster for Contended {
        async fn submit(&self, proposal: &TransactionProposal) -> Result<[u8; 32], FundsError> {
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(FundsError::InputSpent {
                    outpoint: proposal.inputs[0].utxo.outpoint,
                });
            }
            self.ledger.submit(proposal).await
        }
    }

    #[tokio::test]
    async fn lost_race_is_retried() {
        let ledger = Arc::new(Ledger::new(ChainTip::at_height(HEIGHT)));
        let contended = Arc::new(Contended {
            ledger: ledger.clone(),
            failures: AtomicUsize::new(1),
        });
        let svc = service_over(ledger.clone(), contended);
        let vault = basic();
        let c = svc.register(vault.clone()).unwrap().commitment;
        fund(&ledger, &vault, 1, 1_000_000);

        let receipt = svc
            .build_and_submit(
                &c,
                SpendFunction::OwnerSpend,
                &BuildRequest::payout(100_000, dest()),
                sign_owner,
            )
            .await
            .unwrap();
        assert_eq!(receipt.txid.len(), 64);
        assert_eq!(svc.metrics().submit_retries_total.get(), 1);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let ledger = Arc::new(Ledger::new(ChainTip::at_height(HEIGHT)));
        let contended = Arc::new(Contended {
            ledger: ledger.clone(),
            failures: AtomicUsize::new(usize::MAX),
        });
        let svc = service_over(ledger.clone(), contended);
        let vault = basic();
        let c = svc.register(vault.clone()).unwrap().commitment;
        fund(&ledger, &vault, 1, 1_000_000);

        let err = svc
            .build_and_submit(
                &c,
                SpendFunction::OwnerSpend,
                &BuildRequest::payout(100_000, dest()),
                sign_owner,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::RetriesExhausted {
                attempts: SUBMIT_RETRY_LIMIT,
                ..
            }
        ));
        assert_eq!(ledger.confirmed(), 0);
    }

    #[tokio::test]
    async fn recurring_payment_records_successor() {
        let ledger = Arc::new(Ledger::new(ChainTip::at_height(HEIGHT)));
        let svc = service(ledger.clone());
        let payee = VaultKeypair::from_seed(&[9; 32]);
        let vault = Vault::new(
            VaultKind::Recurring,
            VaultConfig::single_owner(owner().pubkey_hash()).with_recurring(RecurringPayment {
                payee: payee.pubkey_hash(),
                amount: 50_000,
                next_due: 800_000,
                interval_blocks: 4_320,
            }),
        )
        .unwrap();
        let c = svc.register(vault.clone()).unwrap().commitment;
        fund(&ledger, &vault, 1, 1_000_000);

        let built = svc
            .build(&c, SpendFunction::ExecuteRecurring, &BuildRequest::default())
            .await
            .unwrap();
        let receipt = svc.submit(&built.proposal).await.unwrap();

        let expected = vault.successor_after_payment().unwrap().commitment();
        assert_eq!(receipt.successors, vec![expected.clone()]);
        assert_eq!(
            svc.vault(&expected).unwrap().config.recurring.map(|r| r.next_due),
            Some(804_320)
        );
        assert_eq!(svc.vault_count(), 2);
    }
}
