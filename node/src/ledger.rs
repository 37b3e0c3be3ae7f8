//! # In-Memory Ledger
//!
//! A UTXO set behind a `parking_lot` lock, standing in for a chain. It
//! implements both collaborator seams: [`UtxoSource`] for queries and
//! [`Broadcaster`] for submission.
//!
//! Submission is atomic: every input is checked and the whole transaction
//! is applied under one write lock, so of two proposals racing for the same
//! UTXO exactly one wins and the other sees [`FundsError::InputSpent`].
//!
//! The ledger enforces single-spend and value conservation only. Policy is
//! the verifier's job and runs before anything reaches here.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info};

use vaultline_protocol::funds::{Broadcaster, FundsError, UtxoSource};
use vaultline_protocol::policy::is_height_locktime;
use vaultline_protocol::transaction::{ChainTip, TransactionProposal};
use vaultline_protocol::value::{self, LockingCommitment, OutPoint, TxOutput, Utxo};

#[derive(Debug, Default)]
struct LedgerState {
    unspent: HashMap<OutPoint, TxOutput>,
    spent: HashSet<OutPoint>,
    tip: ChainTip,
    confirmed: u64,
}

/// Shared in-memory UTXO set.
#[derive(Debug, Default)]
pub struct Ledger {
    state: RwLock<LedgerState>,
}

impl Ledger {
    pub fn new(tip: ChainTip) -> Self {
        Self {
            state: RwLock::new(LedgerState {
                tip,
                ..LedgerState::default()
            }),
        }
    }

    /// Seed an output, as a genesis allocation.
    pub fn fund(&self, utxo: Utxo) {
        let mut state = self.state.write();
        state.spent.remove(&utxo.outpoint);
        state.unspent.insert(utxo.outpoint, utxo.output);
    }

    pub fn utxo(&self, outpoint: &OutPoint) -> Option<Utxo> {
        self.state
            .read()
            .unspent
            .get(outpoint)
            .map(|o| Utxo::new(*outpoint, o.clone()))
    }

    pub fn tip(&self) -> ChainTip {
        self.state.read().tip
    }

    /// Advance the tip by `blocks`.
    pub fn advance(&self, blocks: u32) -> ChainTip {
        let mut state = self.state.write();
        state.tip.height = state.tip.height.saturating_add(blocks);
        state.tip
    }

    /// Transactions applied since start.
    pub fn confirmed(&self) -> u64 {
        self.state.read().confirmed
    }

    /// Check and apply `proposal` atomically. Returns its txid.
    pub fn apply(&self, proposal: &TransactionProposal) -> Result<[u8; 32], FundsError> {
        let txid = proposal.txid();
        let mut state = self.state.write();

        for input in &proposal.inputs {
            let outpoint = input.utxo.outpoint;
            match state.unspent.get(&outpoint) {
                Some(output) if *output == input.utxo.output => {}
                Some(_) => {
                    return Err(FundsError::Rejected {
                        reason: format!("input {outpoint} does not match the ledger output"),
                    })
                }
                None if state.spent.contains(&outpoint) => {
                    return Err(FundsError::InputSpent { outpoint })
                }
                None => return Err(FundsError::NotFound { outpoint }),
            }
        }

        let inputs = value::total(&proposal.input_values());
        let outputs = value::total(&proposal.output_values());
        if inputs < outputs {
            return Err(FundsError::Rejected {
                reason: format!("outputs {outputs} exceed inputs {inputs}"),
            });
        }
        if is_height_locktime(proposal.locktime) && state.tip.height < proposal.locktime {
            return Err(FundsError::Rejected {
                reason: format!(
                    "locktime {} not final at height {}",
                    proposal.locktime, state.tip.height
                ),
            });
        }

        for input in &proposal.inputs {
            state.unspent.remove(&input.utxo.outpoint);
            state.spent.insert(input.utxo.outpoint);
        }
        for (vout, output) in proposal.outputs.iter().enumerate() {
            state
                .unspent
                .insert(OutPoint::new(txid, vout as u32), output.clone());
        }
        state.confirmed += 1;

        info!(
            txid = %hex::encode(txid),
            inputs = proposal.inputs.len(),
            outputs = proposal.outputs.len(),
            fee = (inputs - outputs) as u64,
            "transaction applied"
        );
        Ok(txid)
    }
}

#[async_trait]
impl UtxoSource for Ledger {
    async fn utxos_for(&self, commitment: &LockingCommitment) -> Result<Vec<Utxo>, FundsError> {
        let state = self.state.read();
        let mut found: Vec<Utxo> = state
            .unspent
            .iter()
            .filter(|(_, o)| o.commitment == *commitment)
            .map(|(op, o)| Utxo::new(*op, o.clone()))
            .collect();
        found.sort_by_key(|u| (u.outpoint.txid, u.outpoint.vout));
        debug!(count = found.len(), "utxo query");
        Ok(found)
    }

    async fn chain_tip(&self) -> Result<ChainTip, FundsError> {
        Ok(self.tip())
    }
}

#[async_trait]
impl Broadcaster for Ledger {
    async fn submit(&self, proposal: &TransactionProposal) -> Result<[u8; 32], FundsError> {
        self.apply(proposal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultline_protocol::crypto::PubkeyHash;
    use vaultline_protocol::transaction::TxInput;

    fn addr(b: u8) -> LockingCommitment {
        LockingCommitment::p2pkh(&PubkeyHash::from_bytes([b; 20]))
    }

    fn seeded() -> (Ledger, Utxo) {
        let ledger = Ledger::new(ChainTip::at_height(100));
        let utxo = Utxo::new(OutPoint::new([1; 32], 0), TxOutput::new(10_000, addr(1)));
        ledger.fund(utxo.clone());
        (ledger, utxo)
    }

    fn pay(utxo: &Utxo, value: u64) -> TransactionProposal {
        TransactionProposal::new(
            vec![TxInput::new(utxo.clone())],
            vec![TxOutput::new(value, addr(2))],
            0,
        )
    }

    #[test]
    fn apply_moves_value() {
        let (ledger, utxo) = seeded();
        let txid = ledger.apply(&pay(&utxo, 9_000)).unwrap();
        assert!(ledger.utxo(&utxo.outpoint).is_none());
        assert_eq!(
            ledger.utxo(&OutPoint::new(txid, 0)).map(|u| u.value()),
            Some(9_000)
        );
        assert_eq!(ledger.confirmed(), 1);
    }

    #[test]
    fn second_spend_loses_the_race() {
        let (ledger, utxo) = seeded();
        ledger.apply(&pay(&utxo, 9_000)).unwrap();
        let err = ledger.apply(&pay(&utxo, 8_000)).unwrap_err();
        assert_eq!(
            err,
            FundsError::InputSpent {
                outpoint: utxo.outpoint
            }
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn unknown_and_inflating_are_rejected() {
        let (ledger, utxo) = seeded();
        let ghost = Utxo::new(OutPoint::new([9; 32], 0), TxOutput::new(1, addr(1)));
        assert!(matches!(
            ledger.apply(&pay(&ghost, 1)),
            Err(FundsError::NotFound { .. })
        ));
        assert!(matches!(
            ledger.apply(&pay(&utxo, 10_001)),
            Err(FundsError::Rejected { .. })
        ));
    }

    #[tokio::test]
    async fn query_by_commitment() {
        let (ledger, _) = seeded();
        assert_eq!(ledger.utxos_for(&addr(1)).await.unwrap().len(), 1);
        assert!(ledger.utxos_for(&addr(2)).await.unwrap().is_empty());
        ledger.advance(5);
        assert_eq!(ledger.chain_tip().await.unwrap().height, 105);
    }
}
