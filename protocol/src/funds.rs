//! # Funds & Broadcast Seams
//!
//! The two things the core needs from the outside world, as traits:
//!
//! - [`UtxoSource`] answers "which unspent outputs does this commitment
//!   hold, and where is the chain tip?"
//! - [`Broadcaster`] takes a signed proposal and reports acceptance.
//!
//! Wallet connectors, indexers and the node's in-memory ledger implement
//! them. Predicates never call either; only builders and submitters do.
//!
//! Two proposals racing for the same UTXO is normal. Only one can confirm;
//! the loser gets [`FundsError::InputSpent`], which is retryable: re-fetch
//! and rebuild.

use async_trait::async_trait;
use thiserror::Error;

use crate::transaction::{ChainTip, TransactionProposal};
use crate::value::{LockingCommitment, OutPoint, Utxo};

/// Errors surfaced by funds queries and broadcasts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FundsError {
    /// Another transaction consumed this input first.
    #[error("input {outpoint} already spent")]
    InputSpent { outpoint: OutPoint },

    /// The outpoint is unknown to the ledger.
    #[error("outpoint {outpoint} not found")]
    NotFound { outpoint: OutPoint },

    /// The ledger refused the transaction for a non-race reason.
    #[error("transaction rejected: {reason}")]
    Rejected { reason: String },

    /// The backend could not be reached.
    #[error("funds backend unavailable: {reason}")]
    Unavailable { reason: String },
}

impl FundsError {
    /// `true` for failures a builder should answer by re-fetching and
    /// rebuilding.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FundsError::InputSpent { .. } | FundsError::Unavailable { .. }
        )
    }
}

/// Funds/UTXO set query.
#[async_trait]
pub trait UtxoSource: Send + Sync {
    /// Unspent outputs locked by `commitment`.
    async fn utxos_for(&self, commitment: &LockingCommitment) -> Result<Vec<Utxo>, FundsError>;

    /// Current chain tip.
    async fn chain_tip(&self) -> Result<ChainTip, FundsError>;
}

/// Broadcast/submit primitive.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Submit a signed proposal. Returns its transaction id.
    async fn submit(&self, proposal: &TransactionProposal) -> Result<[u8; 32], FundsError>;
}

/// Pick the single largest UTXO worth at least `target`.
///
/// Vault spends consume exactly one vault UTXO, so there is no coin
/// selection beyond this.
pub fn select_single(utxos: &[Utxo], target: u64) -> Option<&Utxo> {
    utxos
        .iter()
        .filter(|u| u.value() >= target)
        .max_by_key(|u| u.value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::TxOutput;
    use std::sync::Mutex;

    fn utxo(tag: u8, value: u64) -> Utxo {
        Utxo::new(
            OutPoint::new([tag; 32], 0),
            TxOutput::new(value, LockingCommitment::vault(&[0; 32])),
        )
    }

    #[test]
    fn only_races_and_outages_are_retryable() {
        let op = OutPoint::new([1; 32], 0);
        assert!(FundsError::InputSpent { outpoint: op }.is_retryable());
        assert!(FundsError::Unavailable {
            reason: "timeout".into()
        }
        .is_retryable());
        assert!(!FundsError::NotFound { outpoint: op }.is_retryable());
        assert!(!FundsError::Rejected {
            reason: "policy".into()
        }
        .is_retryable());
    }

    #[test]
    fn select_single_prefers_largest_sufficient() {
        let set = vec![utxo(1, 500), utxo(2, 5_000), utxo(3, 2_000)];
        assert_eq!(select_single(&set, 1_000).map(|u| u.value()), Some(5_000));
        assert!(select_single(&set, 10_000).is_none());
    }

    struct Fixed(Vec<Utxo>, Mutex<Vec<[u8; 32]>>);

    #[async_trait]
    impl UtxoSource for Fixed {
        async fn utxos_for(&self, _c: &LockingCommitment) -> Result<Vec<Utxo>, FundsError> {
            Ok(self.0.clone())
        }

        async fn chain_tip(&self) -> Result<ChainTip, FundsError> {
            Ok(ChainTip::at_height(42))
        }
    }

    #[async_trait]
    impl Broadcaster for Fixed {
        async fn submit(&self, proposal: &TransactionProposal) -> Result<[u8; 32], FundsError> {
            let id = proposal.txid();
            self.1.lock().unwrap().push(id);
            Ok(id)
        }
    }

    #[tokio::test]
    async fn traits_are_object_safe() {
        let backend = Fixed(vec![utxo(1, 10)], Mutex::new(Vec::new()));
        let source: &dyn UtxoSource = &backend;
        assert_eq!(source.chain_tip().await.unwrap().height, 42);
        assert_eq!(
            source
                .utxos_for(&LockingCommitment::vault(&[0; 32]))
                .await
                .unwrap()
                .len(),
            1
        );

        let broadcaster: &dyn Broadcaster = &backend;
        let p = TransactionProposal::new(vec![], vec![], 0);
        let id = broadcaster.submit(&p).await.unwrap();
        assert_eq!(backend.1.lock().unwrap().as_slice(), &[id]);
    }
}
