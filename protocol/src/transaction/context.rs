//! Per-input evaluation context.
//!
//! A [`TransactionContext`] is the read-only view a predicate evaluates:
//! the proposal, the index of the input being unlocked, and the chain tip.
//! It is what a script VM exposes through introspection opcodes, and
//! nothing more. Predicates never see the ledger.

use serde::{Deserialize, Serialize};

use super::types::{TransactionProposal, TxInput};
use super::witness::AuthorizationWitness;
use crate::policy::PolicyError;
use crate::value::{LockingCommitment, TokenData, TxOutput};

/// The chain state a proposal is evaluated against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTip {
    /// Height of the current tip block.
    pub height: u32,
    /// Median-time-past of the tip, in unix seconds.
    #[serde(default)]
    pub median_time: u32,
}

impl ChainTip {
    pub const fn at_height(height: u32) -> Self {
        Self {
            height,
            median_time: 0,
        }
    }
}

/// Introspection view over one input of a proposal.
#[derive(Debug, Clone, Copy)]
pub struct TransactionContext<'a> {
    proposal: &'a TransactionProposal,
    input_index: usize,
    tip: ChainTip,
}

impl<'a> TransactionContext<'a> {
    /// Build a context for `input_index`. Fails when the index does not
    /// name an input of the proposal.
    pub fn new(
        proposal: &'a TransactionProposal,
        input_index: usize,
        tip: ChainTip,
    ) -> Result<Self, PolicyError> {
        if input_index >= proposal.inputs.len() {
            return Err(PolicyError::InputIndexOutOfBounds {
                index: input_index,
                count: proposal.inputs.len(),
            });
        }
        Ok(Self {
            proposal,
            input_index,
            tip,
        })
    }

    pub fn proposal(&self) -> &'a TransactionProposal {
        self.proposal
    }

    pub fn input_index(&self) -> usize {
        self.input_index
    }

    pub fn chain_tip(&self) -> ChainTip {
        self.tip
    }

    pub fn chain_height(&self) -> u32 {
        self.tip.height
    }

    pub fn locktime(&self) -> u32 {
        self.proposal.locktime
    }

    pub fn input_count(&self) -> usize {
        self.proposal.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.proposal.outputs.len()
    }

    /// The input being unlocked.
    pub fn active_input(&self) -> &'a TxInput {
        &self.proposal.inputs[self.input_index]
    }

    pub fn active_value(&self) -> u64 {
        self.active_input().value()
    }

    pub fn active_commitment(&self) -> &'a LockingCommitment {
        self.active_input().utxo.commitment()
    }

    pub fn active_token(&self) -> Option<&'a TokenData> {
        self.active_input().utxo.token()
    }

    pub fn input(&self, index: usize) -> Option<&'a TxInput> {
        self.proposal.inputs.get(index)
    }

    pub fn output(&self, index: usize) -> Option<&'a TxOutput> {
        self.proposal.outputs.get(index)
    }

    pub fn outputs(&self) -> &'a [TxOutput] {
        &self.proposal.outputs
    }

    /// The signing digest for the active input.
    pub fn digest(&self) -> [u8; 32] {
        // Index validated in `new`.
        self.proposal
            .signing_digest(self.input_index)
            .unwrap_or_default()
    }

    /// The vault witness attached to the active input.
    pub fn witness(&self) -> Result<&'a AuthorizationWitness, PolicyError> {
        self.active_input()
            .unlocking
            .witness()
            .ok_or(PolicyError::MissingWitnessField { field: "witness" })
    }
}
