//! Fee-converging transaction builder.
//!
//! The builder turns a [`SpendDraft`] (inputs, planned outputs with their
//! predicate floors, locktime, and the signatures still to come) into an
//! unsigned [`TransactionProposal`] whose implied fee covers
//! `fee_rate × encoded size`.
//!
//! Size depends on the outputs, and the outputs depend on the fee, so the
//! builder iterates:
//!
//! 1. Assemble the proposal and fill every pending signature with a
//!    same-sized placeholder.
//! 2. Measure the encoded size and derive the target fee.
//! 3. If the implied fee already covers it, stop.
//! 4. Otherwise take the shortfall out of the last output. Removable change
//!    that would end at or below dust is dropped instead. An output is never
//!    pushed below its floor.
//!
//! The loop runs at most `max_iterations` passes and reports
//! [`BuildError::FeeDidNotConverge`] rather than guessing.
//!
//! The builder does not sign. Signing happens in [`super::signing`] once the
//! layout is final, because every signature commits to every output.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::types::{TransactionProposal, TxInput, Unlocking};
use super::witness::SignerProof;
use crate::config::{BuilderParams, DUST_THRESHOLD, SIGNATURE_LENGTH};
use crate::crypto::{VaultPublicKey, VaultSignature};
use crate::policy::SignerSlot;
use crate::value::{self, TxOutput};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur while building a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("draft has no inputs")]
    NoInputs,

    #[error("draft has no outputs")]
    NoOutputs,

    /// Planned outputs already exceed the inputs before any fee.
    #[error("insufficient funds: {available} available, {required} required")]
    InsufficientFunds { available: u64, required: u64 },

    /// The fee would push an output below its predicate floor.
    #[error("fee shortfall {shortfall} would push output {index} ({value}) below its floor {floor}")]
    FeeExceedsAllowance {
        index: usize,
        value: u64,
        floor: u64,
        shortfall: u64,
    },

    #[error("fee estimation did not converge after {iterations} passes")]
    FeeDidNotConverge { iterations: usize },

    /// The requested function cannot be built for this vault.
    #[error("invalid build request: {reason}")]
    InvalidRequest { reason: String },
}

// ---------------------------------------------------------------------------
// Draft
// ---------------------------------------------------------------------------

/// An output the builder may adjust within its floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedOutput {
    pub output: TxOutput,
    /// Lowest value the predicate accepts for this output.
    pub floor: u64,
    /// Change that may be dropped entirely when it falls to dust.
    pub removable: bool,
}

impl PlannedOutput {
    /// An output the builder must not touch.
    pub fn fixed(output: TxOutput) -> Self {
        Self {
            floor: output.value,
            output,
            removable: false,
        }
    }

    /// An output the builder may reduce down to `floor`.
    pub fn adjustable(output: TxOutput, floor: u64) -> Self {
        Self {
            output,
            floor,
            removable: false,
        }
    }

    /// Change back to the funder; dropped when it would be dust.
    pub fn change(output: TxOutput) -> Self {
        Self {
            output,
            floor: 0,
            removable: true,
        }
    }
}

/// A signature the wallet layer still has to provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSignature {
    pub input: usize,
    /// Vault signer slot, or `None` for a P2PKH input.
    pub slot: Option<SignerSlot>,
}

/// Everything the builder needs to produce a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendDraft {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<PlannedOutput>,
    pub locktime: u32,
    pub signatures: Vec<PendingSignature>,
}

/// A converged, unsigned proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltTransaction {
    pub proposal: TransactionProposal,
    /// Implied fee of the proposal.
    pub fee: u64,
    /// Encoded size once every pending signature is present.
    pub size: usize,
    /// Passes the fee loop took.
    pub iterations: usize,
    /// Signatures still to be filled in before submission.
    pub signatures: Vec<PendingSignature>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

fn placeholder_proof() -> SignerProof {
    SignerProof {
        public_key: VaultPublicKey::from_bytes([0u8; 32]),
        signature: VaultSignature::from_bytes([0u8; SIGNATURE_LENGTH]),
    }
}

/// Encoded size of `proposal` once every pending signature is filled in.
pub fn signed_size(proposal: &TransactionProposal, pending: &[PendingSignature]) -> usize {
    let mut sized = proposal.clone();
    for sig in pending {
        let Some(input) = sized.inputs.get_mut(sig.input) else {
            continue;
        };
        match sig.slot {
            Some(slot) => {
                if let Some(w) = input.unlocking.witness_mut() {
                    w.signers[slot.index()] = Some(placeholder_proof());
                }
            }
            None => {
                let p = placeholder_proof();
                input.unlocking = Unlocking::P2pkh {
                    public_key: p.public_key,
                    signature: p.signature,
                };
            }
        }
    }
    sized.encoded_len()
}

/// Run the fee loop over `draft`.
pub fn build_transaction(
    draft: &SpendDraft,
    params: &BuilderParams,
) -> Result<BuiltTransaction, BuildError> {
    if draft.inputs.is_empty() {
        return Err(BuildError::NoInputs);
    }
    if draft.outputs.is_empty() {
        return Err(BuildError::NoOutputs);
    }

    let input_total = value::total(&draft.inputs.iter().map(TxInput::value).collect::<Vec<_>>());
    let mut planned = draft.outputs.clone();

    for iteration in 1..=params.max_iterations {
        let output_total = value::total(
            &planned
                .iter()
                .map(|p| p.output.value)
                .collect::<Vec<_>>(),
        );
        let Some(implied) = input_total.checked_sub(output_total) else {
            return Err(BuildError::InsufficientFunds {
                available: u64::try_from(input_total).unwrap_or(u64::MAX),
                required: u64::try_from(output_total).unwrap_or(u64::MAX),
            });
        };

        let proposal = TransactionProposal::new(
            draft.inputs.clone(),
            planned.iter().map(|p| p.output.clone()).collect(),
            draft.locktime,
        );
        let size = signed_size(&proposal, &draft.signatures);
        let target = (size as u128) * (params.fee_rate as u128);
        debug!(iteration, size, target, implied, "fee pass");

        if implied >= target {
            let fee = u64::try_from(implied).unwrap_or(u64::MAX);
            info!(iteration, size, fee, outputs = planned.len(), "transaction built");
            return Ok(BuiltTransaction {
                proposal,
                fee,
                size,
                iterations: iteration,
                signatures: draft.signatures.clone(),
            });
        }

        // target > implied, and target fits easily in u64 for any sane rate
        let shortfall = u64::try_from(target - implied).unwrap_or(u64::MAX);
        let index = planned.len() - 1;
        let last = &mut planned[index];

        if last.removable && last.output.value.saturating_sub(shortfall) <= DUST_THRESHOLD {
            debug!(index, value = last.output.value, "folding dust change into fee");
            planned.pop();
            if planned.is_empty() {
                return Err(BuildError::NoOutputs);
            }
            continue;
        }

        let reduced = last.output.value.checked_sub(shortfall);
        match reduced {
            Some(v) if v >= last.floor => last.output.value = v,
            _ => {
                return Err(BuildError::FeeExceedsAllowance {
                    index,
                    value: last.output.value,
                    floor: last.floor,
                    shortfall,
                })
            }
        }
    }

    Err(BuildError::FeeDidNotConverge {
        iterations: params.max_iterations,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
