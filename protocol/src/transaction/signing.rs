//! Wallet-side signing helpers.
//!
//! Predicates never sign; these exist for the wallet layer and for tests.
//! Signing is a separate step from building because the keys may not be at
//! hand when the proposal is built (hardware wallet, remote co-signer), and
//! because a signature commits to the final output layout.

use thiserror::Error;
use tracing::debug;

use super::types::{TransactionProposal, Unlocking};
use super::witness::SignerProof;
use crate::crypto::VaultKeypair;
use crate::policy::SignerSlot;

/// Errors that can occur while filling in a signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    #[error("input index {index} out of bounds ({count} inputs)")]
    InputIndexOutOfBounds { index: usize, count: usize },

    #[error("input {index} carries no vault witness")]
    NotAVaultInput { index: usize },

    #[error("key does not match the commitment of input {index}")]
    KeyMismatch { index: usize },
}

/// Fill `slot` of the vault witness on `input_index`.
///
/// Slots may be filled in any order: the digest excludes every signature.
pub fn sign_vault_input(
    proposal: &mut TransactionProposal,
    input_index: usize,
    slot: SignerSlot,
    keypair: &VaultKeypair,
) -> Result<(), SigningError> {
    let count = proposal.inputs.len();
    let digest = proposal
        .signing_digest(input_index)
        .ok_or(SigningError::InputIndexOutOfBounds {
            index: input_index,
            count,
        })?;
    let witness = proposal.inputs[input_index]
        .unlocking
        .witness_mut()
        .ok_or(SigningError::NotAVaultInput { index: input_index })?;

    witness.signers[slot.index()] = Some(SignerProof {
        public_key: keypair.public_key(),
        signature: keypair.sign(&digest),
    });
    debug!(input_index, %slot, "vault input signed");
    Ok(())
}

/// Unlock a P2PKH input with `keypair`.
pub fn sign_p2pkh_input(
    proposal: &mut TransactionProposal,
    input_index: usize,
    keypair: &VaultKeypair,
) -> Result<(), SigningError> {
    let count = proposal.inputs.len();
    let digest = proposal
        .signing_digest(input_index)
        .ok_or(SigningError::InputIndexOutOfBounds {
            index: input_index,
            count,
        })?;
    let input = &mut proposal.inputs[input_index];
    if !input.utxo.commitment().pays_to(&keypair.pubkey_hash()) {
        return Err(SigningError::KeyMismatch { index: input_index });
    }
    input.unlocking = Unlocking::P2pkh {
        public_key: keypair.public_key(),
        signature: keypair.sign(&digest),
    };
    debug!(input_index, "p2pkh input signed");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
