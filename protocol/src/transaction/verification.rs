//! Proposal verification: structural checks and P2PKH inputs.
//!
//! Vault inputs are checked by their predicates in `vaultline-contracts`.
//! Everything here is policy-independent and runs first, cheapest checks
//! before signature verification.

use std::collections::HashSet;

use tracing::debug;

use super::types::{TransactionProposal, Unlocking};
use crate::crypto::verify;
use crate::policy::PolicyError;
use crate::value;

/// Structural validity of a proposal.
///
/// The checks, in order:
///
/// 1. **Inputs** — at least one.
/// 2. **Outputs** — at least one.
/// 3. **Outpoints** — no outpoint spent twice.
/// 4. **Output values** — all nonzero.
/// 5. **Conservation** — `sum(inputs) >= sum(outputs)`; the difference is
///    the fee.
pub fn verify_structure(tx: &TransactionProposal) -> Result<(), PolicyError> {
    if tx.inputs.is_empty() {
        return Err(PolicyError::NoInputs);
    }
    if tx.outputs.is_empty() {
        return Err(PolicyError::NoOutputs);
    }

    let mut seen = HashSet::with_capacity(tx.inputs.len());
    for (index, input) in tx.inputs.iter().enumerate() {
        if !seen.insert(input.utxo.outpoint) {
            return Err(PolicyError::DuplicateInput { index });
        }
    }

    if let Some(index) = tx.outputs.iter().position(|o| o.value == 0) {
        return Err(PolicyError::ZeroValueOutput { index });
    }

    let inputs = value::total(&tx.input_values());
    let outputs = value::total(&tx.output_values());
    if inputs < outputs {
        return Err(PolicyError::ConservationViolated { inputs, outputs });
    }
    debug!(fee = (inputs - outputs) as u64, "structure ok");
    Ok(())
}

/// A P2PKH input must reveal a key hashing to its commitment and sign the
/// input's digest.
pub fn verify_p2pkh_input(tx: &TransactionProposal, index: usize) -> Result<(), PolicyError> {
    let input = tx
        .inputs
        .get(index)
        .ok_or(PolicyError::InputIndexOutOfBounds {
            index,
            count: tx.inputs.len(),
        })?;
    let expected = input
        .utxo
        .commitment()
        .p2pkh_hash()
        .ok_or(PolicyError::UnauthorizedInput { index })?;
    let Unlocking::P2pkh {
        public_key,
        signature,
    } = &input.unlocking
    else {
        return Err(PolicyError::UnauthorizedInput { index });
    };
    if public_key.pubkey_hash() != expected {
        return Err(PolicyError::UnauthorizedInput { index });
    }
    let digest = tx
        .signing_digest(index)
        .ok_or(PolicyError::UnauthorizedInput { index })?;
    if !verify(public_key, &digest, signature) {
        return Err(PolicyError::UnauthorizedInput { index });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::VaultKeypair;
    use crate::transaction::{sign_p2pkh_input, TxInput};
    use crate::value::{LockingCommitment, OutPoint, TxOutput, Utxo};

    fn funded(kp: &VaultKeypair, values: &[u64], outputs: &[u64]) -> TransactionProposal {
        let commitment = LockingCommitment::p2pkh(&kp.pubkey_hash());
        TransactionProposal::new(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    TxInput::new(Utxo::new(
                        OutPoint::new([i as u8; 32], 0),
                        TxOutput::new(*v, commitment.clone()),
                    ))
                })
                .collect(),
            outputs
                .iter()
                .map(|v| TxOutput::new(*v, commitment.clone()))
                .collect(),
            0,
        )
    }

    #[test]
    fn balanced_proposal_passes() {
        let kp = VaultKeypair::generate();
        assert!(verify_structure(&funded(&kp, &[1_000, 2_000], &[2_900])).is_ok());
    }

    #[test]
    fn inflation_is_rejected() {
        let kp = VaultKeypair::generate();
        assert_eq!(
            verify_structure(&funded(&kp, &[1_000], &[1_001])),
            Err(PolicyError::ConservationViolated {
                inputs: 1_000,
                outputs: 1_001
            })
        );
    }

    #[test]
    fn duplicate_outpoint_is_rejected() {
        let kp = VaultKeypair::generate();
        let mut p = funded(&kp, &[1_000, 1_000], &[1_500]);
        p.inputs[1].utxo.outpoint = p.inputs[0].utxo.outpoint;
        assert_eq!(verify_structure(&p), Err(PolicyError::DuplicateInput { index: 1 }));
    }

    #[test]
    fn zero_value_output_is_rejected() {
        let kp = VaultKeypair::generate();
        assert_eq!(
            verify_structure(&funded(&kp, &[1_000], &[500, 0])),
            Err(PolicyError::ZeroValueOutput { index: 1 })
        );
    }

    #[test]
    fn empty_sides_are_rejected() {
        let kp = VaultKeypair::generate();
        assert_eq!(verify_structure(&funded(&kp, &[], &[1])), Err(PolicyError::NoInputs));
        assert_eq!(verify_structure(&funded(&kp, &[1], &[])), Err(PolicyError::NoOutputs));
    }

    #[test]
    fn p2pkh_signature_roundtrip() {
        let kp = VaultKeypair::generate();
        let mut p = funded(&kp, &[1_000], &[900]);
        assert_eq!(
            verify_p2pkh_input(&p, 0),
            Err(PolicyError::UnauthorizedInput { index: 0 })
        );
        sign_p2pkh_input(&mut p, 0, &kp).unwrap();
        assert!(verify_p2pkh_input(&p, 0).is_ok());

        p.outputs[0].value = 899;
        assert_eq!(
            verify_p2pkh_input(&p, 0),
            Err(PolicyError::UnauthorizedInput { index: 0 })
        );
    }
}
