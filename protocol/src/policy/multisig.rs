//! Signer authorization.
//!
//! Three entry points over the same per-slot check:
//!
//! - [`check_multisig`]: the slots named by a mask, counted against a
//!   threshold.
//! - [`check_all_signers`]: every enabled slot, no threshold.
//! - [`check_single_signer`]: one configured hash, one witness slot.
//!
//! A slot is satisfied when the revealed key hashes to the configured hash
//! and its signature verifies over the signing digest. A set bit whose slot
//! carries a bad proof aborts the evaluation; it is not merely uncounted.

use tracing::debug;

use super::error::PolicyError;
use super::mask::{SignerMask, SignerSlot};
use crate::config::MAX_SIGNER_SLOTS;
use crate::crypto::{verify, PubkeyHash};
use crate::transaction::AuthorizationWitness;

/// Verify one slot's proof against its configured hash.
fn verify_slot(
    expected: &PubkeyHash,
    slot: SignerSlot,
    witness: &AuthorizationWitness,
    digest: &[u8; 32],
) -> Result<(), PolicyError> {
    let proof = witness
        .signer(slot.index())
        .ok_or(PolicyError::MissingSignature {
            slot: slot.number(),
        })?;
    if proof.public_key.pubkey_hash() != *expected {
        return Err(PolicyError::PubkeyMismatch {
            slot: slot.number(),
        });
    }
    if !verify(&proof.public_key, digest, &proof.signature) {
        return Err(PolicyError::InvalidSignature {
            slot: slot.number(),
        });
    }
    Ok(())
}

/// Threshold multisig over the slots named by `mask`.
///
/// Disabled slots (all-zero hash) named by the mask are skipped and do not
/// count. Returns the number of satisfied slots.
pub fn check_multisig(
    signer_hashes: &[PubkeyHash; MAX_SIGNER_SLOTS],
    threshold: u8,
    mask: SignerMask,
    witness: &AuthorizationWitness,
    digest: &[u8; 32],
) -> Result<usize, PolicyError> {
    let mut satisfied = 0usize;
    for slot in mask.slots() {
        let expected = &signer_hashes[slot.index()];
        if expected.is_zero() {
            debug!(%slot, "skipping disabled signer slot");
            continue;
        }
        verify_slot(expected, slot, witness, digest)?;
        satisfied += 1;
    }

    if satisfied < threshold as usize {
        return Err(PolicyError::InsufficientSigners {
            satisfied,
            threshold: threshold as usize,
        });
    }
    debug!(satisfied, threshold, "multisig satisfied");
    Ok(satisfied)
}

/// Every enabled slot must sign. Returns the number of enabled slots.
pub fn check_all_signers(
    signer_hashes: &[PubkeyHash; MAX_SIGNER_SLOTS],
    witness: &AuthorizationWitness,
    digest: &[u8; 32],
) -> Result<usize, PolicyError> {
    let mut enabled = 0usize;
    for slot in SignerSlot::ALL {
        let expected = &signer_hashes[slot.index()];
        if expected.is_zero() {
            continue;
        }
        verify_slot(expected, slot, witness, digest)?;
        enabled += 1;
    }
    if enabled == 0 {
        return Err(PolicyError::NoEnabledSigners);
    }
    Ok(enabled)
}

/// One configured signer, proving in `slot` of the witness.
pub fn check_single_signer(
    expected: &PubkeyHash,
    slot: SignerSlot,
    witness: &AuthorizationWitness,
    digest: &[u8; 32],
) -> Result<(), PolicyError> {
    if expected.is_zero() {
        return Err(PolicyError::NoEnabledSigners);
    }
    verify_slot(expected, slot, witness, digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::VaultKeypair;
    use crate::transaction::SignerProof;

    const DIGEST: [u8; 32] = [0x5a; 32];

    fn keys() -> [VaultKeypair; 3] {
        [
            VaultKeypair::from_seed(&[1; 32]),
            VaultKeypair::from_seed(&[2; 32]),
            VaultKeypair::from_seed(&[3; 32]),
        ]
    }

    fn hashes(keys: &[VaultKeypair; 3]) -> [PubkeyHash; 3] {
        [keys[0].pubkey_hash(), keys[1].pubkey_hash(), keys[2].pubkey_hash()]
    }

    fn signed(keys: &[VaultKeypair; 3], slots: &[usize]) -> AuthorizationWitness {
        let mut w = AuthorizationWitness::new(0);
        for &i in slots {
            w.signers[i] = Some(SignerProof {
                public_key: keys[i].public_key(),
                signature: keys[i].sign(&DIGEST),
            });
        }
        w
    }

    #[test]
    fn two_of_three_accepts() {
        let k = keys();
        let w = signed(&k, &[0, 2]);
        let mask = SignerMask::new(0b101).unwrap();
        assert_eq!(check_multisig(&hashes(&k), 2, mask, &w, &DIGEST), Ok(2));
    }

    #[test]
    fn below_threshold_rejects() {
        let k = keys();
        let w = signed(&k, &[1]);
        let mask = SignerMask::new(0b010).unwrap();
        assert_eq!(
            check_multisig(&hashes(&k), 2, mask, &w, &DIGEST),
            Err(PolicyError::InsufficientSigners {
                satisfied: 1,
                threshold: 2
            })
        );
    }

    #[test]
    fn set_bit_without_proof_aborts() {
        let k = keys();
        let w = signed(&k, &[0]);
        let mask = SignerMask::new(0b011).unwrap();
        assert_eq!(
            check_multisig(&hashes(&k), 1, mask, &w, &DIGEST),
            Err(PolicyError::MissingSignature { slot: 2 })
        );
    }

    #[test]
    fn swapped_keys_mismatch() {
        let k = keys();
        let mut w = signed(&k, &[0, 1]);
        w.signers.swap(0, 1);
        let mask = SignerMask::new(0b011).unwrap();
        assert_eq!(
            check_multisig(&hashes(&k), 2, mask, &w, &DIGEST),
            Err(PolicyError::PubkeyMismatch { slot: 1 })
        );
    }

    #[test]
    fn signature_over_other_digest_is_invalid() {
        let k = keys();
        let w = signed(&k, &[0]);
        let mask = SignerMask::new(0b001).unwrap();
        assert_eq!(
            check_multisig(&hashes(&k), 1, mask, &w, &[0u8; 32]),
            Err(PolicyError::InvalidSignature { slot: 1 })
        );
    }

    #[test]
    fn disabled_slot_is_skipped_not_counted() {
        let k = keys();
        let mut h = hashes(&k);
        h[2] = PubkeyHash::ZERO;
        let w = signed(&k, &[0]);
        let mask = SignerMask::new(0b101).unwrap();
        assert_eq!(check_multisig(&h, 1, mask, &w, &DIGEST), Ok(1));
        assert!(check_multisig(&h, 2, mask, &w, &DIGEST).is_err());
    }

    #[test]
    fn all_signers_requires_every_enabled_slot() {
        let k = keys();
        let h = hashes(&k);
        assert_eq!(
            check_all_signers(&h, &signed(&k, &[0, 1]), &DIGEST),
            Err(PolicyError::MissingSignature { slot: 3 })
        );
        assert_eq!(check_all_signers(&h, &signed(&k, &[0, 1, 2]), &DIGEST), Ok(3));
    }

    #[test]
    fn all_signers_with_nothing_enabled() {
        let k = keys();
        assert_eq!(
            check_all_signers(&[PubkeyHash::ZERO; 3], &signed(&k, &[0]), &DIGEST),
            Err(PolicyError::NoEnabledSigners)
        );
    }

    #[test]
    fn single_signer() {
        let k = keys();
        let w = signed(&k, &[0]);
        assert!(check_single_signer(&k[0].pubkey_hash(), SignerSlot::First, &w, &DIGEST).is_ok());
        assert_eq!(
            check_single_signer(&k[1].pubkey_hash(), SignerSlot::First, &w, &DIGEST),
            Err(PolicyError::PubkeyMismatch { slot: 1 })
        );
    }
}
