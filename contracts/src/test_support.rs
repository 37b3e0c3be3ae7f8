//! Fixtures shared by the predicate unit tests.

use vaultline_protocol::crypto::{PubkeyHash, VaultKeypair};
use vaultline_protocol::policy::{SignerSlot, TokenRequirement};
use vaultline_protocol::transaction::{
    sign_vault_input, AuthorizationWitness, ChainTip, TransactionContext, TransactionProposal,
    TxInput,
};
use vaultline_protocol::value::{LockingCommitment, OutPoint, TokenCategory, TxOutput, Utxo};

use crate::vault::{RecurringPayment, Vault, VaultConfig, VaultKind};

pub const HEIGHT: u32 = 850_000;

pub fn keys() -> [VaultKeypair; 3] {
    [
        VaultKeypair::from_seed(&[1; 32]),
        VaultKeypair::from_seed(&[2; 32]),
        VaultKeypair::from_seed(&[3; 32]),
    ]
}

pub fn payee() -> VaultKeypair {
    VaultKeypair::from_seed(&[9; 32])
}

pub fn dest() -> LockingCommitment {
    LockingCommitment::p2pkh(&PubkeyHash::from_bytes([0xde; 20]))
}

pub fn tip(height: u32) -> ChainTip {
    ChainTip::at_height(height)
}

pub fn basic_vault(owner: &VaultKeypair) -> Vault {
    Vault::new(VaultKind::Basic, VaultConfig::single_owner(owner.pubkey_hash()))
        .expect("basic vault")
}

pub fn master_vault(k: &[VaultKeypair; 3]) -> Vault {
    Vault::new(
        VaultKind::Master,
        VaultConfig::multisig(
            [k[0].pubkey_hash(), k[1].pubkey_hash(), k[2].pubkey_hash()],
            2,
        )
        .with_spend_cap(500_000)
        .with_recurring(RecurringPayment {
            payee: payee().pubkey_hash(),
            amount: 50_000,
            next_due: 800_000,
            interval_blocks: 4_320,
        })
        .with_token(TokenRequirement::category(TokenCategory::from_bytes([0x7e; 32])))
        .with_whitelist(PubkeyHash::from_bytes([0xde; 20])),
    )
    .expect("master vault")
}

pub fn vault_utxo(vault: &Vault, value: u64) -> Utxo {
    Utxo::new(
        OutPoint::new([0x11; 32], 0),
        TxOutput::new(value, vault.commitment()),
    )
}

/// A proposal spending one vault UTXO of `value` with `witness`.
pub fn spend(
    vault: &Vault,
    value: u64,
    witness: AuthorizationWitness,
    outputs: Vec<TxOutput>,
    locktime: u32,
) -> TransactionProposal {
    TransactionProposal::new(
        vec![TxInput::with_witness(vault_utxo(vault, value), witness)],
        outputs,
        locktime,
    )
}

/// Sign input 0 in each of the given slots.
pub fn sign(proposal: &mut TransactionProposal, slots: &[(SignerSlot, &VaultKeypair)]) {
    for (slot, kp) in slots {
        sign_vault_input(proposal, 0, *slot, kp).expect("sign vault input");
    }
}

pub fn context(proposal: &TransactionProposal, index: usize) -> TransactionContext<'_> {
    context_at(proposal, index, HEIGHT)
}

pub fn context_at(
    proposal: &TransactionProposal,
    index: usize,
    height: u32,
) -> TransactionContext<'_> {
    TransactionContext::new(proposal, index, tip(height)).expect("context")
}
