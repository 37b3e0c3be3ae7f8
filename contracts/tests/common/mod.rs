//! Shared fixtures for the contracts integration tests.

#![allow(dead_code)]

use vaultline_contracts::{RecurringPayment, Vault, VaultConfig, VaultKind};
use vaultline_protocol::crypto::{PubkeyHash, VaultKeypair};
use vaultline_protocol::policy::{SignerSlot, TokenRequirement};
use vaultline_protocol::transaction::{
    sign_vault_input, AuthorizationWitness, ChainTip, TransactionProposal, TxInput,
};
use vaultline_protocol::value::{LockingCommitment, OutPoint, TokenCategory, TxOutput, Utxo};

pub const HEIGHT: u32 = 850_000;
pub const CATEGORY: [u8; 32] = [0x7e; 32];

pub fn keys() -> [VaultKeypair; 3] {
    [
        VaultKeypair::from_seed(&[1; 32]),
        VaultKeypair::from_seed(&[2; 32]),
        VaultKeypair::from_seed(&[3; 32]),
    ]
}

pub fn hashes(k: &[VaultKeypair; 3]) -> [PubkeyHash; 3] {
    [k[0].pubkey_hash(), k[1].pubkey_hash(), k[2].pubkey_hash()]
}

pub fn payee() -> VaultKeypair {
    VaultKeypair::from_seed(&[9; 32])
}

pub fn dest() -> LockingCommitment {
    LockingCommitment::p2pkh(&PubkeyHash::from_bytes([0xde; 20]))
}

pub fn tip() -> ChainTip {
    ChainTip::at_height(HEIGHT)
}

pub fn vault(kind: VaultKind, config: VaultConfig) -> Vault {
    Vault::new(kind, config).expect("valid vault")
}

pub fn owner_config() -> VaultConfig {
    VaultConfig::single_owner(keys()[0].pubkey_hash())
}

pub fn master() -> Vault {
    let k = keys();
    vault(
        VaultKind::Master,
        VaultConfig::multisig(hashes(&k), 2)
            .with_spend_cap(500_000)
            .with_recurring(RecurringPayment {
                payee: payee().pubkey_hash(),
                amount: 50_000,
                next_due: 800_000,
                interval_blocks: 4_320,
            })
            .with_token(TokenRequirement::category(TokenCategory::from_bytes(CATEGORY)))
            .with_whitelist(PubkeyHash::from_bytes([0xde; 20])),
    )
}

pub fn vault_utxo(vault: &Vault, value: u64) -> Utxo {
    Utxo::new(
        OutPoint::new([0x11; 32], 0),
        TxOutput::new(value, vault.commitment()),
    )
}

pub fn p2pkh_utxo(owner: &VaultKeypair, tag: u8, value: u64) -> Utxo {
    Utxo::new(
        OutPoint::new([tag; 32], 0),
        TxOutput::new(value, LockingCommitment::p2pkh(&owner.pubkey_hash())),
    )
}

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

pub fn sign(proposal: &mut TransactionProposal, slots: &[(SignerSlot, &VaultKeypair)]) {
    for (slot, kp) in slots {
        sign_vault_input(proposal, 0, *slot, kp).expect("sign");
    }
}
