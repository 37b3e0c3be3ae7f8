//! Vault registry: commitment → definition.
//!
//! A commitment is a hash, so a verifier needs the vault definition behind
//! it to pick a predicate. The registry is that lookup, plus the successor
//! bookkeeping for recurring payments and configuration updates.

use std::collections::HashMap;

use tracing::info;

use vaultline_protocol::value::LockingCommitment;

use crate::vault::{Vault, VaultError};

#[derive(Debug, Clone, Default)]
pub struct VaultRegistry {
    vaults: HashMap<LockingCommitment, Vault>,
}

impl VaultRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a vault. Returns its commitment.
    pub fn insert(&mut self, vault: Vault) -> LockingCommitment {
        let commitment = vault.commitment();
        info!(kind = %vault.kind, commitment = %commitment.to_hex(), "vault registered");
        self.vaults.insert(commitment.clone(), vault);
        commitment
    }

    /// Parse, validate and register a JSON definition.
    pub fn insert_json(&mut self, json: &str) -> Result<LockingCommitment, VaultError> {
        Ok(self.insert(Vault::from_json(json)?))
    }

    pub fn get(&self, commitment: &LockingCommitment) -> Option<&Vault> {
        self.vaults.get(commitment)
    }

    pub fn contains(&self, commitment: &LockingCommitment) -> bool {
        self.vaults.contains_key(commitment)
    }

    pub fn remove(&mut self, commitment: &LockingCommitment) -> Option<Vault> {
        self.vaults.remove(commitment)
    }

    pub fn len(&self) -> usize {
        self.vaults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vaults.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LockingCommitment, &Vault)> {
        self.vaults.iter()
    }

    /// Register `successor` alongside the vault it follows. The old entry
    /// stays: UTXOs already locked by it remain spendable under its terms.
    pub fn record_successor(
        &mut self,
        previous: &LockingCommitment,
        successor: Vault,
    ) -> Result<LockingCommitment, VaultError> {
        let prior = self.vaults.get(previous).ok_or_else(|| VaultError::NoSuccessor {
            reason: format!("unknown vault {}", previous.to_hex()),
        })?;
        if prior.kind != successor.kind {
            return Err(VaultError::NoSuccessor {
                reason: format!("successor kind {} differs from {}", successor.kind, prior.kind),
            });
        }
        successor.validate()?;
        Ok(self.insert(successor))
    }
}
