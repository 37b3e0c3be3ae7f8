//! # Vault Definitions
//!
//! A [`Vault`] is a policy kind plus an immutable [`VaultConfig`]. The
//! config is hashed into the vault's locking commitment, so a vault never
//! changes: a "config change" is a new vault with a new commitment.
//!
//! Fields that are stateful in spirit (the next recurring due height, a
//! lowered cap) are refreshed by an external tracker that records a
//! successor vault. [`Vault::successor_after_payment`] and
//! [`Vault::apply_update`] compute those successors.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use vaultline_protocol::config::{
    LOCKTIME_THRESHOLD, MAX_MONEY, MAX_SIGNER_SLOTS, VAULT_TEMPLATE_TAG,
};
use vaultline_protocol::crypto::{tagged_hash, PubkeyHash};
use vaultline_protocol::policy::{PolicyError, TokenGate, TokenRequirement};
use vaultline_protocol::transaction::ConfigUpdate;
use vaultline_protocol::value::LockingCommitment;

use crate::function::SpendFunction;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised when a vault definition is inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// Signer slot 1 is disabled but the kind needs an owner.
    #[error("{kind} vault requires an owner in signer slot 1")]
    MissingOwner { kind: VaultKind },

    #[error("threshold {threshold} out of range for {enabled} enabled signers")]
    ThresholdOutOfRange { threshold: u8, enabled: usize },

    #[error("{kind} vault requires {field}")]
    MissingField {
        kind: VaultKind,
        field: &'static str,
    },

    #[error("{field} value {value} out of range")]
    OutOfRange { field: &'static str, value: u64 },

    #[error("invalid vault definition: {reason}")]
    InvalidDefinition { reason: String },

    /// The successor cannot be derived for this vault.
    #[error("no successor: {reason}")]
    NoSuccessor { reason: String },
}

impl From<VaultError> for PolicyError {
    fn from(e: VaultError) -> Self {
        PolicyError::InvalidConfigUpdate {
            reason: e.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The eight vault policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultKind {
    Basic,
    Multisig,
    TimeLock,
    SpendingCap,
    Recurring,
    TokenGated,
    Whitelist,
    /// Every feature combined.
    Master,
}

impl VaultKind {
    pub const ALL: [VaultKind; 8] = [
        VaultKind::Basic,
        VaultKind::Multisig,
        VaultKind::TimeLock,
        VaultKind::SpendingCap,
        VaultKind::Recurring,
        VaultKind::TokenGated,
        VaultKind::Whitelist,
        VaultKind::Master,
    ];

    fn tag(self) -> u8 {
        match self {
            VaultKind::Basic => 0,
            VaultKind::Multisig => 1,
            VaultKind::TimeLock => 2,
            VaultKind::SpendingCap => 3,
            VaultKind::Recurring => 4,
            VaultKind::TokenGated => 5,
            VaultKind::Whitelist => 6,
            VaultKind::Master => 7,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VaultKind::Basic => "basic",
            VaultKind::Multisig => "multisig",
            VaultKind::TimeLock => "time_lock",
            VaultKind::SpendingCap => "spending_cap",
            VaultKind::Recurring => "recurring",
            VaultKind::TokenGated => "token_gated",
            VaultKind::Whitelist => "whitelist",
            VaultKind::Master => "master",
        }
    }
}

impl fmt::Display for VaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fixed-amount payment to a payee, due from a block height on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringPayment {
    pub payee: PubkeyHash,
    pub amount: u64,
    /// First height at which the payment may be executed.
    pub next_due: u32,
    /// Blocks between payments. Used only to derive the successor vault.
    #[serde(default)]
    pub interval_blocks: u32,
}

/// Immutable vault parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Signer slot hashes; all-zero disables a slot. Slot 1 is the owner.
    #[serde(default)]
    pub signers: [PubkeyHash; MAX_SIGNER_SLOTS],
    #[serde(default)]
    pub threshold: u8,
    /// Block height before which time-gated functions reject. Zero: none.
    #[serde(default)]
    pub unlock_height: u32,
    /// Flat per-spend ceiling. Zero: none.
    #[serde(default)]
    pub spend_cap: u64,
    #[serde(default)]
    pub recurring: Option<RecurringPayment>,
    #[serde(default)]
    pub token: Option<TokenRequirement>,
    /// The one recipient key hash whitelisted spends may pay.
    #[serde(default)]
    pub whitelist: Option<PubkeyHash>,
}

impl VaultConfig {
    /// Single owner in slot 1, threshold 1.
    pub fn single_owner(owner: PubkeyHash) -> Self {
        Self {
            signers: [owner, PubkeyHash::ZERO, PubkeyHash::ZERO],
            threshold: 1,
            ..Self::default()
        }
    }

    pub fn multisig(signers: [PubkeyHash; MAX_SIGNER_SLOTS], threshold: u8) -> Self {
        Self {
            signers,
            threshold,
            ..Self::default()
        }
    }

    pub fn with_unlock_height(mut self, height: u32) -> Self {
        self.unlock_height = height;
        self
    }

    pub fn with_spend_cap(mut self, cap: u64) -> Self {
        self.spend_cap = cap;
        self
    }

    pub fn with_recurring(mut self, recurring: RecurringPayment) -> Self {
        self.recurring = Some(recurring);
        self
    }

    pub fn with_token(mut self, token: TokenRequirement) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_whitelist(mut self, recipient: PubkeyHash) -> Self {
        self.whitelist = Some(recipient);
        self
    }

    /// The primary owner (slot 1).
    pub fn owner(&self) -> &PubkeyHash {
        &self.signers[0]
    }

    pub fn enabled_signers(&self) -> usize {
        self.signers.iter().filter(|h| !h.is_zero()).count()
    }

    fn check_threshold(&self, threshold: u8) -> Result<(), VaultError> {
        let enabled = self.enabled_signers();
        if threshold == 0 || threshold as usize > enabled {
            return Err(VaultError::ThresholdOutOfRange { threshold, enabled });
        }
        Ok(())
    }
}

/// A vault: policy kind plus immutable parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    pub kind: VaultKind,
    pub config: VaultConfig,
}

impl Vault {
    /// Validate and wrap a definition.
    pub fn new(kind: VaultKind, config: VaultConfig) -> Result<Self, VaultError> {
        let vault = Self { kind, config };
        vault.validate()?;
        Ok(vault)
    }

    /// Parse a JSON definition and validate it.
    pub fn from_json(json: &str) -> Result<Self, VaultError> {
        let vault: Vault = serde_json::from_str(json).map_err(|e| VaultError::InvalidDefinition {
            reason: e.to_string(),
        })?;
        vault.validate()?;
        Ok(vault)
    }

    /// Consistency rules per kind.
    pub fn validate(&self) -> Result<(), VaultError> {
        let c = &self.config;
        let kind = self.kind;
        let needs_owner = !matches!(kind, VaultKind::Multisig);
        if needs_owner && c.owner().is_zero() {
            return Err(VaultError::MissingOwner { kind });
        }
        if matches!(kind, VaultKind::Multisig | VaultKind::Master) {
            c.check_threshold(c.threshold)?;
        }
        if c.spend_cap > MAX_MONEY {
            return Err(VaultError::OutOfRange {
                field: "spend_cap",
                value: c.spend_cap,
            });
        }
        if let Some(r) = &c.recurring {
            if r.amount == 0 || r.amount > MAX_MONEY {
                return Err(VaultError::OutOfRange {
                    field: "recurring.amount",
                    value: r.amount,
                });
            }
            if r.payee.is_zero() {
                return Err(VaultError::MissingField {
                    kind,
                    field: "recurring.payee",
                });
            }
        }
        if let Some(TokenRequirement {
            gate: TokenGate::MinFungible { amount: 0 },
            ..
        }) = &c.token
        {
            return Err(VaultError::OutOfRange {
                field: "token.amount",
                value: 0,
            });
        }
        if c.whitelist.is_some_and(|w| w.is_zero()) {
            return Err(VaultError::MissingField {
                kind,
                field: "whitelist",
            });
        }

        match kind {
            VaultKind::TimeLock if c.unlock_height == 0 => Err(VaultError::MissingField {
                kind,
                field: "unlock_height",
            }),
            VaultKind::SpendingCap if c.spend_cap == 0 => Err(VaultError::MissingField {
                kind,
                field: "spend_cap",
            }),
            VaultKind::Recurring if c.recurring.is_none() => Err(VaultError::MissingField {
                kind,
                field: "recurring",
            }),
            VaultKind::TokenGated if c.token.is_none() => Err(VaultError::MissingField {
                kind,
                field: "token",
            }),
            VaultKind::Whitelist if c.whitelist.is_none() => Err(VaultError::MissingField {
                kind,
                field: "whitelist",
            }),
            _ => Ok(()),
        }
    }

    /// Canonical template bytes the commitment is derived from.
    pub fn template_bytes(&self) -> Vec<u8> {
        let c = &self.config;
        let mut buf = Vec::with_capacity(160);
        buf.push(self.kind.tag());
        for h in &c.signers {
            buf.extend_from_slice(h.as_bytes());
        }
        buf.push(c.threshold);
        buf.extend_from_slice(&c.unlock_height.to_le_bytes());
        buf.extend_from_slice(&c.spend_cap.to_le_bytes());

        match &c.recurring {
            Some(r) => {
                buf.push(0x01);
                buf.extend_from_slice(r.payee.as_bytes());
                buf.extend_from_slice(&r.amount.to_le_bytes());
                buf.extend_from_slice(&r.next_due.to_le_bytes());
                buf.extend_from_slice(&r.interval_blocks.to_le_bytes());
            }
            None => buf.push(0x00),
        }
        match &c.token {
            Some(t) => {
                buf.push(0x01);
                buf.extend_from_slice(t.category.as_bytes());
                match t.gate {
                    TokenGate::Category => buf.push(0x00),
                    TokenGate::UniqueNft => buf.push(0x01),
                    TokenGate::MinFungible { amount } => {
                        buf.push(0x02);
                        buf.extend_from_slice(&amount.to_le_bytes());
                    }
                }
            }
            None => buf.push(0x00),
        }
        match &c.whitelist {
            Some(w) => {
                buf.push(0x01);
                buf.extend_from_slice(w.as_bytes());
            }
            None => buf.push(0x00),
        }
        buf
    }

    pub fn template_hash(&self) -> [u8; 32] {
        tagged_hash(VAULT_TEMPLATE_TAG, &self.template_bytes())
    }

    /// The locking commitment every UTXO of this vault carries.
    pub fn commitment(&self) -> LockingCommitment {
        LockingCommitment::vault(&self.template_hash())
    }

    /// The selector table of this vault's kind.
    pub fn functions(&self) -> &'static [SpendFunction] {
        SpendFunction::table(self.kind)
    }

    /// Resolve a selector. Out-of-range selectors reject.
    pub fn function(&self, selector: u8) -> Result<SpendFunction, PolicyError> {
        let table = self.functions();
        table
            .get(selector as usize)
            .copied()
            .ok_or(PolicyError::IllegalSelector {
                selector,
                count: table.len(),
            })
    }

    pub fn selector_of(&self, function: SpendFunction) -> Option<u8> {
        self.functions()
            .iter()
            .position(|f| *f == function)
            .map(|i| i as u8)
    }

    /// The vault a tracker records after a recurring payment: same terms,
    /// next due height advanced by the interval.
    pub fn successor_after_payment(&self) -> Result<Vault, VaultError> {
        let recurring = self.config.recurring.ok_or_else(|| VaultError::NoSuccessor {
            reason: "vault has no recurring payment".into(),
        })?;
        if recurring.interval_blocks == 0 {
            return Err(VaultError::NoSuccessor {
                reason: "recurring interval is zero".into(),
            });
        }
        let next_due = recurring
            .next_due
            .checked_add(recurring.interval_blocks)
            .filter(|h| *h < LOCKTIME_THRESHOLD)
            .ok_or_else(|| VaultError::NoSuccessor {
                reason: "next due height overflows the height domain".into(),
            })?;

        let mut config = self.config.clone();
        config.recurring = Some(RecurringPayment {
            next_due,
            ..recurring
        });
        Vault::new(self.kind, config)
    }

    /// Range-check an update-configuration request against this vault.
    pub fn check_update(&self, update: &ConfigUpdate) -> Result<(), VaultError> {
        self.config.check_threshold(update.threshold)?;
        if update.spend_cap > MAX_MONEY {
            return Err(VaultError::OutOfRange {
                field: "spend_cap",
                value: update.spend_cap,
            });
        }
        if update.unlock_height >= LOCKTIME_THRESHOLD {
            return Err(VaultError::OutOfRange {
                field: "unlock_height",
                value: update.unlock_height as u64,
            });
        }
        Ok(())
    }

    /// The vault a tracker records after an update-configuration spend.
    pub fn apply_update(&self, update: &ConfigUpdate) -> Result<Vault, VaultError> {
        self.check_update(update)?;
        let mut config = self.config.clone();
        config.threshold = update.threshold;
        config.spend_cap = update.spend_cap;
        config.unlock_height = update.unlock_height;
        Vault::new(self.kind, config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
