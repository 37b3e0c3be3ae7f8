//! Spending functions and selector tables.
//!
//! Each vault kind exposes a fixed, ordered list of functions. The selector
//! in a witness is an index into that list; anything past the end rejects.
//!
//! | Kind           | Selectors                                                   |
//! |----------------|-------------------------------------------------------------|
//! | `basic`        | 0 owner spend, 1 deposit                                    |
//! | `multisig`     | 0 standard spend, 1 emergency withdraw, 2 deposit           |
//! | `time_lock`    | 0 time-locked withdraw, 1 deposit                           |
//! | `spending_cap` | 0 capped spend, 1 deposit                                   |
//! | `recurring`    | 0 execute, 1 claim, 2 cancel, 3 deposit                     |
//! | `token_gated`  | 0 token-gated spend, 1 deposit                              |
//! | `whitelist`    | 0 whitelisted spend, 1 deposit                              |
//! | `master`       | 0 standard, 1 token-gated, 2 execute, 3 claim, 4 deposit,   |
//! |                | 5 emergency withdraw, 6 update config, 7 whitelisted spend  |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use vaultline_protocol::policy::{FeeAllowance, PolicyError, SignerMask};
use vaultline_protocol::transaction::{AuthorizationWitness, ConfigUpdate};
use vaultline_protocol::value::LockingCommitment;

use crate::vault::VaultKind;

/// One entry point of a vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendFunction {
    /// Owner signs; covenant continuity.
    OwnerSpend,
    /// Signer mask + time-gate + cap; covenant continuity.
    StandardSpend,
    /// Owner signs after the unlock height.
    TimeLockedWithdraw,
    /// Owner signs for at most the cap.
    CappedSpend,
    /// Owner signs and holds the access token.
    TokenGatedSpend,
    /// Owner signs; destination must be the whitelisted recipient.
    WhitelistedSpend,
    /// Anyone may trigger the due payment.
    ExecuteRecurring,
    /// The payee pulls the due payment.
    ClaimRecurring,
    /// Owner drains the schedule.
    CancelRecurring,
    /// Anyone may add value.
    Deposit,
    /// Every enabled signer; unrestricted destination.
    EmergencyWithdraw,
    /// Owner changes threshold, cap and unlock height.
    UpdateConfig,
}

use SpendFunction::*;

const BASIC: &[SpendFunction] = &[OwnerSpend, Deposit];
const MULTISIG: &[SpendFunction] = &[StandardSpend, EmergencyWithdraw, Deposit];
const TIME_LOCK: &[SpendFunction] = &[TimeLockedWithdraw, Deposit];
const SPENDING_CAP: &[SpendFunction] = &[CappedSpend, Deposit];
const RECURRING: &[SpendFunction] = &[ExecuteRecurring, ClaimRecurring, CancelRecurring, Deposit];
const TOKEN_GATED: &[SpendFunction] = &[TokenGatedSpend, Deposit];
const WHITELIST: &[SpendFunction] = &[WhitelistedSpend, Deposit];
const MASTER: &[SpendFunction] = &[
    StandardSpend,
    TokenGatedSpend,
    ExecuteRecurring,
    ClaimRecurring,
    Deposit,
    EmergencyWithdraw,
    UpdateConfig,
    WhitelistedSpend,
];

impl SpendFunction {
    pub const ALL: [SpendFunction; 12] = [
        OwnerSpend,
        StandardSpend,
        TimeLockedWithdraw,
        CappedSpend,
        TokenGatedSpend,
        WhitelistedSpend,
        ExecuteRecurring,
        ClaimRecurring,
        CancelRecurring,
        Deposit,
        EmergencyWithdraw,
        UpdateConfig,
    ];

    /// Selector table for a vault kind.
    pub fn table(kind: VaultKind) -> &'static [SpendFunction] {
        match kind {
            VaultKind::Basic => BASIC,
            VaultKind::Multisig => MULTISIG,
            VaultKind::TimeLock => TIME_LOCK,
            VaultKind::SpendingCap => SPENDING_CAP,
            VaultKind::Recurring => RECURRING,
            VaultKind::TokenGated => TOKEN_GATED,
            VaultKind::Whitelist => WHITELIST,
            VaultKind::Master => MASTER,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OwnerSpend => "owner_spend",
            StandardSpend => "standard_spend",
            TimeLockedWithdraw => "time_locked_withdraw",
            CappedSpend => "capped_spend",
            TokenGatedSpend => "token_gated_spend",
            WhitelistedSpend => "whitelisted_spend",
            ExecuteRecurring => "execute_recurring",
            ClaimRecurring => "claim_recurring",
            CancelRecurring => "cancel_recurring",
            Deposit => "deposit",
            EmergencyWithdraw => "emergency_withdraw",
            UpdateConfig => "update_config",
        }
    }

    /// Fee allowances for functions that run covenant continuity.
    pub fn fee_allowance(self) -> FeeAllowance {
        match self {
            TimeLockedWithdraw | ExecuteRecurring | ClaimRecurring | CancelRecurring => {
                FeeAllowance::TIMELOCKED
            }
            _ => FeeAllowance::STANDARD,
        }
    }

    /// `true` when nobody has to sign.
    pub fn is_permissionless(self) -> bool {
        matches!(self, ExecuteRecurring | Deposit)
    }
}

impl fmt::Display for SpendFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SpendFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| format!("unknown spend function: {s}"))
    }
}

// ---------------------------------------------------------------------------
// Witness field access
// ---------------------------------------------------------------------------

pub(crate) fn amount(w: &AuthorizationWitness) -> Result<u64, PolicyError> {
    w.amount
        .ok_or(PolicyError::MissingWitnessField { field: "amount" })
}

pub(crate) fn destination(w: &AuthorizationWitness) -> Result<&LockingCommitment, PolicyError> {
    w.destination
        .as_ref()
        .ok_or(PolicyError::MissingWitnessField {
            field: "destination",
        })
}

pub(crate) fn mask(w: &AuthorizationWitness) -> Result<SignerMask, PolicyError> {
    let bits = w
        .mask
        .ok_or(PolicyError::MissingWitnessField { field: "mask" })?;
    SignerMask::new(bits)
}

pub(crate) fn token_input(w: &AuthorizationWitness) -> Result<usize, PolicyError> {
    w.token_input_index
        .map(|i| i as usize)
        .ok_or(PolicyError::MissingWitnessField {
            field: "token_input_index",
        })
}

pub(crate) fn update(w: &AuthorizationWitness) -> Result<&ConfigUpdate, PolicyError> {
    w.update
        .as_ref()
        .ok_or(PolicyError::MissingWitnessField { field: "update" })
}
