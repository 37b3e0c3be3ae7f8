//! Time-lock vault: the owner may withdraw once the unlock height is reached.
//!
//! | Selector | Function              |
//! |----------|-----------------------|
//! | 0        | time-locked withdraw  |
//! | 1        | deposit               |
//!
//! Uses the 1000 / 500 fee allowances.

use vaultline_protocol::policy::{
    check_continuity, check_single_signer, check_time_gate, CovenantBranch, PolicyError,
    SignerSlot,
};
use vaultline_protocol::transaction::{AuthorizationWitness, TransactionContext};

use crate::function::{amount, destination, SpendFunction};
use crate::vault::Vault;

pub fn withdraw(
    vault: &Vault,
    ctx: &TransactionContext<'_>,
    witness: &AuthorizationWitness,
) -> Result<CovenantBranch, PolicyError> {
    check_single_signer(vault.config.owner(), SignerSlot::First, witness, &ctx.digest())?;
    check_time_gate(vault.config.unlock_height, ctx.locktime(), ctx.chain_tip())?;
    check_continuity(
        ctx,
        amount(witness)?,
        destination(witness)?,
        SpendFunction::TimeLockedWithdraw.fee_allowance(),
    )
}
