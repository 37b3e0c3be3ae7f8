//! Multisig vault: up to three signer slots with a threshold.
//!
//! | Selector | Function           |
//! |----------|--------------------|
//! | 0        | standard spend     |
//! | 1        | emergency withdraw |
//! | 2        | deposit            |
//!
//! The multisig kind takes the mask strictly: exactly `threshold` bits must
//! be set. The master kind runs the same standard spend but accepts any
//! legal mask, counting only enabled slots.

use tracing::debug;

use vaultline_protocol::policy::{
    check_all_signers, check_continuity, check_multisig, check_spending_cap, check_time_gate,
    CovenantBranch, PolicyError,
};
use vaultline_protocol::transaction::{AuthorizationWitness, TransactionContext};

use crate::function::{amount, destination, mask, SpendFunction};
use crate::vault::{Vault, VaultKind};

/// Signer mask, time-gate and cap, then covenant continuity.
pub fn standard_spend(
    vault: &Vault,
    ctx: &TransactionContext<'_>,
    witness: &AuthorizationWitness,
) -> Result<CovenantBranch, PolicyError> {
    let config = &vault.config;
    let mask = mask(witness)?;
    if vault.kind == VaultKind::Multisig && mask.count() != config.threshold as usize {
        return Err(PolicyError::IllegalMask { mask: mask.bits() });
    }

    check_multisig(&config.signers, config.threshold, mask, witness, &ctx.digest())?;
    check_time_gate(config.unlock_height, ctx.locktime(), ctx.chain_tip())?;
    let amount = amount(witness)?;
    check_spending_cap(amount, config.spend_cap)?;
    check_continuity(
        ctx,
        amount,
        destination(witness)?,
        SpendFunction::StandardSpend.fee_allowance(),
    )
}

/// Every enabled signer signs; outputs are unrestricted. The signatures
/// commit to the whole output layout, so the signers chose it.
pub fn emergency_withdraw(
    vault: &Vault,
    ctx: &TransactionContext<'_>,
    witness: &AuthorizationWitness,
) -> Result<(), PolicyError> {
    let signers = check_all_signers(&vault.config.signers, witness, &ctx.digest())?;
    debug!(signers, "emergency withdraw authorized");
    Ok(())
}
