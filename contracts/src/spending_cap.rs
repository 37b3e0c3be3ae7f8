//! Spending-cap vault: the owner may spend at most the cap per transaction.
//!
//! | Selector | Function     |
//! |----------|--------------|
//! | 0        | capped spend |
//! | 1        | deposit      |
//!
//! The cap is a flat ceiling per spend. There is no on-chain counter of
//! what has been spent so far, so it does not reset or accumulate.

use vaultline_protocol::policy::{
    check_continuity, check_single_signer, check_spending_cap, CovenantBranch, PolicyError,
    SignerSlot,
};
use vaultline_protocol::transaction::{AuthorizationWitness, TransactionContext};

use crate::function::{amount, destination, SpendFunction};
use crate::vault::Vault;

pub fn capped_spend(
    vault: &Vault,
    ctx: &TransactionContext<'_>,
    witness: &AuthorizationWitness,
) -> Result<CovenantBranch, PolicyError> {
    check_single_signer(vault.config.owner(), SignerSlot::First, witness, &ctx.digest())?;
    let amount = amount(witness)?;
    check_spending_cap(amount, vault.config.spend_cap)?;
    check_continuity(
        ctx,
        amount,
        destination(witness)?,
        SpendFunction::CappedSpend.fee_allowance(),
    )
}
