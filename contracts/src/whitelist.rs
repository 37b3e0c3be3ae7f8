//! Whitelist vault: the owner may only pay one configured recipient.
//!
//! | Selector | Function          |
//! |----------|-------------------|
//! | 0        | whitelisted spend |
//! | 1        | deposit           |

use vaultline_protocol::policy::{
    check_continuity, check_single_signer, CovenantBranch, PolicyError, SignerSlot,
};
use vaultline_protocol::transaction::{AuthorizationWitness, TransactionContext};

use crate::function::{amount, destination, SpendFunction};
use crate::vault::Vault;

/// Owner signs; the destination must be P2PKH to the whitelisted hash.
pub fn whitelisted_spend(
    vault: &Vault,
    ctx: &TransactionContext<'_>,
    witness: &AuthorizationWitness,
) -> Result<CovenantBranch, PolicyError> {
    let allowed = vault
        .config
        .whitelist
        .ok_or(PolicyError::FunctionDisabled {
            function: SpendFunction::WhitelistedSpend.name(),
        })?;
    check_single_signer(vault.config.owner(), SignerSlot::First, witness, &ctx.digest())?;

    let destination = destination(witness)?;
    if !destination.pays_to(&allowed) {
        return Err(PolicyError::RecipientNotWhitelisted);
    }
    check_continuity(
        ctx,
        amount(witness)?,
        destination,
        SpendFunction::WhitelistedSpend.fee_allowance(),
    )
}
