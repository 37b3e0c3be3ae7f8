//! Basic vault: one owner, covenant-protected spends.
//!
//! | Selector | Function    |
//! |----------|-------------|
//! | 0        | owner spend |
//! | 1        | deposit     |

use tracing::debug;

use vaultline_protocol::policy::{
    check_continuity, check_single_signer, CovenantBranch, PolicyError, SignerSlot,
};
use vaultline_protocol::transaction::{AuthorizationWitness, TransactionContext};

use crate::function::{amount, destination, SpendFunction};
use crate::vault::Vault;

/// Owner signs in slot 1; the payout leaves under covenant continuity.
pub fn owner_spend(
    vault: &Vault,
    ctx: &TransactionContext<'_>,
    witness: &AuthorizationWitness,
) -> Result<CovenantBranch, PolicyError> {
    check_single_signer(vault.config.owner(), SignerSlot::First, witness, &ctx.digest())?;
    let amount = amount(witness)?;
    let destination = destination(witness)?;
    debug!(amount, "owner spend authorized");
    check_continuity(
        ctx,
        amount,
        destination,
        SpendFunction::OwnerSpend.fee_allowance(),
    )
}
