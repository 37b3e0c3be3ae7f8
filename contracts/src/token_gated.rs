//! Token-gated vault: the owner spends while holding an access token.
//!
//! | Selector | Function          |
//! |----------|-------------------|
//! | 0        | token-gated spend |
//! | 1        | deposit           |
//!
//! The token sits on another input of the same transaction, named by the
//! witness. It must come back out on output 0: the vault continuation when
//! the vault continues, the payout when it drains.

use vaultline_protocol::policy::{
    check_continuity, check_single_signer, check_token_gate, CovenantBranch, PolicyError,
    SignerSlot,
};
use vaultline_protocol::transaction::{AuthorizationWitness, TransactionContext};

use crate::function::{amount, destination, token_input, SpendFunction};
use crate::vault::Vault;

pub fn token_gated_spend(
    vault: &Vault,
    ctx: &TransactionContext<'_>,
    witness: &AuthorizationWitness,
) -> Result<CovenantBranch, PolicyError> {
    let requirement = vault
        .config
        .token
        .as_ref()
        .ok_or(PolicyError::FunctionDisabled {
            function: SpendFunction::TokenGatedSpend.name(),
        })?;
    check_single_signer(vault.config.owner(), SignerSlot::First, witness, &ctx.digest())?;
    check_token_gate(ctx, token_input(witness)?, requirement)?;
    check_continuity(
        ctx,
        amount(witness)?,
        destination(witness)?,
        SpendFunction::TokenGatedSpend.fee_allowance(),
    )
}
