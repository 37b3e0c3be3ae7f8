//! Recurring-payment vault: a fixed amount to a fixed payee, due from a
//! block height on.
//!
//! | Selector | Function |
//! |----------|----------|
//! | 0        | execute  |
//! | 1        | claim    |
//! | 2        | cancel   |
//! | 3        | deposit  |
//!
//! Execute is permissionless: anyone may push the payment once it is due.
//! Claim is the same payment pulled by the payee. Cancel lets the owner
//! drain the vault. All three use the 1000 / 500 fee allowances.
//!
//! The due height lives in the immutable config. After a payment the
//! tracker records [`Vault::successor_after_payment`]; the continuation
//! output itself still carries the current commitment.

use vaultline_protocol::policy::{
    check_continuity, check_single_signer, check_time_gate, CovenantBranch, PolicyError,
    SignerSlot,
};
use vaultline_protocol::transaction::{AuthorizationWitness, TransactionContext};
use vaultline_protocol::value::LockingCommitment;

use crate::function::{destination, SpendFunction};
use crate::vault::{RecurringPayment, Vault};

fn schedule(vault: &Vault, function: SpendFunction) -> Result<&RecurringPayment, PolicyError> {
    vault
        .config
        .recurring
        .as_ref()
        .ok_or(PolicyError::FunctionDisabled {
            function: function.name(),
        })
}

fn check_payment(
    ctx: &TransactionContext<'_>,
    schedule: &RecurringPayment,
    function: SpendFunction,
) -> Result<CovenantBranch, PolicyError> {
    check_time_gate(schedule.next_due, ctx.locktime(), ctx.chain_tip())?;
    check_continuity(
        ctx,
        schedule.amount,
        &LockingCommitment::p2pkh(&schedule.payee),
        function.fee_allowance(),
    )
}

/// Pay the due amount to the payee. No signature.
pub fn execute(vault: &Vault, ctx: &TransactionContext<'_>) -> Result<CovenantBranch, PolicyError> {
    let schedule = schedule(vault, SpendFunction::ExecuteRecurring)?;
    check_payment(ctx, schedule, SpendFunction::ExecuteRecurring)
}

/// The payee signs slot 1 and pulls the due amount.
pub fn claim(
    vault: &Vault,
    ctx: &TransactionContext<'_>,
    witness: &AuthorizationWitness,
) -> Result<CovenantBranch, PolicyError> {
    let schedule = schedule(vault, SpendFunction::ClaimRecurring)?;
    check_single_signer(&schedule.payee, SignerSlot::First, witness, &ctx.digest()).map_err(
        |e| match e {
            PolicyError::PubkeyMismatch { .. } => PolicyError::NotPayee,
            other => other,
        },
    )?;
    check_payment(ctx, schedule, SpendFunction::ClaimRecurring)
}

/// The owner drains the whole vault to a destination of their choosing.
pub fn cancel(
    vault: &Vault,
    ctx: &TransactionContext<'_>,
    witness: &AuthorizationWitness,
) -> Result<CovenantBranch, PolicyError> {
    schedule(vault, SpendFunction::CancelRecurring)?;
    check_single_signer(vault.config.owner(), SignerSlot::First, witness, &ctx.digest())?;
    check_continuity(
        ctx,
        ctx.active_value(),
        destination(witness)?,
        SpendFunction::CancelRecurring.fee_allowance(),
    )
}
