//! Master vault: every feature on one commitment.
//!
//! | Selector | Function           | Predicate                       |
//! |----------|--------------------|---------------------------------|
//! | 0        | standard spend     | [`multisig::standard_spend`]    |
//! | 1        | token-gated spend  | [`token_gated::token_gated_spend`] |
//! | 2        | execute recurring  | [`recurring::execute`]          |
//! | 3        | claim recurring    | [`recurring::claim`]            |
//! | 4        | deposit            | `check_deposit`                 |
//! | 5        | emergency withdraw | [`multisig::emergency_withdraw`] |
//! | 6        | update config      | [`update_config`]               |
//! | 7        | whitelisted spend  | [`whitelist::whitelisted_spend`] |
//!
//! A function whose configuration the vault lacks (no token requirement,
//! no recurring schedule, no whitelist) rejects with
//! [`PolicyError::FunctionDisabled`].
//!
//! [`multisig::standard_spend`]: crate::multisig::standard_spend
//! [`multisig::emergency_withdraw`]: crate::multisig::emergency_withdraw
//! [`token_gated::token_gated_spend`]: crate::token_gated::token_gated_spend
//! [`recurring::execute`]: crate::recurring::execute
//! [`recurring::claim`]: crate::recurring::claim
//! [`whitelist::whitelisted_spend`]: crate::whitelist::whitelisted_spend

use tracing::debug;

use vaultline_protocol::config::UPDATE_FEE_ALLOWANCE;
use vaultline_protocol::policy::{
    check_commitment_preserved, check_single_signer, PolicyError, SignerSlot,
};
use vaultline_protocol::transaction::{AuthorizationWitness, TransactionContext};

use crate::function::update;
use crate::vault::Vault;

/// Owner-signed parameter change.
///
/// The spend keeps the value in the vault: a single output carrying the
/// same commitment, less at most the update fee allowance. The new values
/// are range-checked here and recorded by the tracker via
/// [`Vault::apply_update`].
pub fn update_config(
    vault: &Vault,
    ctx: &TransactionContext<'_>,
    witness: &AuthorizationWitness,
) -> Result<(), PolicyError> {
    check_single_signer(vault.config.owner(), SignerSlot::First, witness, &ctx.digest())?;
    let update = update(witness)?;
    vault.check_update(update)?;

    if ctx.output_count() != 1 {
        return Err(PolicyError::UnexpectedOutputCount {
            expected: 1,
            actual: ctx.output_count(),
        });
    }
    check_commitment_preserved(ctx)?;

    let required = ctx.active_value().saturating_sub(UPDATE_FEE_ALLOWANCE);
    let actual = ctx.output(0).map(|o| o.value).unwrap_or_default();
    if actual < required {
        return Err(PolicyError::OutputValueTooLow {
            index: 0,
            required,
            actual,
        });
    }
    debug!(
        threshold = update.threshold,
        spend_cap = update.spend_cap,
        unlock_height = update.unlock_height,
        "configuration update authorized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use vaultline_protocol::transaction::ConfigUpdate;
    use vaultline_protocol::value::TxOutput;

    const UPDATE: ConfigUpdate = ConfigUpdate {
        threshold: 3,
        spend_cap: 100_000,
        unlock_height: 0,
    };

    fn run(update: ConfigUpdate, outputs: Vec<TxOutput>) -> Result<(), PolicyError> {
        let k = keys();
        let vault = master_vault(&k);
        let w = AuthorizationWitness::new(6).with_update(update);
        let mut p = spend(&vault, 1_000_000, w, outputs, 0);
        sign(&mut p, &[(SignerSlot::First, &k[0])]);
        let ctx = context(&p, 0);
        update_config(&vault, &ctx, ctx.witness()?)
    }

    #[test]
    fn owner_updates_in_place() {
        let vault = master_vault(&keys());
        assert_eq!(
            run(UPDATE, vec![TxOutput::new(999_000, vault.commitment())]),
            Ok(())
        );
    }

    #[test]
    fn update_must_keep_value_home() {
        let vault = master_vault(&keys());
        assert!(matches!(
            run(UPDATE, vec![TxOutput::new(998_999, vault.commitment())]),
            Err(PolicyError::OutputValueTooLow { index: 0, .. })
        ));
        assert_eq!(
            run(
                UPDATE,
                vec![
                    TxOutput::new(900_000, vault.commitment()),
                    TxOutput::new(99_000, dest())
                ]
            ),
            Err(PolicyError::UnexpectedOutputCount {
                expected: 1,
                actual: 2
            })
        );
        assert_eq!(
            run(UPDATE, vec![TxOutput::new(999_000, dest())]),
            Err(PolicyError::CovenantMismatch { index: 0 })
        );
    }

    #[test]
    fn out_of_range_update_rejects() {
        let vault = master_vault(&keys());
        let bad = ConfigUpdate {
            threshold: 4,
            ..UPDATE
        };
        assert!(matches!(
            run(bad, vec![TxOutput::new(999_000, vault.commitment())]),
            Err(PolicyError::InvalidConfigUpdate { .. })
        ));
    }
}
