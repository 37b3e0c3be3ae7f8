//! # Selector Dispatch
//!
//! Entry points for evaluating proposals. [`evaluate`] runs one vault
//! predicate on one input. [`verify_proposal`] checks a whole proposal
//! against a [`VaultRegistry`]: structure first, then every input.
//!
//! Evaluation is a pure function of (vault, proposal, input index, chain
//! tip). Nothing is cached between calls and no ledger is consulted.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use vaultline_protocol::policy::{check_deposit, CovenantBranch, PolicyError};
use vaultline_protocol::transaction::{
    verify_p2pkh_input, verify_structure, ChainTip, TransactionContext, TransactionProposal,
};

use crate::function::SpendFunction;
use crate::registry::VaultRegistry;
use crate::vault::{Vault, VaultKind};
use crate::{basic, master, multisig, recurring, spending_cap, timelock, token_gated, whitelist};

/// What an accepted vault input did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub input: usize,
    pub kind: VaultKind,
    pub function: SpendFunction,
    pub selector: u8,
    /// The covenant branch enforced, for functions that run continuity.
    pub branch: Option<CovenantBranch>,
}

/// Evaluate `vault`'s predicate on input `input_index` of `proposal`.
pub fn evaluate(
    vault: &Vault,
    proposal: &TransactionProposal,
    input_index: usize,
    tip: ChainTip,
) -> Result<Evaluation, PolicyError> {
    let ctx = TransactionContext::new(proposal, input_index, tip)?;
    if *ctx.active_commitment() != vault.commitment() {
        return Err(PolicyError::ForeignInput { index: input_index });
    }
    let witness = ctx.witness()?;
    let selector = witness.selector;
    let function = vault.function(selector)?;

    let result = match function {
        SpendFunction::OwnerSpend => basic::owner_spend(vault, &ctx, witness).map(Some),
        SpendFunction::StandardSpend => multisig::standard_spend(vault, &ctx, witness).map(Some),
        SpendFunction::TimeLockedWithdraw => timelock::withdraw(vault, &ctx, witness).map(Some),
        SpendFunction::CappedSpend => spending_cap::capped_spend(vault, &ctx, witness).map(Some),
        SpendFunction::TokenGatedSpend => {
            token_gated::token_gated_spend(vault, &ctx, witness).map(Some)
        }
        SpendFunction::WhitelistedSpend => {
            whitelist::whitelisted_spend(vault, &ctx, witness).map(Some)
        }
        SpendFunction::ExecuteRecurring => recurring::execute(vault, &ctx).map(Some),
        SpendFunction::ClaimRecurring => recurring::claim(vault, &ctx, witness).map(Some),
        SpendFunction::CancelRecurring => recurring::cancel(vault, &ctx, witness).map(Some),
        SpendFunction::Deposit => check_deposit(&ctx).map(|_| None),
        SpendFunction::EmergencyWithdraw => {
            multisig::emergency_withdraw(vault, &ctx, witness).map(|_| None)
        }
        SpendFunction::UpdateConfig => master::update_config(vault, &ctx, witness).map(|_| None),
    };

    match result {
        Ok(branch) => {
            debug!(input_index, kind = %vault.kind, %function, ?branch, "vault input accepted");
            Ok(Evaluation {
                input: input_index,
                kind: vault.kind,
                function,
                selector,
                branch,
            })
        }
        Err(e) => {
            warn!(
                input_index,
                kind = %vault.kind,
                %function,
                class = %e.class(),
                error = %e,
                "vault input rejected"
            );
            Err(e)
        }
    }
}

/// Verify every input of `proposal`.
///
/// Inputs locked by a registered vault run that vault's predicate. P2PKH
/// inputs must carry a valid key and signature. Anything else is
/// unauthorized. Returns one [`Evaluation`] per vault input.
pub fn verify_proposal(
    proposal: &TransactionProposal,
    registry: &VaultRegistry,
    tip: ChainTip,
) -> Result<Vec<Evaluation>, PolicyError> {
    verify_structure(proposal)?;

    let mut evaluations = Vec::new();
    for (index, input) in proposal.inputs.iter().enumerate() {
        let commitment = input.utxo.commitment();
        if let Some(vault) = registry.get(commitment) {
            evaluations.push(evaluate(vault, proposal, index, tip)?);
        } else if commitment.is_p2pkh() {
            verify_p2pkh_input(proposal, index)?;
        } else {
            return Err(PolicyError::UnauthorizedInput { index });
        }
    }
    debug!(
        inputs = proposal.inputs.len(),
        vault_inputs = evaluations.len(),
        "proposal verified"
    );
    Ok(evaluations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use vaultline_protocol::policy::SignerSlot;
    use vaultline_protocol::transaction::AuthorizationWitness;
    use vaultline_protocol::value::TxOutput;

    #[test]
    fn illegal_selector_rejects() {
        let k = keys();
        let vault = basic_vault(&k[0]);
        let p = spend(
            &vault,
            1_000_000,
            AuthorizationWitness::new(2),
            vec![TxOutput::new(999_000, dest())],
            0,
        );
        assert_eq!(
            evaluate(&vault, &p, 0, tip(HEIGHT)),
            Err(PolicyError::IllegalSelector {
                selector: 2,
                count: 2
            })
        );
    }

    #[test]
    fn foreign_input_rejects() {
        let k = keys();
        let vault = basic_vault(&k[0]);
        let other = basic_vault(&k[1]);
        let p = spend(
            &other,
            1_000_000,
            AuthorizationWitness::new(1),
            vec![TxOutput::new(1_000_001, other.commitment())],
            0,
        );
        assert_eq!(
            evaluate(&vault, &p, 0, tip(HEIGHT)),
            Err(PolicyError::ForeignInput { index: 0 })
        );
    }

    #[test]
    fn deposit_through_dispatch() {
        let k = keys();
        let vault = basic_vault(&k[0]);
        let p = spend(
            &vault,
            1_000_000,
            AuthorizationWitness::new(1),
            vec![TxOutput::new(900_000, vault.commitment())],
            0,
        );
        assert_eq!(
            evaluate(&vault, &p, 0, tip(HEIGHT)),
            Err(PolicyError::DepositNotIncreasing {
                input: 1_000_000,
                output: 900_000
            })
        );
    }

    #[test]
    fn registry_routes_vault_inputs() {
        let k = keys();
        let vault = basic_vault(&k[0]);
        let mut registry = VaultRegistry::new();
        registry.insert(vault.clone());

        let w = AuthorizationWitness::new(0)
            .with_amount(999_900)
            .with_destination(dest());
        let mut p = spend(&vault, 1_000_000, w, vec![TxOutput::new(999_600, dest())], 0);
        sign(&mut p, &[(SignerSlot::First, &k[0])]);

        let evals = verify_proposal(&p, &registry, tip(HEIGHT)).unwrap();
        assert_eq!(evals.len(), 1);
        assert_eq!(evals[0].function, SpendFunction::OwnerSpend);
        assert_eq!(evals[0].branch, Some(CovenantBranch::Drain));

        assert_eq!(
            verify_proposal(&p, &VaultRegistry::new(), tip(HEIGHT)),
            Err(PolicyError::UnauthorizedInput { index: 0 })
        );
    }
}
