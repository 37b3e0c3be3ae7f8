//! # Spend Planning
//!
//! Turns "run function F of this vault with these parameters" into a
//! [`SpendDraft`] for the fee-converging builder. The planner lays out the
//! outputs the predicate will demand, gives each adjustable output the
//! floor the predicate enforces, and lists the signatures the wallet still
//! has to provide.
//!
//! The planner and the predicates share [`covenant_branch`], so a built
//! proposal always has the output shape its predicate expects.

use serde::{Deserialize, Serialize};
use tracing::debug;

use vaultline_protocol::config::{BuilderParams, DUST_THRESHOLD, UPDATE_FEE_ALLOWANCE};
use vaultline_protocol::policy::{
    check_spending_cap, check_time_gate, covenant_branch, CovenantBranch, FeeAllowance,
    PolicyError, SignerMask, SignerSlot,
};
use vaultline_protocol::transaction::{
    build_transaction, AuthorizationWitness, BuildError, BuiltTransaction, ChainTip,
    ConfigUpdate, PendingSignature, PlannedOutput, SpendDraft, TxInput,
};
use vaultline_protocol::value::{self, LockingCommitment, TxOutput, Utxo};

use crate::function::SpendFunction;
use crate::vault::Vault;

/// Caller-supplied parameters. Which fields are needed depends on the
/// function; missing ones are reported by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    #[serde(default)]
    pub amount: Option<u64>,
    #[serde(default)]
    pub destination: Option<LockingCommitment>,
    /// Signer mask for standard spends. Defaults to the first `threshold`
    /// enabled slots.
    #[serde(default)]
    pub mask: Option<u8>,
    /// P2PKH UTXO carrying the access token.
    #[serde(default)]
    pub token_utxo: Option<Utxo>,
    /// P2PKH UTXOs funding a deposit.
    #[serde(default)]
    pub funding: Vec<Utxo>,
    /// Where deposit change goes.
    #[serde(default)]
    pub change: Option<LockingCommitment>,
    #[serde(default)]
    pub update: Option<ConfigUpdate>,
}

impl BuildRequest {
    /// Pay `amount` to `destination`.
    pub fn payout(amount: u64, destination: LockingCommitment) -> Self {
        Self {
            amount: Some(amount),
            destination: Some(destination),
            ..Self::default()
        }
    }

    /// Drain everything to `destination`.
    pub fn drain(destination: LockingCommitment) -> Self {
        Self {
            destination: Some(destination),
            ..Self::default()
        }
    }

    /// Add `amount` from `funding`, returning the rest to `change`.
    pub fn deposit(amount: u64, funding: Vec<Utxo>, change: LockingCommitment) -> Self {
        Self {
            amount: Some(amount),
            funding,
            change: Some(change),
            ..Self::default()
        }
    }

    pub fn update(update: ConfigUpdate) -> Self {
        Self {
            update: Some(update),
            ..Self::default()
        }
    }

    pub fn with_mask(mut self, mask: u8) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_token_utxo(mut self, utxo: Utxo) -> Self {
        self.token_utxo = Some(utxo);
        self
    }
}

fn invalid(reason: impl Into<String>) -> BuildError {
    BuildError::InvalidRequest {
        reason: reason.into(),
    }
}

fn rejected(e: PolicyError) -> BuildError {
    invalid(e.to_string())
}

fn required<T: Clone>(field: Option<&T>, name: &str) -> Result<T, BuildError> {
    field.cloned().ok_or_else(|| invalid(format!("missing {name}")))
}

/// The first `threshold` enabled slots.
pub fn default_mask(vault: &Vault) -> SignerMask {
    let slots: Vec<SignerSlot> = SignerSlot::ALL
        .into_iter()
        .filter(|s| !vault.config.signers[s.index()].is_zero())
        .take(vault.config.threshold as usize)
        .collect();
    SignerMask::from_slots(&slots)
}

fn enabled_mask(vault: &Vault) -> SignerMask {
    let slots: Vec<SignerSlot> = SignerSlot::ALL
        .into_iter()
        .filter(|s| !vault.config.signers[s.index()].is_zero())
        .collect();
    SignerMask::from_slots(&slots)
}

fn vault_signatures(mask: SignerMask) -> Vec<PendingSignature> {
    mask.slots()
        .map(|slot| PendingSignature {
            input: 0,
            slot: Some(slot),
        })
        .collect()
}

fn owner_signature() -> Vec<PendingSignature> {
    vault_signatures(SignerMask::from_slots(&[SignerSlot::First]))
}

/// Outputs for a covenant-continuity payout of `amount` from `input`.
///
/// Continue: the continuation gets exactly `remaining`, the payout gets
/// `amount`, and the covenant allowance is the initial fee. Drain: the
/// payout gets everything.
fn payout_outputs(
    vault: &Vault,
    input_value: u64,
    amount: u64,
    destination: &LockingCommitment,
    fee: FeeAllowance,
) -> Result<(CovenantBranch, Vec<PlannedOutput>), BuildError> {
    if amount == 0 {
        return Err(rejected(PolicyError::ZeroAmount));
    }
    let floor = fee.payout_floor(amount);
    let branch = covenant_branch(input_value, amount, fee);
    let outputs = match branch {
        CovenantBranch::Continue { remaining } => vec![
            PlannedOutput::adjustable(TxOutput::new(remaining, vault.commitment()), remaining),
            PlannedOutput::adjustable(TxOutput::new(amount, destination.clone()), floor),
        ],
        CovenantBranch::Drain => {
            if input_value < floor {
                return Err(BuildError::InsufficientFunds {
                    available: input_value,
                    required: floor,
                });
            }
            vec![PlannedOutput::adjustable(
                TxOutput::new(input_value, destination.clone()),
                floor,
            )]
        }
    };
    Ok((branch, outputs))
}

/// Smallest vault UTXO value worth handing to [`plan`] for `function`.
///
/// Payouts need the amount plus the covenant fee allowance. A deposit is
/// paid for by `request.funding`, and the remaining functions spend
/// whatever the UTXO holds, so any vault UTXO will do.
pub fn selection_target(vault: &Vault, function: SpendFunction, request: &BuildRequest) -> u64 {
    let amount = match function {
        SpendFunction::OwnerSpend
        | SpendFunction::StandardSpend
        | SpendFunction::TimeLockedWithdraw
        | SpendFunction::CappedSpend
        | SpendFunction::WhitelistedSpend
        | SpendFunction::TokenGatedSpend => request.amount.unwrap_or(0),
        SpendFunction::ExecuteRecurring | SpendFunction::ClaimRecurring => {
            vault.config.recurring.map_or(0, |r| r.amount)
        }
        SpendFunction::Deposit
        | SpendFunction::CancelRecurring
        | SpendFunction::EmergencyWithdraw
        | SpendFunction::UpdateConfig => return 0,
    };
    amount.saturating_add(function.fee_allowance().covenant)
}

/// Lay out a spend of `vault_utxo` through `function`.
pub fn plan(
    vault: &Vault,
    function: SpendFunction,
    vault_utxo: &Utxo,
    request: &BuildRequest,
    tip: ChainTip,
) -> Result<SpendDraft, BuildError> {
    let selector = vault
        .selector_of(function)
        .ok_or_else(|| invalid(format!("{function} is not a {} vault function", vault.kind)))?;
    if *vault_utxo.commitment() != vault.commitment() {
        return Err(invalid("UTXO is not locked by this vault"));
    }

    let config = &vault.config;
    let input_value = vault_utxo.value();
    let mut witness = AuthorizationWitness::new(selector);
    let mut extra_inputs: Vec<TxInput> = Vec::new();
    let mut locktime = 0u32;

    let (outputs, mut signatures) = match function {
        SpendFunction::OwnerSpend
        | SpendFunction::StandardSpend
        | SpendFunction::TimeLockedWithdraw
        | SpendFunction::CappedSpend
        | SpendFunction::WhitelistedSpend => {
            let amount = required(request.amount.as_ref(), "amount")?;
            let destination = required(request.destination.as_ref(), "destination")?;
            let signatures = match function {
                SpendFunction::StandardSpend => {
                    let mask = match request.mask {
                        Some(bits) => SignerMask::new(bits).map_err(rejected)?,
                        None => default_mask(vault),
                    };
                    check_spending_cap(amount, config.spend_cap).map_err(rejected)?;
                    locktime = config.unlock_height;
                    witness = witness.with_mask(mask.bits());
                    vault_signatures(mask)
                }
                SpendFunction::TimeLockedWithdraw => {
                    locktime = config.unlock_height;
                    owner_signature()
                }
                SpendFunction::CappedSpend => {
                    check_spending_cap(amount, config.spend_cap).map_err(rejected)?;
                    owner_signature()
                }
                SpendFunction::WhitelistedSpend => {
                    let allowed = required(config.whitelist.as_ref(), "whitelist")?;
                    if !destination.pays_to(&allowed) {
                        return Err(rejected(PolicyError::RecipientNotWhitelisted));
                    }
                    owner_signature()
                }
                _ => owner_signature(),
            };
            let (_, outputs) =
                payout_outputs(vault, input_value, amount, &destination, function.fee_allowance())?;
            witness = witness.with_amount(amount).with_destination(destination);
            (outputs, signatures)
        }

        SpendFunction::TokenGatedSpend => {
            let amount = required(request.amount.as_ref(), "amount")?;
            let destination = required(request.destination.as_ref(), "destination")?;
            let requirement = required(config.token.as_ref(), "token requirement")?;
            let token_utxo = required(request.token_utxo.as_ref(), "token_utxo")?;
            let token = token_utxo
                .token()
                .filter(|t| t.category == requirement.category)
                .cloned()
                .ok_or_else(|| invalid("token UTXO does not carry the required category"))?;

            let (_, mut outputs) =
                payout_outputs(vault, input_value, amount, &destination, function.fee_allowance())?;
            let first = &mut outputs[0];
            first.output.value = first.output.value.saturating_add(token_utxo.value());
            first.floor = first.floor.saturating_add(token_utxo.value());
            first.output.token = Some(token);

            witness = witness
                .with_amount(amount)
                .with_destination(destination)
                .with_token_input(1);
            extra_inputs.push(TxInput::new(token_utxo));
            let mut signatures = owner_signature();
            signatures.push(PendingSignature {
                input: 1,
                slot: None,
            });
            (outputs, signatures)
        }

        SpendFunction::ExecuteRecurring | SpendFunction::ClaimRecurring => {
            let schedule = required(config.recurring.as_ref(), "recurring schedule")?;
            locktime = schedule.next_due;
            let payee = LockingCommitment::p2pkh(&schedule.payee);
            let (_, outputs) = payout_outputs(
                vault,
                input_value,
                schedule.amount,
                &payee,
                function.fee_allowance(),
            )?;
            let signatures = if function == SpendFunction::ClaimRecurring {
                owner_signature()
            } else {
                Vec::new()
            };
            (outputs, signatures)
        }

        SpendFunction::CancelRecurring => {
            let destination = required(request.destination.as_ref(), "destination")?;
            let (_, outputs) = payout_outputs(
                vault,
                input_value,
                input_value,
                &destination,
                function.fee_allowance(),
            )?;
            witness = witness.with_destination(destination);
            (outputs, owner_signature())
        }

        SpendFunction::Deposit => {
            let amount = required(request.amount.as_ref(), "amount")?;
            if amount == 0 {
                return Err(rejected(PolicyError::ZeroAmount));
            }
            if request.funding.is_empty() {
                return Err(invalid("missing funding"));
            }
            let values: Vec<u64> = request.funding.iter().map(Utxo::value).collect();
            let funded = u64::try_from(value::total(&values))
                .map_err(|_| invalid("funding total overflows"))?;
            let change = funded.checked_sub(amount).ok_or(BuildError::InsufficientFunds {
                available: funded,
                required: amount,
            })?;

            let total = input_value.saturating_add(amount);
            let mut outputs = vec![PlannedOutput::adjustable(
                TxOutput::new(total, vault.commitment()),
                input_value.saturating_add(1),
            )];
            if change > 0 {
                let to = required(request.change.as_ref(), "change")?;
                outputs.push(PlannedOutput::change(TxOutput::new(change, to)));
            }

            let mut signatures = Vec::with_capacity(request.funding.len());
            for (i, utxo) in request.funding.iter().enumerate() {
                extra_inputs.push(TxInput::new(utxo.clone()));
                signatures.push(PendingSignature {
                    input: i + 1,
                    slot: None,
                });
            }
            (outputs, signatures)
        }

        SpendFunction::EmergencyWithdraw => {
            let destination = required(request.destination.as_ref(), "destination")?;
            let outputs = vec![PlannedOutput::adjustable(
                TxOutput::new(input_value, destination),
                DUST_THRESHOLD + 1,
            )];
            (outputs, vault_signatures(enabled_mask(vault)))
        }

        SpendFunction::UpdateConfig => {
            let update = required(request.update.as_ref(), "update")?;
            vault.check_update(&update).map_err(|e| invalid(e.to_string()))?;
            witness = witness.with_update(update);
            let outputs = vec![PlannedOutput::adjustable(
                TxOutput::new(input_value, vault.commitment()),
                input_value.saturating_sub(UPDATE_FEE_ALLOWANCE),
            )];
            (outputs, owner_signature())
        }
    };

    if locktime != 0 {
        check_time_gate(locktime, locktime, tip).map_err(rejected)?;
    }

    let mut inputs = vec![TxInput::with_witness(vault_utxo.clone(), witness)];
    inputs.append(&mut extra_inputs);
    signatures.sort_by_key(|s| (s.input, s.slot.map(SignerSlot::index)));

    debug!(
        kind = %vault.kind,
        %function,
        inputs = inputs.len(),
        outputs = outputs.len(),
        locktime,
        "spend planned"
    );
    Ok(SpendDraft {
        inputs,
        outputs,
        locktime,
        signatures,
    })
}

/// [`plan`], then run the fee loop.
pub fn plan_and_build(
    vault: &Vault,
    function: SpendFunction,
    vault_utxo: &Utxo,
    request: &BuildRequest,
    tip: ChainTip,
    params: &BuilderParams,
) -> Result<BuiltTransaction, BuildError> {
    build_transaction(&plan(vault, function, vault_utxo, request, tip)?, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    #[test]
    fn continue_layout_carries_floors() {
        let k = keys();
        let vault = basic_vault(&k[0]);
        let utxo = vault_utxo(&vault, 1_000_000);
        let draft = plan(
            &vault,
            SpendFunction::OwnerSpend,
            &utxo,
            &BuildRequest::payout(200_000, dest()),
            tip(HEIGHT),
        )
        .unwrap();
        assert_eq!(draft.outputs.len(), 2);
        assert_eq!(draft.outputs[0].output.value, 799_500);
        assert_eq!(draft.outputs[0].floor, 799_500);
        assert_eq!(draft.outputs[1].floor, 199_700);
        assert_eq!(draft.signatures.len(), 1);
    }

    #[test]
    fn wrong_kind_function_is_invalid() {
        let k = keys();
        let vault = basic_vault(&k[0]);
        let utxo = vault_utxo(&vault, 1_000_000);
        assert!(matches!(
            plan(
                &vault,
                SpendFunction::UpdateConfig,
                &utxo,
                &BuildRequest::default(),
                tip(HEIGHT)
            ),
            Err(BuildError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn default_mask_takes_first_enabled_slots() {
        let vault = master_vault(&keys());
        assert_eq!(default_mask(&vault).bits(), 0b011);
        assert_eq!(enabled_mask(&vault).bits(), 0b111);
    }

    #[test]
    fn recurring_before_due_is_refused() {
        let vault = master_vault(&keys());
        let utxo = vault_utxo(&vault, 1_000_000);
        assert!(plan(
            &vault,
            SpendFunction::ExecuteRecurring,
            &utxo,
            &BuildRequest::default(),
            tip(799_999)
        )
        .is_err());
        let draft = plan(
            &vault,
            SpendFunction::ExecuteRecurring,
            &utxo,
            &BuildRequest::default(),
            tip(800_000),
        )
        .unwrap();
        assert_eq!(draft.locktime, 800_000);
        assert!(draft.signatures.is_empty());
    }

    #[test]
    fn deposit_without_enough_funding() {
        let vault = basic_vault(&keys()[0]);
        let utxo = vault_utxo(&vault, 1_000_000);
        let funding = vec![Utxo::new(
            vaultline_protocol::value::OutPoint::new([0x33; 32], 0),
            TxOutput::new(5_000, dest()),
        )];
        assert_eq!(
            plan(
                &vault,
                SpendFunction::Deposit,
                &utxo,
                &BuildRequest::deposit(6_000, funding, dest()),
                tip(HEIGHT)
            ),
            Err(BuildError::InsufficientFunds {
                available: 5_000,
                required: 6_000
            })
        );
    }

    #[test]
    fn funding_total_overflow_is_invalid() {
        let vault = basic_vault(&keys()[0]);
        let utxo = vault_utxo(&vault, 1_000_000);
        let funding = [u64::MAX, 10]
            .iter()
            .enumerate()
            .map(|(i, v)| {
                Utxo::new(
                    vaultline_protocol::value::OutPoint::new([0x40 + i as u8; 32], 0),
                    TxOutput::new(*v, dest()),
                )
            })
            .collect();
        assert!(matches!(
            plan(
                &vault,
                SpendFunction::Deposit,
                &utxo,
                &BuildRequest::deposit(5, funding, dest()),
                tip(HEIGHT)
            ),
            Err(BuildError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn selection_targets_per_function() {
        let vault = master_vault(&keys());
        let payout = BuildRequest::payout(200_000, dest());
        assert_eq!(
            selection_target(&vault, SpendFunction::StandardSpend, &payout),
            200_500
        );
        assert_eq!(
            selection_target(&vault, SpendFunction::ExecuteRecurring, &payout),
            51_000
        );
        let deposit = BuildRequest::deposit(2_000_000, Vec::new(), dest());
        assert_eq!(selection_target(&vault, SpendFunction::Deposit, &deposit), 0);
        assert_eq!(
            selection_target(&vault, SpendFunction::EmergencyWithdraw, &payout),
            0
        );
    }
}
