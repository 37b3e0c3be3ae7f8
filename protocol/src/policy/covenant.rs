//! Covenant continuity.
//!
//! After paying `amount` out of a vault input, whatever is left either
//! stays in the vault (output 0 reproduces the input's commitment) or, when
//! the leftover would be dust, the vault drains into a single payout.
//!
//! ```text
//! remaining = input_value - amount - fee.covenant        (signed)
//!
//! remaining > DUST   →  out[0] = vault  >= remaining
//!                       out[1] = dest   >= amount - fee.payout
//!                       exactly 2 outputs
//! otherwise          →  out[0] = dest   >= amount - fee.payout
//!                       exactly 1 output
//! ```
//!
//! The fee allowances are policy constants baked into deployed vaults.
//! They are not estimates.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::PolicyError;
use crate::config::{
    STANDARD_COVENANT_FEE, STANDARD_PAYOUT_FEE, TIMELOCK_COVENANT_FEE, TIMELOCK_PAYOUT_FEE,
};
use crate::transaction::TransactionContext;
use crate::value::{above_dust, LockingCommitment, TxOutput};

/// Covenant-leg and payout-leg fee allowances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAllowance {
    /// Subtracted before deciding whether the vault continues.
    pub covenant: u64,
    /// How far below `amount` the payout may land.
    pub payout: u64,
}

impl FeeAllowance {
    /// 500 / 300.
    pub const STANDARD: FeeAllowance = FeeAllowance {
        covenant: STANDARD_COVENANT_FEE,
        payout: STANDARD_PAYOUT_FEE,
    };

    /// 1000 / 500, for time-locked and recurring spends.
    pub const TIMELOCKED: FeeAllowance = FeeAllowance {
        covenant: TIMELOCK_COVENANT_FEE,
        payout: TIMELOCK_PAYOUT_FEE,
    };

    /// Lowest acceptable payout for `amount`.
    pub fn payout_floor(&self, amount: u64) -> u64 {
        amount.saturating_sub(self.payout)
    }
}

/// Which shape the outputs of a vault spend must take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "branch", rename_all = "snake_case")]
pub enum CovenantBranch {
    /// Vault continues with at least `remaining`.
    Continue { remaining: u64 },
    /// Vault is fully drained into the payout.
    Drain,
}

impl CovenantBranch {
    pub fn expected_outputs(&self) -> usize {
        match self {
            CovenantBranch::Continue { .. } => 2,
            CovenantBranch::Drain => 1,
        }
    }

    /// Index of the payout output.
    pub fn payout_index(&self) -> usize {
        self.expected_outputs() - 1
    }
}

/// Decide the branch for a spend. Shared by predicates and the builder so
/// both always agree.
pub fn covenant_branch(input_value: u64, amount: u64, fee: FeeAllowance) -> CovenantBranch {
    let remaining = input_value as i128 - amount as i128 - fee.covenant as i128;
    if above_dust(remaining) {
        // above_dust guarantees 546 < remaining <= u64::MAX
        CovenantBranch::Continue {
            remaining: remaining as u64,
        }
    } else {
        CovenantBranch::Drain
    }
}

fn require_output(
    outputs: &[TxOutput],
    index: usize,
    commitment: &LockingCommitment,
    min_value: u64,
    mismatch: PolicyError,
) -> Result<(), PolicyError> {
    let out = outputs
        .get(index)
        .ok_or(PolicyError::UnexpectedOutputCount {
            expected: index + 1,
            actual: outputs.len(),
        })?;
    if out.commitment != *commitment {
        return Err(mismatch);
    }
    if out.value < min_value {
        return Err(PolicyError::OutputValueTooLow {
            index,
            required: min_value,
            actual: out.value,
        });
    }
    Ok(())
}

/// Check the outputs of a payout of `amount` to `destination` from the
/// active input. Returns the branch that was enforced.
pub fn check_continuity(
    ctx: &TransactionContext<'_>,
    amount: u64,
    destination: &LockingCommitment,
    fee: FeeAllowance,
) -> Result<CovenantBranch, PolicyError> {
    if amount == 0 {
        return Err(PolicyError::ZeroAmount);
    }
    let branch = covenant_branch(ctx.active_value(), amount, fee);
    let outputs = ctx.outputs();
    if outputs.len() != branch.expected_outputs() {
        return Err(PolicyError::UnexpectedOutputCount {
            expected: branch.expected_outputs(),
            actual: outputs.len(),
        });
    }

    if let CovenantBranch::Continue { remaining } = branch {
        require_output(
            outputs,
            0,
            ctx.active_commitment(),
            remaining,
            PolicyError::CovenantMismatch { index: 0 },
        )?;
    }
    let payout = branch.payout_index();
    require_output(
        outputs,
        payout,
        destination,
        fee.payout_floor(amount),
        PolicyError::DestinationMismatch { index: payout },
    )?;

    debug!(?branch, amount, "covenant continuity holds");
    Ok(branch)
}

/// Output 0 must reproduce the active input's commitment byte for byte.
pub fn check_commitment_preserved(ctx: &TransactionContext<'_>) -> Result<(), PolicyError> {
    let out = ctx.output(0).ok_or(PolicyError::NoOutputs)?;
    if out.commitment != *ctx.active_commitment() {
        return Err(PolicyError::CovenantMismatch { index: 0 });
    }
    Ok(())
}

/// Permissionless top-up: the vault continues on output 0 with strictly
/// more value than it had.
pub fn check_deposit(ctx: &TransactionContext<'_>) -> Result<(), PolicyError> {
    check_commitment_preserved(ctx)?;
    let input = ctx.active_value();
    let output = ctx.output(0).map(|o| o.value).unwrap_or_default();
    if output <= input {
        return Err(PolicyError::DepositNotIncreasing { input, output });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PubkeyHash;
    use crate::transaction::{AuthorizationWitness, ChainTip, TransactionProposal, TxInput};
    use crate::value::{OutPoint, Utxo};

    fn vault() -> LockingCommitment {
        LockingCommitment::vault(&[0x44; 32])
    }

    fn dest() -> LockingCommitment {
        LockingCommitment::p2pkh(&PubkeyHash::from_bytes([0x99; 20]))
    }

    fn proposal(input: u64, outputs: Vec<TxOutput>) -> TransactionProposal {
        TransactionProposal::new(
            vec![TxInput::with_witness(
                Utxo::new(OutPoint::new([7; 32], 0), TxOutput::new(input, vault())),
                AuthorizationWitness::new(0),
            )],
            outputs,
            0,
        )
    }

    fn check(p: &TransactionProposal, amount: u64) -> Result<CovenantBranch, PolicyError> {
        let ctx = TransactionContext::new(p, 0, ChainTip::default())?;
        check_continuity(&ctx, amount, &dest(), FeeAllowance::STANDARD)
    }

    #[test]
    fn branch_split_at_dust() {
        // 1_000_000 - 200_000 - 500
        assert_eq!(
            covenant_branch(1_000_000, 200_000, FeeAllowance::STANDARD),
            CovenantBranch::Continue { remaining: 799_500 }
        );
        assert_eq!(
            covenant_branch(1_000_000, 999_900, FeeAllowance::STANDARD),
            CovenantBranch::Drain
        );
        // remaining exactly 546 drains, 547 continues
        assert_eq!(
            covenant_branch(1_046, 0, FeeAllowance::STANDARD),
            CovenantBranch::Drain
        );
        assert_eq!(
            covenant_branch(1_047, 0, FeeAllowance::STANDARD),
            CovenantBranch::Continue { remaining: 547 }
        );
    }

    #[test]
    fn amount_above_input_drains_without_wrapping() {
        assert_eq!(
            covenant_branch(1_000, u64::MAX, FeeAllowance::TIMELOCKED),
            CovenantBranch::Drain
        );
    }

    #[test]
    fn two_output_continuation_accepts_at_floors() {
        let p = proposal(
            1_000_000,
            vec![TxOutput::new(799_500, vault()), TxOutput::new(199_700, dest())],
        );
        assert_eq!(check(&p, 200_000), Ok(CovenantBranch::Continue { remaining: 799_500 }));
    }

    #[test]
    fn one_satoshi_short_on_either_leg_rejects() {
        let p = proposal(
            1_000_000,
            vec![TxOutput::new(799_499, vault()), TxOutput::new(199_700, dest())],
        );
        assert!(matches!(
            check(&p, 200_000),
            Err(PolicyError::OutputValueTooLow { index: 0, .. })
        ));

        let p = proposal(
            1_000_000,
            vec![TxOutput::new(799_500, vault()), TxOutput::new(199_699, dest())],
        );
        assert!(matches!(
            check(&p, 200_000),
            Err(PolicyError::OutputValueTooLow { index: 1, .. })
        ));
    }

    #[test]
    fn drain_requires_exactly_one_output() {
        let ok = proposal(1_000_000, vec![TxOutput::new(999_600, dest())]);
        assert_eq!(check(&ok, 999_900), Ok(CovenantBranch::Drain));

        let extra = proposal(
            1_000_000,
            vec![TxOutput::new(999_600, dest()), TxOutput::new(100, vault())],
        );
        assert_eq!(
            check(&extra, 999_900),
            Err(PolicyError::UnexpectedOutputCount {
                expected: 1,
                actual: 2
            })
        );
    }

    #[test]
    fn wrong_covenant_commitment_rejects() {
        let p = proposal(
            1_000_000,
            vec![
                TxOutput::new(799_500, LockingCommitment::vault(&[0x45; 32])),
                TxOutput::new(199_700, dest()),
            ],
        );
        assert_eq!(check(&p, 200_000), Err(PolicyError::CovenantMismatch { index: 0 }));
    }

    #[test]
    fn wrong_destination_rejects() {
        let p = proposal(
            1_000_000,
            vec![TxOutput::new(799_500, vault()), TxOutput::new(199_700, vault())],
        );
        assert_eq!(
            check(&p, 200_000),
            Err(PolicyError::DestinationMismatch { index: 1 })
        );
    }

    #[test]
    fn zero_amount_rejects() {
        let p = proposal(1_000_000, vec![TxOutput::new(999_000, vault())]);
        assert_eq!(check(&p, 0), Err(PolicyError::ZeroAmount));
    }

    #[test]
    fn deposit_must_strictly_increase() {
        let p = proposal(10_000, vec![TxOutput::new(10_000, vault())]);
        let ctx = TransactionContext::new(&p, 0, ChainTip::default()).unwrap();
        assert_eq!(
            check_deposit(&ctx),
            Err(PolicyError::DepositNotIncreasing {
                input: 10_000,
                output: 10_000
            })
        );

        let p = proposal(10_000, vec![TxOutput::new(10_001, vault())]);
        let ctx = TransactionContext::new(&p, 0, ChainTip::default()).unwrap();
        assert!(check_deposit(&ctx).is_ok());
    }
}
