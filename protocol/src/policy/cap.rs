//! Spending cap.
//!
//! A flat ceiling per spend. There is no spent-so-far counter anywhere on
//! chain, so the cap never accumulates.

use super::error::PolicyError;

/// `cap == 0` disables the check.
pub fn check_spending_cap(amount: u64, cap: u64) -> Result<(), PolicyError> {
    if cap != 0 && amount > cap {
        return Err(PolicyError::AmountExceedsCap { amount, cap });
    }
    Ok(())
}
