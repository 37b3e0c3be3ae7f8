//! Time-gate.
//!
//! A nonzero unlock value pins the transaction's own locktime to at least
//! that value, in the same domain (block height below
//! [`LOCKTIME_THRESHOLD`], unix time at or above it), and requires the
//! locktime to be final at the chain tip.

use tracing::debug;

use super::error::PolicyError;
use crate::config::LOCKTIME_THRESHOLD;
use crate::transaction::ChainTip;

/// `true` when the value is a block height rather than a timestamp.
pub fn is_height_locktime(value: u32) -> bool {
    value < LOCKTIME_THRESHOLD
}

/// Enforce `required` against a transaction locktime and the chain tip.
/// `required == 0` disables the gate.
pub fn check_time_gate(required: u32, locktime: u32, tip: ChainTip) -> Result<(), PolicyError> {
    if required == 0 {
        return Ok(());
    }
    if is_height_locktime(required) != is_height_locktime(locktime) {
        return Err(PolicyError::LocktimeDomainMismatch { required, locktime });
    }
    if locktime < required {
        return Err(PolicyError::TimeLockNotReached { required, locktime });
    }

    let current = if is_height_locktime(locktime) {
        tip.height
    } else {
        tip.median_time
    };
    if current < locktime {
        return Err(PolicyError::LocktimeNotFinal {
            locktime,
            tip: current,
        });
    }
    debug!(required, locktime, current, "time gate open");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_disables_the_gate() {
        assert!(check_time_gate(0, 0, ChainTip::default()).is_ok());
    }

    #[test]
    fn boundary_is_inclusive() {
        assert!(check_time_gate(800_000, 800_000, ChainTip::at_height(800_000)).is_ok());
        assert!(check_time_gate(800_000, 800_000, ChainTip::at_height(800_001)).is_ok());
    }

    #[test]
    fn chain_one_block_short_rejects() {
        assert_eq!(
            check_time_gate(800_000, 800_000, ChainTip::at_height(799_999)),
            Err(PolicyError::LocktimeNotFinal {
                locktime: 800_000,
                tip: 799_999
            })
        );
    }

    #[test]
    fn locktime_below_requirement_rejects_even_on_a_late_chain() {
        assert_eq!(
            check_time_gate(800_000, 799_999, ChainTip::at_height(900_000)),
            Err(PolicyError::TimeLockNotReached {
                required: 800_000,
                locktime: 799_999
            })
        );
    }

    #[test]
    fn timestamp_locktime_cannot_satisfy_height_gate() {
        assert!(matches!(
            check_time_gate(800_000, 1_700_000_000, ChainTip::at_height(900_000)),
            Err(PolicyError::LocktimeDomainMismatch { .. })
        ));
    }

    #[test]
    fn time_domain_uses_median_time() {
        let tip = ChainTip {
            height: 10,
            median_time: 1_700_000_100,
        };
        assert!(check_time_gate(1_700_000_000, 1_700_000_050, tip).is_ok());
        assert!(check_time_gate(1_700_000_000, 1_700_000_200, tip).is_err());
    }
}
