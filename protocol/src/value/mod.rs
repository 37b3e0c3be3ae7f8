//! # Value & UTXO Model
//!
//! Amounts are `u64` satoshis. Sums are taken in `u128` so that adding up
//! a hostile list of outputs can never wrap.
//!
//! ```text
//! commitment.rs — LockingCommitment (P2PKH and vault layouts)
//! token.rs      — TokenCategory and the optional token fields of an output
//! utxo.rs       — OutPoint, TxOutput, Utxo
//! ```

pub mod commitment;
pub mod token;
pub mod utxo;

pub use commitment::LockingCommitment;
pub use token::{TokenCategory, TokenData};
pub use utxo::{OutPoint, TxOutput, Utxo};

use crate::config::DUST_THRESHOLD;

/// Sum a list of amounts without overflow.
pub fn total(values: &[u64]) -> u128 {
    values.iter().map(|v| *v as u128).sum()
}

/// Value conservation: `sum(inputs) == sum(outputs) + fee` with `fee >= 0`.
pub fn conserves(inputs: &[u64], outputs: &[u64], fee: i64) -> bool {
    if fee < 0 {
        return false;
    }
    total(inputs) == total(outputs) + fee as u128
}

/// The fee a transaction implicitly pays, or `None` when outputs exceed
/// inputs (value would be created from nothing).
pub fn implied_fee(inputs: &[u64], outputs: &[u64]) -> Option<u64> {
    let fee = total(inputs).checked_sub(total(outputs))?;
    u64::try_from(fee).ok()
}

/// `true` when `value` is strictly above the dust threshold. Accepts signed
/// input because covenant residuals can go negative.
pub fn above_dust(value: i128) -> bool {
    value > DUST_THRESHOLD as i128
}
