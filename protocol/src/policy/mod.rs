//! # Policy Primitives
//!
//! The reusable checks every vault predicate is composed from. Each one is
//! a pure function over a [`crate::transaction::TransactionContext`] (or the
//! scalars pulled from it) returning `Result<_, PolicyError>`. A predicate
//! chains them with `?`, so the first failing check aborts the evaluation
//! and names itself.
//!
//! ```text
//! mask.rs       — SignerMask bitset and SignerSlot
//! multisig.rs   — threshold, all-signer and single-signer authorization
//! timelock.rs   — locktime gate
//! cap.rs        — flat per-spend ceiling
//! covenant.rs   — covenant continuity, commitment preservation, deposits
//! token_gate.rs — token-category gate
//! error.rs      — PolicyError and FailureClass
//! ```

pub mod cap;
pub mod covenant;
pub mod error;
pub mod mask;
pub mod multisig;
pub mod timelock;
pub mod token_gate;

pub use cap::check_spending_cap;
pub use covenant::{
    check_commitment_preserved, check_continuity, check_deposit, covenant_branch, CovenantBranch,
    FeeAllowance,
};
pub use error::{FailureClass, PolicyError};
pub use mask::{SignerMask, SignerSlot};
pub use multisig::{check_all_signers, check_multisig, check_single_signer};
pub use timelock::{check_time_gate, is_height_locktime};
pub use token_gate::{check_token_gate, TokenGate, TokenRequirement};
