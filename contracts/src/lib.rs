//! # Vaultline Vault Contracts
//!
//! The eight vault policies, their selector tables, and the glue that turns
//! a proposal into a verdict or a spend request into a proposal:
//!
//! - **vault** — vault definitions, validation, commitments and successors.
//! - **function** — spending functions and the per-kind selector tables.
//! - **basic / multisig / timelock / spending_cap / recurring /
//!   token_gated / whitelist / master** — one predicate module per policy.
//! - **dispatch** — selector dispatch and whole-proposal verification.
//! - **registry** — commitment to vault lookup.
//! - **planner** — output layout and pending signatures for the builder.
//!
//! ## Design Principles
//!
//! 1. A predicate is a chain of policy primitives joined by `?`. The first
//!    failing check rejects and names itself.
//! 2. The planner and the predicates derive output shapes from the same
//!    functions, so a built spend always matches its predicate.
//! 3. A vault never mutates. Changes are successor vaults with new
//!    commitments.

pub mod basic;
pub mod dispatch;
pub mod function;
pub mod master;
pub mod multisig;
pub mod planner;
pub mod recurring;
pub mod registry;
pub mod spending_cap;
pub mod timelock;
pub mod token_gated;
pub mod vault;
pub mod whitelist;

#[cfg(test)]
mod test_support;

pub use dispatch::{evaluate, verify_proposal, Evaluation};
pub use function::SpendFunction;
pub use planner::{plan, plan_and_build, selection_target, BuildRequest};
pub use registry::VaultRegistry;
pub use vault::{RecurringPayment, Vault, VaultConfig, VaultError, VaultKind};
