//! # Transaction Module
//!
//! The proposal model vault predicates evaluate, and the machinery around
//! it: canonical encoding, signing digests, the per-input evaluation
//! context, structural verification and the fee-converging builder.
//!
//! ## Architecture
//!
//! ```text
//! types.rs        — TransactionProposal, TxInput, Unlocking
//! witness.rs      — AuthorizationWitness, SignerProof, ConfigUpdate
//! encoding.rs     — canonical bytes, txid, signing digest
//! context.rs      — TransactionContext (introspection view) and ChainTip
//! builder.rs      — SpendDraft and the bounded fee-convergence loop
//! signing.rs      — wallet-side helpers that fill signer slots
//! verification.rs — structural checks and P2PKH input checks
//! ```
//!
//! ## Proposal Lifecycle
//!
//! 1. **Plan** — a vault function is turned into a [`SpendDraft`].
//! 2. **Build** — [`build_transaction`] converges the fee and returns an
//!    unsigned [`TransactionProposal`].
//! 3. **Sign** — the wallet layer fills signer slots with
//!    [`sign_vault_input`] / [`sign_p2pkh_input`].
//! 4. **Verify** — the dispatcher in `vaultline-contracts` evaluates every
//!    vault input.
//! 5. **Submit** — a [`crate::funds::Broadcaster`] takes it from there.
//!
//! ## Design Decisions
//!
//! - Transaction ids are `double_sha256` of the full canonical encoding.
//! - Signing digests exclude every signature, so signer slots can be filled
//!   in any order, but include every output byte. Changing any output after
//!   signing invalidates every signature.
//! - Amounts are `u64` satoshis. No floating point near money.

pub mod builder;
pub mod context;
pub mod encoding;
pub mod signing;
pub mod types;
pub mod verification;
pub mod witness;

pub use builder::{
    build_transaction, BuildError, BuiltTransaction, PendingSignature, PlannedOutput, SpendDraft,
};
pub use context::{ChainTip, TransactionContext};
pub use signing::{sign_p2pkh_input, sign_vault_input, SigningError};
pub use types::{TransactionProposal, TxInput, Unlocking};
pub use verification::{verify_p2pkh_input, verify_structure};
pub use witness::{AuthorizationWitness, ConfigUpdate, SignerProof};
