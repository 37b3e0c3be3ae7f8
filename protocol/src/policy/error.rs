//! Policy failure taxonomy.
//!
//! Every check returns the first [`PolicyError`] it hits. Each variant
//! belongs to exactly one [`FailureClass`], so callers can report *which*
//! check failed and *what kind* of failure it was without string matching.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::value::TokenCategory;

/// Coarse classification of a rejected spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Signature or key-hash mismatch, or too few signers.
    Authorization,
    /// A configured rule said no: cap, time-gate, token gate, whitelist.
    PolicyViolation,
    /// The transaction itself is malformed for this policy.
    MalformedProposal,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authorization => write!(f, "authorization_failure"),
            Self::PolicyViolation => write!(f, "policy_violation"),
            Self::MalformedProposal => write!(f, "malformed_proposal"),
        }
    }
}

/// A failed policy check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    // -- Authorization ------------------------------------------------------
    /// A required signer slot carries no (key, signature) pair.
    #[error("missing signature for signer slot {slot}")]
    MissingSignature { slot: usize },

    /// The revealed key does not hash to the configured slot hash.
    #[error("public key does not match signer slot {slot}")]
    PubkeyMismatch { slot: usize },

    /// The signature does not verify over the signing digest.
    #[error("invalid signature for signer slot {slot}")]
    InvalidSignature { slot: usize },

    #[error("insufficient signers: {satisfied} satisfied, {threshold} required")]
    InsufficientSigners { satisfied: usize, threshold: usize },

    /// The vault has no enabled signer slots, so no all-signer path exists.
    #[error("no enabled signer slots configured")]
    NoEnabledSigners,

    /// A P2PKH input's unlocking data does not satisfy its commitment.
    #[error("input {index} is not authorized by its key hash")]
    UnauthorizedInput { index: usize },

    // -- Policy violations --------------------------------------------------
    #[error("amount {amount} exceeds per-spend cap {cap}")]
    AmountExceedsCap { amount: u64, cap: u64 },

    #[error("time lock not reached: locktime {locktime} < required {required}")]
    TimeLockNotReached { required: u32, locktime: u32 },

    /// The locktime is not final at the current chain tip.
    #[error("locktime {locktime} not final at chain tip {tip}")]
    LocktimeNotFinal { locktime: u32, tip: u32 },

    /// Height-based requirement against a time-based locktime, or vice versa.
    #[error("locktime {locktime} is in a different domain than required {required}")]
    LocktimeDomainMismatch { required: u32, locktime: u32 },

    #[error("token category mismatch: expected {expected}, found {found:?}")]
    TokenCategoryMismatch {
        expected: TokenCategory,
        found: Option<TokenCategory>,
    },

    #[error("access token carries no unique commitment")]
    MissingUniqueCommitment,

    #[error("insufficient token balance: {found} < {required}")]
    InsufficientTokenBalance { required: u64, found: u64 },

    /// Output 0 does not carry the gated token category forward.
    #[error("token category not preserved on output 0")]
    TokenNotPreserved,

    #[error("recipient is not whitelisted")]
    RecipientNotWhitelisted,

    #[error("signer is not the configured payee")]
    NotPayee,

    #[error("invalid configuration update: {reason}")]
    InvalidConfigUpdate { reason: String },

    // -- Malformed proposals ------------------------------------------------
    #[error("transaction has no inputs")]
    NoInputs,

    #[error("transaction has no outputs")]
    NoOutputs,

    #[error("input {index} spends an outpoint already spent by this transaction")]
    DuplicateInput { index: usize },

    #[error("output {index} has zero value")]
    ZeroValueOutput { index: usize },

    #[error("value not conserved: inputs {inputs} < outputs {outputs}")]
    ConservationViolated { inputs: u128, outputs: u128 },

    #[error("input index {index} out of bounds ({count} inputs)")]
    InputIndexOutOfBounds { index: usize, count: usize },

    #[error("expected {expected} outputs, found {actual}")]
    UnexpectedOutputCount { expected: usize, actual: usize },

    #[error("output {index} does not reproduce the vault commitment")]
    CovenantMismatch { index: usize },

    #[error("output {index} does not pay the destination")]
    DestinationMismatch { index: usize },

    #[error("output {index} value {actual} below required {required}")]
    OutputValueTooLow {
        index: usize,
        required: u64,
        actual: u64,
    },

    #[error("deposit must increase vault value: input {input}, output {output}")]
    DepositNotIncreasing { input: u64, output: u64 },

    #[error("spend amount must be positive")]
    ZeroAmount,

    #[error("selector {selector} out of range (vault has {count} functions)")]
    IllegalSelector { selector: u8, count: usize },

    #[error("illegal signer mask {mask:#010b}")]
    IllegalMask { mask: u8 },

    /// The input carries no vault witness, or a field the function needs.
    #[error("missing witness field: {field}")]
    MissingWitnessField { field: &'static str },

    /// The input is not locked by the vault being evaluated.
    #[error("input {index} is not locked by this vault")]
    ForeignInput { index: usize },

    /// The selector names a function whose configuration the vault lacks.
    #[error("function {function} is not configured on this vault")]
    FunctionDisabled { function: &'static str },
}

impl PolicyError {
    /// The failure class this error belongs to.
    pub fn class(&self) -> FailureClass {
        use PolicyError::*;
        match self {
            MissingSignature { .. }
            | PubkeyMismatch { .. }
            | InvalidSignature { .. }
            | InsufficientSigners { .. }
            | NoEnabledSigners
            | UnauthorizedInput { .. }
            | NotPayee => FailureClass::Authorization,

            AmountExceedsCap { .. }
            | TimeLockNotReached { .. }
            | LocktimeNotFinal { .. }
            | LocktimeDomainMismatch { .. }
            | TokenCategoryMismatch { .. }
            | MissingUniqueCommitment
            | InsufficientTokenBalance { .. }
            | TokenNotPreserved
            | RecipientNotWhitelisted
            | InvalidConfigUpdate { .. } => FailureClass::PolicyViolation,

            NoInputs
            | NoOutputs
            | DuplicateInput { .. }
            | ZeroValueOutput { .. }
            | ConservationViolated { .. }
            | InputIndexOutOfBounds { .. }
            | UnexpectedOutputCount { .. }
            | CovenantMismatch { .. }
            | DestinationMismatch { .. }
            | OutputValueTooLow { .. }
            | DepositNotIncreasing { .. }
            | ZeroAmount
            | IllegalSelector { .. }
            | IllegalMask { .. }
            | MissingWitnessField { .. }
            | ForeignInput { .. }
            | FunctionDisabled { .. } => FailureClass::MalformedProposal,
        }
    }
}
