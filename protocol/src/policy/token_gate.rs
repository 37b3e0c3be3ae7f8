//! Token-category gate.
//!
//! A designated input must hold a token of the required category, and
//! output 0 must carry that category forward so the credential is never
//! burned by the spend it authorizes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::PolicyError;
use crate::transaction::TransactionContext;
use crate::value::TokenCategory;

/// What the designated input's token must additionally satisfy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TokenGate {
    /// Category match only.
    #[default]
    Category,
    /// Category match plus a non-empty NFT commitment.
    UniqueNft,
    /// Category match plus at least `amount` fungible units.
    MinFungible { amount: u64 },
}

/// The token a vault spend path is gated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequirement {
    pub category: TokenCategory,
    #[serde(flatten)]
    pub gate: TokenGate,
}

impl TokenRequirement {
    pub fn category(category: TokenCategory) -> Self {
        Self {
            category,
            gate: TokenGate::Category,
        }
    }

    pub fn unique_nft(category: TokenCategory) -> Self {
        Self {
            category,
            gate: TokenGate::UniqueNft,
        }
    }

    pub fn min_fungible(category: TokenCategory, amount: u64) -> Self {
        Self {
            category,
            gate: TokenGate::MinFungible { amount },
        }
    }
}

/// Check the input at `token_input` against `requirement`, then check that
/// output 0 preserves the category.
pub fn check_token_gate(
    ctx: &TransactionContext<'_>,
    token_input: usize,
    requirement: &TokenRequirement,
) -> Result<(), PolicyError> {
    let input = ctx
        .input(token_input)
        .ok_or(PolicyError::InputIndexOutOfBounds {
            index: token_input,
            count: ctx.input_count(),
        })?;

    let token = input.utxo.token();
    let found = token.map(|t| t.category);
    let token = match token {
        Some(t) if t.category == requirement.category => t,
        _ => {
            return Err(PolicyError::TokenCategoryMismatch {
                expected: requirement.category,
                found,
            })
        }
    };

    match requirement.gate {
        TokenGate::Category => {}
        TokenGate::UniqueNft => {
            if !token.has_unique_commitment() {
                return Err(PolicyError::MissingUniqueCommitment);
            }
        }
        TokenGate::MinFungible { amount } => {
            if token.amount < amount {
                return Err(PolicyError::InsufficientTokenBalance {
                    required: amount,
                    found: token.amount,
                });
            }
        }
    }

    let preserved = ctx
        .output(0)
        .and_then(|o| o.token.as_ref())
        .is_some_and(|t| t.category == requirement.category);
    if !preserved {
        return Err(PolicyError::TokenNotPreserved);
    }

    debug!(token_input, category = %requirement.category, "token gate satisfied");
    Ok(())
}
