//! Token fields attached to outputs.
//!
//! An output may carry one token category with a fungible amount, a
//! non-fungible commitment, or both. Vaults use categories as access
//! credentials: holding a token of the right category unlocks a spend path.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::TOKEN_CATEGORY_LENGTH;

/// A 32-byte token category identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenCategory(
    #[serde(with = "crate::serde_hex::array")] pub [u8; TOKEN_CATEGORY_LENGTH],
);

impl TokenCategory {
    pub fn from_bytes(bytes: [u8; TOKEN_CATEGORY_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; TOKEN_CATEGORY_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TokenCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for TokenCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenCategory({}..)", &self.to_hex()[..16])
    }
}

/// Token data carried by an output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    pub category: TokenCategory,
    /// Fungible amount. Zero for a pure NFT.
    #[serde(default)]
    pub amount: u64,
    /// Non-fungible commitment, if the output carries an NFT.
    #[serde(default, with = "crate::serde_hex::option_vec")]
    pub nft_commitment: Option<Vec<u8>>,
}

impl TokenData {
    pub fn fungible(category: TokenCategory, amount: u64) -> Self {
        Self {
            category,
            amount,
            nft_commitment: None,
        }
    }

    pub fn non_fungible(category: TokenCategory, commitment: Vec<u8>) -> Self {
        Self {
            category,
            amount: 0,
            nft_commitment: Some(commitment),
        }
    }

    /// An NFT with a non-empty commitment: the marker of a unique token as
    /// opposed to a purely fungible balance.
    pub fn has_unique_commitment(&self) -> bool {
        self.nft_commitment.as_ref().is_some_and(|c| !c.is_empty())
    }
}
