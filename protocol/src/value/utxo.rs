//! Outputs, outpoints and unspent outputs.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::commitment::LockingCommitment;
use super::token::TokenData;

/// Reference to a specific output of a prior transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    #[serde(with = "crate::serde_hex::array")]
    pub txid: [u8; 32],
    pub vout: u32,
}

impl OutPoint {
    pub const fn new(txid: [u8; 32], vout: u32) -> Self {
        Self { txid, vout }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(self.txid), self.vout)
    }
}

impl fmt::Debug for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutPoint({}:{})", &hex::encode(self.txid)[..16], self.vout)
    }
}

/// A transaction output: value, locking commitment and optional token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: u64,
    pub commitment: LockingCommitment,
    #[serde(default)]
    pub token: Option<TokenData>,
}

impl TxOutput {
    pub fn new(value: u64, commitment: LockingCommitment) -> Self {
        Self {
            value,
            commitment,
            token: None,
        }
    }

    pub fn with_token(mut self, token: TokenData) -> Self {
        self.token = Some(token);
        self
    }
}

/// An unspent output, addressable by its outpoint.
///
/// Created by a prior transaction's output; consumed by exactly one later
/// input. The ledger enforces single-spend, not this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub outpoint: OutPoint,
    pub output: TxOutput,
}

impl Utxo {
    pub fn new(outpoint: OutPoint, output: TxOutput) -> Self {
        Self { outpoint, output }
    }

    pub fn value(&self) -> u64 {
        self.output.value
    }

    pub fn commitment(&self) -> &LockingCommitment {
        &self.output.commitment
    }

    pub fn token(&self) -> Option<&TokenData> {
        self.output.token.as_ref()
    }
}
