//! Core transaction types.
//!
//! A [`TransactionProposal`] is a candidate transaction: the UTXOs it
//! consumes (with their full prevout data, so predicates can introspect
//! values, commitments and tokens), the outputs it creates, and its
//! locktime. Proposals travel as JSON between the builder, the wallet layer
//! and the verifier; the canonical byte encoding lives in
//! [`super::encoding`].

use serde::{Deserialize, Serialize};

use super::encoding;
use super::witness::AuthorizationWitness;
use crate::config::TX_VERSION;
use crate::crypto::{VaultPublicKey, VaultSignature};
use crate::value::{self, TxOutput, Utxo};

// ---------------------------------------------------------------------------
// Unlocking
// ---------------------------------------------------------------------------

/// Unlocking data attached to an input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Unlocking {
    /// Not yet unlocked (fresh from the builder, awaiting a signature).
    #[default]
    Empty,
    /// Plain pay-to-public-key-hash spend.
    P2pkh {
        public_key: VaultPublicKey,
        signature: VaultSignature,
    },
    /// Vault spend.
    Vault(AuthorizationWitness),
}

impl Unlocking {
    pub fn witness(&self) -> Option<&AuthorizationWitness> {
        match self {
            Unlocking::Vault(w) => Some(w),
            _ => None,
        }
    }

    pub fn witness_mut(&mut self) -> Option<&mut AuthorizationWitness> {
        match self {
            Unlocking::Vault(w) => Some(w),
            _ => None,
        }
    }

    /// The part of the unlocking data the signing digest commits to.
    /// Signatures themselves are stripped.
    pub fn committed(&self) -> Unlocking {
        match self {
            Unlocking::Vault(w) => Unlocking::Vault(w.without_signers()),
            _ => Unlocking::Empty,
        }
    }
}

// ---------------------------------------------------------------------------
// TxInput
// ---------------------------------------------------------------------------

/// An input: the UTXO being consumed plus its unlocking data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub utxo: Utxo,
    #[serde(default)]
    pub unlocking: Unlocking,
}

impl TxInput {
    pub fn new(utxo: Utxo) -> Self {
        Self {
            utxo,
            unlocking: Unlocking::Empty,
        }
    }

    pub fn with_witness(utxo: Utxo, witness: AuthorizationWitness) -> Self {
        Self {
            utxo,
            unlocking: Unlocking::Vault(witness),
        }
    }

    pub fn value(&self) -> u64 {
        self.utxo.value()
    }
}

// ---------------------------------------------------------------------------
// TransactionProposal
// ---------------------------------------------------------------------------

/// A candidate transaction.
///
/// Invariant (checked by [`super::verification::verify_structure`]):
/// `sum(inputs) >= sum(outputs)`; the difference is the fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionProposal {
    #[serde(default = "default_version")]
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    #[serde(default)]
    pub locktime: u32,
}

fn default_version() -> u32 {
    TX_VERSION
}

impl TransactionProposal {
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>, locktime: u32) -> Self {
        Self {
            version: TX_VERSION,
            inputs,
            outputs,
            locktime,
        }
    }

    pub fn input_values(&self) -> Vec<u64> {
        self.inputs.iter().map(TxInput::value).collect()
    }

    pub fn output_values(&self) -> Vec<u64> {
        self.outputs.iter().map(|o| o.value).collect()
    }

    /// The implied fee, or `None` when outputs exceed inputs.
    pub fn fee(&self) -> Option<u64> {
        value::implied_fee(&self.input_values(), &self.output_values())
    }

    /// Transaction id: double-SHA-256 of the full canonical encoding.
    pub fn txid(&self) -> [u8; 32] {
        encoding::txid(self)
    }

    /// Serialized size in bytes, the basis of fee estimation.
    pub fn encoded_len(&self) -> usize {
        encoding::encode(self).len()
    }

    /// The digest signers of input `input_index` sign. `None` when the
    /// index is out of bounds.
    pub fn signing_digest(&self, input_index: usize) -> Option<[u8; 32]> {
        encoding::signing_digest(self, input_index)
    }
}
