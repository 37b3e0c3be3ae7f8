//! # Protocol Configuration & Constants
//!
//! Every magic number in Vaultline lives here. Vaults are deployed with
//! these values baked into their spending rules, so changing one after
//! deployment produces transactions the deployed vaults will reject.
//!
//! Fee allowances are policy constants, not estimates. They must match the
//! deployed instances byte for byte (well, satoshi for satoshi).

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Crate-level protocol version string, reported by the node.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Transaction format version written into every encoded proposal.
pub const TX_VERSION: u32 = 2;

// ---------------------------------------------------------------------------
// Value Rules
// ---------------------------------------------------------------------------

/// Outputs at or below this value are uneconomical to create. Policies fold
/// a residual at or below this into the payout instead of continuing the
/// vault with it.
pub const DUST_THRESHOLD: u64 = 546;

/// Upper bound on any single amount (21M coins in satoshis). Range checks on
/// configuration updates use this as the ceiling.
pub const MAX_MONEY: u64 = 21_000_000 * 100_000_000;

// ---------------------------------------------------------------------------
// Fee Allowances
// ---------------------------------------------------------------------------

/// Standard spends: allowance subtracted before deciding whether the vault
/// continues (the covenant leg).
pub const STANDARD_COVENANT_FEE: u64 = 500;

/// Standard spends: how far below the requested amount the payout may land.
pub const STANDARD_PAYOUT_FEE: u64 = 300;

/// Time-locked and recurring spends: covenant-leg allowance.
pub const TIMELOCK_COVENANT_FEE: u64 = 1_000;

/// Time-locked and recurring spends: payout-leg allowance.
pub const TIMELOCK_PAYOUT_FEE: u64 = 500;

/// Configuration updates may shave at most this much off the vault value.
pub const UPDATE_FEE_ALLOWANCE: u64 = 1_000;

// ---------------------------------------------------------------------------
// Signers
// ---------------------------------------------------------------------------

/// Number of signer slots a vault can configure.
pub const MAX_SIGNER_SLOTS: usize = 3;

/// Mask bits that correspond to a signer slot. Anything else is illegal.
pub const SIGNER_MASK_BITS: u8 = 0b0000_0111;

/// Length of a public-key hash (the 20-byte `hash160`).
pub const PUBKEY_HASH_LENGTH: usize = 20;

/// Ed25519 public key length.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Ed25519 signature length.
pub const SIGNATURE_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Locking Commitments
// ---------------------------------------------------------------------------

/// `OP_DUP OP_HASH160 <push 20>` — the pay-to-public-key-hash prefix.
pub const P2PKH_PREFIX: [u8; 3] = [0x76, 0xa9, 0x14];

/// `OP_EQUALVERIFY OP_CHECKSIG` — the pay-to-public-key-hash suffix.
pub const P2PKH_SUFFIX: [u8; 2] = [0x88, 0xac];

/// Total P2PKH commitment length: 3 + 20 + 2.
pub const P2PKH_LENGTH: usize = 25;

/// `OP_HASH256 <push 32>` — prefix of a vault (pay-to-script-hash-32) commitment.
pub const VAULT_COMMITMENT_PREFIX: [u8; 2] = [0xaa, 0x20];

/// `OP_EQUAL` — suffix of a vault commitment.
pub const VAULT_COMMITMENT_SUFFIX: [u8; 1] = [0x87];

/// Total vault commitment length: 2 + 32 + 1.
pub const VAULT_COMMITMENT_LENGTH: usize = 35;

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// Token categories are 32-byte identifiers.
pub const TOKEN_CATEGORY_LENGTH: usize = 32;

/// Marker byte that introduces token data ahead of an output's commitment.
pub const TOKEN_PREFIX: u8 = 0xef;

/// Longest non-fungible commitment an output may carry.
pub const MAX_NFT_COMMITMENT_LENGTH: usize = 40;

// ---------------------------------------------------------------------------
// Locktime
// ---------------------------------------------------------------------------

/// Locktime values below this are block heights; at or above, unix seconds.
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

// ---------------------------------------------------------------------------
// Hash Domains
// ---------------------------------------------------------------------------

/// Tag for the per-input signing digest.
pub const SIGHASH_TAG: &str = "vaultline/sighash/v1";

/// Tag for vault template hashing (commitment derivation).
pub const VAULT_TEMPLATE_TAG: &str = "vaultline/vault/v1";

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Default relay fee rate in satoshis per byte.
pub const DEFAULT_FEE_RATE: u64 = 1;

/// Fee estimation passes before the builder gives up. Each pass can change
/// the serialized size, so one pass is not always enough.
pub const MAX_FEE_ITERATIONS: usize = 4;

/// How many times a build-and-submit round is retried after losing a race
/// for an input.
pub const SUBMIT_RETRY_LIMIT: usize = 3;

/// Runtime knobs for the transaction builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderParams {
    /// Fee rate in satoshis per serialized byte.
    pub fee_rate: u64,
    /// Upper bound on fee-estimation passes.
    pub max_iterations: usize,
}

impl Default for BuilderParams {
    fn default() -> Self {
        Self {
            fee_rate: DEFAULT_FEE_RATE,
            max_iterations: MAX_FEE_ITERATIONS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p2pkh_layout_adds_up() {
        assert_eq!(
            P2PKH_PREFIX.len() + PUBKEY_HASH_LENGTH + P2PKH_SUFFIX.len(),
            P2PKH_LENGTH
        );
    }

    #[test]
    fn vault_layout_adds_up() {
        assert_eq!(
            VAULT_COMMITMENT_PREFIX.len() + 32 + VAULT_COMMITMENT_SUFFIX.len(),
            VAULT_COMMITMENT_LENGTH
        );
    }

    #[test]
    fn signer_mask_bits_cover_every_slot() {
        assert_eq!(SIGNER_MASK_BITS.count_ones() as usize, MAX_SIGNER_SLOTS);
    }

    #[test]
    fn builder_params_default() {
        let p = BuilderParams::default();
        assert_eq!(p.fee_rate, 1);
        assert_eq!(p.max_iterations, 4);
    }
}
