//! Authorization witnesses.
//!
//! The unlocking data a spender attaches to a vault input: which function
//! to run (the selector), the (public key, signature) pair for each signer
//! slot that is asserting authorization, and the auxiliary scalars the
//! function reads. The core only ever verifies these; signatures are
//! produced by the wallet layer.

use serde::{Deserialize, Serialize};

use crate::config::MAX_SIGNER_SLOTS;
use crate::crypto::{VaultPublicKey, VaultSignature};
use crate::value::LockingCommitment;

/// A revealed public key and its signature over the signing digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerProof {
    pub public_key: VaultPublicKey,
    pub signature: VaultSignature,
}

/// New parameter values carried by an update-configuration spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub threshold: u8,
    pub spend_cap: u64,
    pub unlock_height: u32,
}

/// Unlocking data for a vault input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationWitness {
    /// Function selector, dispatched by the vault's selector table.
    pub selector: u8,
    /// Per-slot proofs; index `i` is signer slot `i + 1`.
    #[serde(default)]
    pub signers: [Option<SignerProof>; MAX_SIGNER_SLOTS],
    #[serde(default)]
    pub mask: Option<u8>,
    #[serde(default)]
    pub amount: Option<u64>,
    #[serde(default)]
    pub destination: Option<LockingCommitment>,
    /// Index of the input holding the access token (token-gated spends).
    #[serde(default)]
    pub token_input_index: Option<u32>,
    #[serde(default)]
    pub update: Option<ConfigUpdate>,
}

impl AuthorizationWitness {
    pub fn new(selector: u8) -> Self {
        Self {
            selector,
            ..Self::default()
        }
    }

    pub fn with_mask(mut self, mask: u8) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_amount(mut self, amount: u64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_destination(mut self, destination: LockingCommitment) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn with_token_input(mut self, index: u32) -> Self {
        self.token_input_index = Some(index);
        self
    }

    pub fn with_update(mut self, update: ConfigUpdate) -> Self {
        self.update = Some(update);
        self
    }

    /// The proof in a signer slot (0-based), if any.
    pub fn signer(&self, slot: usize) -> Option<&SignerProof> {
        self.signers.get(slot).and_then(|s| s.as_ref())
    }

    /// Number of slots that carry a proof.
    pub fn signature_count(&self) -> usize {
        self.signers.iter().filter(|s| s.is_some()).count()
    }

    /// Copy of this witness with every signer slot cleared. The signing
    /// digest commits to exactly this.
    pub fn without_signers(&self) -> Self {
        Self {
            signers: Default::default(),
            ..self.clone()
        }
    }
}
