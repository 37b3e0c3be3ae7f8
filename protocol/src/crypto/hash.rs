//! # Hashing Utilities
//!
//! SHA-256 in three shapes:
//!
//! - [`sha256`] / [`double_sha256`] — plain digests.
//! - [`tagged_hash`] — domain-separated digest (BIP-340 style) so a signing
//!   digest can never collide with a vault template hash.
//! - [`hash160`] — the 20-byte public-key hash embedded in P2PKH commitments
//!   and vault signer slots. Computed as the first 20 bytes of
//!   double-SHA-256.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::config::PUBKEY_HASH_LENGTH;

/// Compute the SHA-256 hash of the input data.
///
/// ```
/// use vaultline_protocol::crypto::sha256;
///
/// let hash = sha256(b"vaultline");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute `SHA-256(SHA-256(data))`.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Domain-separated SHA-256: `SHA-256(SHA-256(tag) || SHA-256(tag) || data)`.
pub fn tagged_hash(tag: &str, data: &[u8]) -> [u8; 32] {
    let tag_hash = sha256(tag.as_bytes());
    let mut hasher = Sha256::new();
    hasher.update(tag_hash);
    hasher.update(tag_hash);
    hasher.update(data);
    hasher.finalize().into()
}

/// The 20-byte public-key hash.
pub fn hash160(data: &[u8]) -> PubkeyHash {
    let digest = double_sha256(data);
    let mut out = [0u8; PUBKEY_HASH_LENGTH];
    out.copy_from_slice(&digest[..PUBKEY_HASH_LENGTH]);
    PubkeyHash(out)
}

// ---------------------------------------------------------------------------
// PubkeyHash
// ---------------------------------------------------------------------------

/// A 20-byte public-key hash.
///
/// The all-zero hash is reserved: in a vault signer slot it marks the slot
/// as disabled. No real key hashes to it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PubkeyHash(#[serde(with = "crate::serde_hex::array")] pub [u8; PUBKEY_HASH_LENGTH]);

impl PubkeyHash {
    /// The disabled-slot marker.
    pub const ZERO: PubkeyHash = PubkeyHash([0u8; PUBKEY_HASH_LENGTH]);

    pub fn from_bytes(bytes: [u8; PUBKEY_HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBKEY_HASH_LENGTH] {
        &self.0
    }

    /// Returns `true` for the all-zero disabled marker.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; PUBKEY_HASH_LENGTH]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for PubkeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PubkeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PubkeyHash({})", self.to_hex())
    }
}
