//! Locking commitments.
//!
//! A commitment is the opaque byte pattern an output carries. Two layouts
//! matter here:
//!
//! - P2PKH: `76 a9 14 <20-byte key hash> 88 ac` (25 bytes).
//! - Vault: `aa 20 <32-byte template hash> 87` (35 bytes).
//!
//! Covenant checks compare commitments with plain byte equality. Nothing is
//! re-derived at evaluation time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{
    P2PKH_LENGTH, P2PKH_PREFIX, P2PKH_SUFFIX, PUBKEY_HASH_LENGTH, VAULT_COMMITMENT_LENGTH,
    VAULT_COMMITMENT_PREFIX, VAULT_COMMITMENT_SUFFIX,
};
use crate::crypto::PubkeyHash;

/// The locking bytecode of an output.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockingCommitment(#[serde(with = "crate::serde_hex::vec")] Vec<u8>);

impl LockingCommitment {
    /// Wrap arbitrary bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Standard pay-to-public-key-hash commitment.
    pub fn p2pkh(hash: &PubkeyHash) -> Self {
        let mut bytes = Vec::with_capacity(P2PKH_LENGTH);
        bytes.extend_from_slice(&P2PKH_PREFIX);
        bytes.extend_from_slice(hash.as_bytes());
        bytes.extend_from_slice(&P2PKH_SUFFIX);
        Self(bytes)
    }

    /// Vault commitment over a 32-byte template hash.
    pub fn vault(template_hash: &[u8; 32]) -> Self {
        let mut bytes = Vec::with_capacity(VAULT_COMMITMENT_LENGTH);
        bytes.extend_from_slice(&VAULT_COMMITMENT_PREFIX);
        bytes.extend_from_slice(template_hash);
        bytes.extend_from_slice(&VAULT_COMMITMENT_SUFFIX);
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        Ok(Self(hex::decode(s)?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The key hash inside a well-formed P2PKH commitment.
    pub fn p2pkh_hash(&self) -> Option<PubkeyHash> {
        if self.0.len() != P2PKH_LENGTH
            || self.0[..3] != P2PKH_PREFIX
            || self.0[P2PKH_LENGTH - 2..] != P2PKH_SUFFIX
        {
            return None;
        }
        let mut hash = [0u8; PUBKEY_HASH_LENGTH];
        hash.copy_from_slice(&self.0[3..3 + PUBKEY_HASH_LENGTH]);
        Some(PubkeyHash::from_bytes(hash))
    }

    pub fn is_p2pkh(&self) -> bool {
        self.p2pkh_hash().is_some()
    }

    pub fn is_vault(&self) -> bool {
        self.0.len() == VAULT_COMMITMENT_LENGTH
            && self.0[..2] == VAULT_COMMITMENT_PREFIX
            && self.0[VAULT_COMMITMENT_LENGTH - 1..] == VAULT_COMMITMENT_SUFFIX
    }

    /// `true` when this commitment pays exactly the given key hash.
    pub fn pays_to(&self, hash: &PubkeyHash) -> bool {
        self.p2pkh_hash().as_ref() == Some(hash)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for LockingCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for LockingCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LockingCommitment({})", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p2pkh_is_25_bytes_with_fixed_frame() {
        let hash = PubkeyHash::from_bytes([0x11; 20]);
        let c = LockingCommitment::p2pkh(&hash);
        assert_eq!(c.len(), 25);
        assert_eq!(&c.as_bytes()[..3], &[0x76, 0xa9, 0x14]);
        assert_eq!(&c.as_bytes()[23..], &[0x88, 0xac]);
        assert_eq!(c.p2pkh_hash(), Some(hash));
        assert!(c.pays_to(&hash));
        assert!(!c.is_vault());
    }

    #[test]
    fn vault_commitment_layout() {
        let c = LockingCommitment::vault(&[0x22; 32]);
        assert_eq!(c.len(), 35);
        assert!(c.is_vault());
        assert!(!c.is_p2pkh());
    }

    #[test]
    fn malformed_p2pkh_has_no_hash() {
        let mut bytes = LockingCommitment::p2pkh(&PubkeyHash::from_bytes([1; 20]))
            .as_bytes()
            .to_vec();
        bytes[24] = 0xad;
        assert_eq!(LockingCommitment::new(bytes).p2pkh_hash(), None);
        assert_eq!(LockingCommitment::new(vec![0x76]).p2pkh_hash(), None);
    }

    #[test]
    fn hex_roundtrip() {
        let c = LockingCommitment::vault(&[0xab; 32]);
        assert_eq!(LockingCommitment::from_hex(&c.to_hex()).unwrap(), c);
    }
}
