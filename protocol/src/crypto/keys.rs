//! # Key Management
//!
//! Ed25519 keypairs, public keys and signatures for vault signers.
//!
//! A vault never stores a public key. It stores the key's [`PubkeyHash`],
//! and a spender reveals the key alongside a signature. The predicate checks
//! `hash160(key) == configured hash` and then the signature.
//!
//! Key bytes are never logged. Debug output prints public material only.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::hash::{hash160, PubkeyHash};
use crate::config::{PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};

/// Errors that can occur during key operations.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes")]
    InvalidSecretKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,

    #[error("invalid signature bytes: expected 64 bytes")]
    InvalidSignature,
}

/// A signer keypair.
///
/// Deliberately not `Serialize`: exporting secret material should be an
/// explicit call to [`secret_key_bytes`](Self::secret_key_bytes).
pub struct VaultKeypair {
    signing_key: SigningKey,
}

/// The public half of a signer identity, revealed at spend time.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VaultPublicKey(#[serde(with = "crate::serde_hex::array")] [u8; PUBLIC_KEY_LENGTH]);

/// An Ed25519 signature.
///
/// Held as raw bytes so that a malformed signature can still be carried in a
/// witness and fail verification cleanly instead of failing to parse.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSignature(#[serde(with = "crate::serde_hex::vec")] Vec<u8>);

impl VaultKeypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic keypair from a 32-byte seed. Handy for fixtures.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Load a keypair from a hex-encoded 32-byte secret.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|_| KeyError::InvalidSecretKey)?;
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    pub fn public_key(&self) -> VaultPublicKey {
        VaultPublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Shorthand for `hash160(public_key)`, the value a vault slot stores.
    pub fn pubkey_hash(&self) -> PubkeyHash {
        self.public_key().pubkey_hash()
    }

    pub fn sign(&self, message: &[u8]) -> VaultSignature {
        VaultSignature(self.signing_key.sign(message).to_bytes().to_vec())
    }

    /// Raw 32-byte secret. Handle with care.
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl Clone for VaultKeypair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for VaultKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VaultKeypair(pub={})", self.public_key().to_hex())
    }
}

// ---------------------------------------------------------------------------
// VaultPublicKey
// ---------------------------------------------------------------------------

impl VaultPublicKey {
    /// Wrap raw bytes without point validation. Verification of an invalid
    /// point simply fails.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parse and validate that the bytes decode to an Ed25519 point.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; PUBLIC_KEY_LENGTH] =
            slice.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    pub fn pubkey_hash(&self) -> PubkeyHash {
        hash160(&self.0)
    }

    /// Strict Ed25519 verification. Any malformed input is just `false`.
    pub fn verify(&self, message: &[u8], signature: &VaultSignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let Some(sig) = signature.to_dalek_signature() else {
            return false;
        };
        verifying_key.verify_strict(message, &sig).is_ok()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for VaultPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for VaultPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VaultPublicKey({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// VaultSignature
// ---------------------------------------------------------------------------

impl VaultSignature {
    pub fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self(bytes.to_vec())
    }

    /// Accepts any byte string; only 64-byte values can ever verify.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_dalek_signature(&self) -> Option<DalekSignature> {
        let arr: [u8; SIGNATURE_LENGTH] = self.0.as_slice().try_into().ok()?;
        Some(DalekSignature::from_bytes(&arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for VaultSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        if hex_str.len() >= 16 {
            write!(f, "VaultSignature({}...)", &hex_str[..16])
        } else {
            write!(f, "VaultSignature({})", hex_str)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let kp = VaultKeypair::generate();
        let sig = kp.sign(b"spend 1000");
        assert!(kp.public_key().verify(b"spend 1000", &sig));
        assert!(!kp.public_key().verify(b"spend 1001", &sig));
    }

    #[test]
    fn seed_is_deterministic() {
        let a = VaultKeypair::from_seed(&[7u8; 32]);
        let b = VaultKeypair::from_seed(&[7u8; 32]);
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.pubkey_hash(), b.pubkey_hash());
    }

    #[test]
    fn hex_secret_roundtrip() {
        let kp = VaultKeypair::generate();
        let restored = VaultKeypair::from_hex(&hex::encode(kp.secret_key_bytes())).unwrap();
        assert_eq!(restored.public_key(), kp.public_key());
    }

    #[test]
    fn short_signature_fails_quietly() {
        let kp = VaultKeypair::generate();
        let sig = VaultSignature::from_slice(&[1, 2, 3]);
        assert!(!kp.public_key().verify(b"msg", &sig));
    }

    #[test]
    fn wrong_length_public_key_is_rejected() {
        assert!(VaultPublicKey::try_from_slice(&[0u8; 31]).is_err());
        let pk = VaultKeypair::generate().public_key();
        assert_eq!(VaultPublicKey::try_from_slice(pk.as_bytes()).unwrap(), pk);
    }

    #[test]
    fn debug_never_prints_secret() {
        let kp = VaultKeypair::from_seed(&[9u8; 32]);
        let dbg = format!("{:?}", kp);
        assert!(!dbg.contains(&hex::encode([9u8; 32])));
    }

    #[test]
    fn public_key_json_roundtrip() {
        let pk = VaultKeypair::generate().public_key();
        let json = serde_json::to_string(&pk).unwrap();
        let back: VaultPublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(pk, back);
    }
}
