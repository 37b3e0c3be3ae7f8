//! # Digital Signatures
//!
//! Free-function entry points for signing and verification. Predicates call
//! [`verify`]; the wallet side (and tests) call [`sign`].

use super::keys::{VaultKeypair, VaultPublicKey, VaultSignature};

/// Sign a message with a signer keypair.
///
/// ```
/// use vaultline_protocol::crypto::{sign, verify, VaultKeypair};
///
/// let kp = VaultKeypair::generate();
/// let sig = sign(&kp, b"digest");
/// assert!(verify(&kp.public_key(), b"digest", &sig));
/// ```
pub fn sign(keypair: &VaultKeypair, message: &[u8]) -> VaultSignature {
    keypair.sign(message)
}

/// Verify a signature. `false` covers every failure mode on purpose.
pub fn verify(public_key: &VaultPublicKey, message: &[u8], signature: &VaultSignature) -> bool {
    public_key.verify(message, signature)
}

/// Verify several (key, message, signature) triples; all must hold.
pub fn verify_all(items: &[(VaultPublicKey, Vec<u8>, VaultSignature)]) -> bool {
    items
        .iter()
        .all(|(pk, msg, sig)| verify(pk, msg, sig))
}
