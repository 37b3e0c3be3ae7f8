//! # Cryptographic Primitives
//!
//! Thin, typed wrappers around audited implementations:
//!
//! - **Ed25519** (`ed25519-dalek`) for signer authorization.
//! - **SHA-256** (`sha2`) for signing digests, vault template hashes and
//!   the 20-byte public-key hash that P2PKH commitments carry.
//!
//! Predicates only ever *verify*. Signing lives here for the wallet side and
//! for tests.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{double_sha256, hash160, sha256, tagged_hash, PubkeyHash};
pub use keys::{KeyError, VaultKeypair, VaultPublicKey, VaultSignature};
pub use signatures::{sign, verify};
