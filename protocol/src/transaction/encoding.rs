//! Canonical byte encoding.
//!
//! Deterministic, length-prefixed, little-endian. JSON is for transport;
//! these bytes are what sizes, transaction ids and signing digests are
//! computed over.
//!
//! ```text
//! tx      := version:u32 | n:cs | input* | m:cs | output* | locktime:u32
//! input   := txid:32 | vout:u32 | len:cs | unlocking | sequence:u32
//! output  := value:u64 | len:cs | [token_prefix] commitment
//! token   := 0xef | category:32 | bitfield:u8 | [len:cs nft] | [amount:cs]
//! ```
//!
//! `cs` is a Bitcoin-style compact size.

use super::types::{TransactionProposal, TxInput, Unlocking};
use super::witness::{AuthorizationWitness, SignerProof};
use crate::config::{SIGHASH_TAG, TOKEN_PREFIX};
use crate::crypto::{double_sha256, tagged_hash};
use crate::value::{TokenData, TxOutput};

/// Sequence number written for every input; enables locktime enforcement.
pub const DEFAULT_SEQUENCE: u32 = 0xffff_fffe;

const TOKEN_HAS_COMMITMENT_LENGTH: u8 = 0x40;
const TOKEN_HAS_NFT: u8 = 0x20;
const TOKEN_HAS_AMOUNT: u8 = 0x10;

/// Append a compact-size integer.
pub fn write_compact_size(buf: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => buf.push(n as u8),
        0xfd..=0xffff => {
            buf.push(0xfd);
            buf.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            buf.push(0xfe);
            buf.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xff);
            buf.extend_from_slice(&n.to_le_bytes());
        }
    }
}

fn write_var_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_compact_size(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Token prefix bytes for an output carrying token data.
pub fn encode_token_prefix(token: &TokenData) -> Vec<u8> {
    let mut buf = Vec::with_capacity(48);
    buf.push(TOKEN_PREFIX);
    buf.extend_from_slice(token.category.as_bytes());

    let mut bitfield = 0u8;
    if token.nft_commitment.is_some() {
        bitfield |= TOKEN_HAS_NFT;
    }
    if token.has_unique_commitment() {
        bitfield |= TOKEN_HAS_COMMITMENT_LENGTH;
    }
    if token.amount > 0 {
        bitfield |= TOKEN_HAS_AMOUNT;
    }
    buf.push(bitfield);

    if let Some(commitment) = token.nft_commitment.as_ref().filter(|c| !c.is_empty()) {
        write_var_bytes(&mut buf, commitment);
    }
    if token.amount > 0 {
        write_compact_size(&mut buf, token.amount);
    }
    buf
}

/// Encode a single output.
pub fn encode_output(buf: &mut Vec<u8>, output: &TxOutput) {
    buf.extend_from_slice(&output.value.to_le_bytes());
    let mut script = match &output.token {
        Some(token) => encode_token_prefix(token),
        None => Vec::new(),
    };
    script.extend_from_slice(output.commitment.as_bytes());
    write_var_bytes(buf, &script);
}

fn encode_signer(buf: &mut Vec<u8>, proof: Option<&SignerProof>) {
    match proof {
        None => buf.push(0x00),
        Some(p) => {
            buf.push(0x01);
            buf.extend_from_slice(p.public_key.as_bytes());
            write_var_bytes(buf, p.signature.as_bytes());
        }
    }
}

fn encode_witness(buf: &mut Vec<u8>, w: &AuthorizationWitness) {
    buf.push(w.selector);
    for slot in &w.signers {
        encode_signer(buf, slot.as_ref());
    }
    match w.mask {
        Some(m) => buf.extend_from_slice(&[0x01, m]),
        None => buf.push(0x00),
    }
    match w.amount {
        Some(a) => {
            buf.push(0x01);
            buf.extend_from_slice(&a.to_le_bytes());
        }
        None => buf.push(0x00),
    }
    match &w.destination {
        Some(d) => {
            buf.push(0x01);
            write_var_bytes(buf, d.as_bytes());
        }
        None => buf.push(0x00),
    }
    match w.token_input_index {
        Some(i) => {
            buf.push(0x01);
            buf.extend_from_slice(&i.to_le_bytes());
        }
        None => buf.push(0x00),
    }
    match &w.update {
        Some(u) => {
            buf.push(0x01);
            buf.push(u.threshold);
            buf.extend_from_slice(&u.spend_cap.to_le_bytes());
            buf.extend_from_slice(&u.unlock_height.to_le_bytes());
        }
        None => buf.push(0x00),
    }
}

/// Encode the unlocking data of an input (without its length prefix).
pub fn encode_unlocking(unlocking: &Unlocking) -> Vec<u8> {
    let mut buf = Vec::new();
    match unlocking {
        Unlocking::Empty => {}
        Unlocking::P2pkh {
            public_key,
            signature,
        } => {
            write_var_bytes(&mut buf, signature.as_bytes());
            write_var_bytes(&mut buf, public_key.as_bytes());
        }
        Unlocking::Vault(w) => encode_witness(&mut buf, w),
    }
    buf
}

fn encode_input(buf: &mut Vec<u8>, input: &TxInput, unlocking: &Unlocking) {
    buf.extend_from_slice(&input.utxo.outpoint.txid);
    buf.extend_from_slice(&input.utxo.outpoint.vout.to_le_bytes());
    write_var_bytes(buf, &encode_unlocking(unlocking));
    buf.extend_from_slice(&DEFAULT_SEQUENCE.to_le_bytes());
}

fn encode_with<F>(tx: &TransactionProposal, unlocking_for: F) -> Vec<u8>
where
    F: Fn(usize, &TxInput) -> Unlocking,
{
    let mut buf = Vec::with_capacity(256);
    buf.extend_from_slice(&tx.version.to_le_bytes());
    write_compact_size(&mut buf, tx.inputs.len() as u64);
    for (i, input) in tx.inputs.iter().enumerate() {
        encode_input(&mut buf, input, &unlocking_for(i, input));
    }
    write_compact_size(&mut buf, tx.outputs.len() as u64);
    for output in &tx.outputs {
        encode_output(&mut buf, output);
    }
    buf.extend_from_slice(&tx.locktime.to_le_bytes());
    buf
}

/// Full canonical encoding, unlocking data included.
pub fn encode(tx: &TransactionProposal) -> Vec<u8> {
    encode_with(tx, |_, input| input.unlocking.clone())
}

/// `double_sha256(encode(tx))`.
pub fn txid(tx: &TransactionProposal) -> [u8; 32] {
    double_sha256(&encode(tx))
}

/// The digest signers of `input_index` sign.
///
/// Commits to every input's outpoint, every output, the locktime, the
/// signed input's prevout value and commitment, and the signed input's
/// witness scalars (selector, mask, amount, destination, ...). Signatures
/// of every input are excluded, so slots can be signed in any order.
pub fn signing_digest(tx: &TransactionProposal, input_index: usize) -> Option<[u8; 32]> {
    let signed = tx.inputs.get(input_index)?;
    let mut preimage = encode_with(tx, |i, input| {
        if i == input_index {
            input.unlocking.committed()
        } else {
            Unlocking::Empty
        }
    });
    preimage.extend_from_slice(&(input_index as u32).to_le_bytes());
    encode_output(&mut preimage, &signed.utxo.output);
    Some(tagged_hash(SIGHASH_TAG, &preimage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{PubkeyHash, VaultKeypair};
    use crate::value::{LockingCommitment, OutPoint, TokenCategory, Utxo};

    fn proposal() -> TransactionProposal {
        let vault = LockingCommitment::vault(&[0x33; 32]);
        let input = TxInput::with_witness(
            Utxo::new(OutPoint::new([1; 32], 0), TxOutput::new(1_000_000, vault.clone())),
            AuthorizationWitness::new(0).with_amount(200_000),
        );
        TransactionProposal::new(
            vec![input],
            vec![
                TxOutput::new(799_500, vault),
                TxOutput::new(
                    199_700,
                    LockingCommitment::p2pkh(&PubkeyHash::from_bytes([9; 20])),
                ),
            ],
            800_000,
        )
    }

    #[test]
    fn compact_size_boundaries() {
        let cases: [(u64, usize); 6] = [
            (0, 1),
            (0xfc, 1),
            (0xfd, 3),
            (0xffff, 3),
            (0x1_0000, 5),
            (0x1_0000_0000, 9),
        ];
        for (n, len) in cases {
            let mut buf = Vec::new();
            write_compact_size(&mut buf, n);
            assert_eq!(buf.len(), len, "compact size of {n}");
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        assert_eq!(encode(&proposal()), encode(&proposal()));
        assert_eq!(txid(&proposal()), txid(&proposal()));
    }

    #[test]
    fn output_value_changes_encoding() {
        let a = proposal();
        let mut b = proposal();
        b.outputs[0].value += 1;
        assert_ne!(encode(&a), encode(&b));
    }

    #[test]
    fn digest_ignores_signatures() {
        let kp = VaultKeypair::generate();
        let unsigned = proposal();
        let before = signing_digest(&unsigned, 0).unwrap();

        let mut signed = unsigned.clone();
        signed.inputs[0].unlocking.witness_mut().unwrap().signers[0] = Some(SignerProof {
            public_key: kp.public_key(),
            signature: kp.sign(&before),
        });
        assert_eq!(signing_digest(&signed, 0).unwrap(), before);
        assert_ne!(encode(&signed), encode(&unsigned));
    }

    #[test]
    fn digest_commits_to_witness_scalars() {
        let a = proposal();
        let mut b = proposal();
        b.inputs[0].unlocking.witness_mut().unwrap().amount = Some(200_001);
        assert_ne!(signing_digest(&a, 0), signing_digest(&b, 0));
    }

    #[test]
    fn digest_out_of_bounds_is_none() {
        assert!(signing_digest(&proposal(), 1).is_none());
    }

    #[test]
    fn token_prefix_layout() {
        let cat = TokenCategory::from_bytes([0xcc; 32]);
        let ft = encode_token_prefix(&TokenData::fungible(cat, 100));
        assert_eq!(ft[0], TOKEN_PREFIX);
        assert_eq!(ft[33], TOKEN_HAS_AMOUNT);
        assert_eq!(ft.len(), 1 + 32 + 1 + 1);

        let nft = encode_token_prefix(&TokenData::non_fungible(cat, vec![1, 2, 3]));
        assert_eq!(nft[33], TOKEN_HAS_NFT | TOKEN_HAS_COMMITMENT_LENGTH);
        assert_eq!(&nft[34..], &[3, 1, 2, 3]);
    }
}
