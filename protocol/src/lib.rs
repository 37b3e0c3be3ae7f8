// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Vaultline Protocol — Core Library
//!
//! Vaultline vaults are spending policies over UTXOs: a vault is a predicate,
//! fixed at creation time, that a transaction spending the vault's coins must
//! satisfy. This crate holds everything that is independent of any single
//! vault policy:
//!
//! - **value** — amounts, locking commitments, token fields, UTXOs, and the
//!   conservation/dust rules every policy leans on.
//! - **policy** — the reusable checks vaults are composed from: signer-mask
//!   multisig, time-gate, spending-cap, token-category gate, and
//!   covenant-continuity.
//! - **transaction** — the proposal model, the per-input evaluation context,
//!   canonical encoding and signing digests, and the fee-converging builder.
//! - **funds** — the collaborator seams for UTXO queries and broadcast.
//! - **crypto** — Ed25519 keys and the SHA-256 based hashes used on-chain.
//! - **config** — every protocol constant, in one place.
//!
//! The concrete vault predicates live in `vaultline-contracts`.
//!
//! ## Design Philosophy
//!
//! 1. Evaluation is a pure function of the proposal and the vault config.
//! 2. Monetary arithmetic is checked. A one-satoshi error is a real bug.
//! 3. Every failed check names itself; nothing is partially applied.

pub mod config;
pub mod crypto;
pub mod funds;
pub mod policy;
pub mod serde_hex;
pub mod transaction;
pub mod value;
