//! Signer masks.
//!
//! One byte, bit `i` ↔ signer slot `i + 1`. Bits above slot 3 are illegal and
//! a mask carrying them is rejected before anything else is looked at.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::PolicyError;
use crate::config::{MAX_SIGNER_SLOTS, SIGNER_MASK_BITS};

/// One of the three signer slots of a vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignerSlot {
    /// Slot 1, the primary owner.
    First,
    Second,
    Third,
}

impl SignerSlot {
    pub const ALL: [SignerSlot; MAX_SIGNER_SLOTS] =
        [SignerSlot::First, SignerSlot::Second, SignerSlot::Third];

    /// Zero-based index into per-slot arrays.
    pub const fn index(self) -> usize {
        match self {
            SignerSlot::First => 0,
            SignerSlot::Second => 1,
            SignerSlot::Third => 2,
        }
    }

    /// One-based slot number, as used in messages.
    pub const fn number(self) -> usize {
        self.index() + 1
    }

    pub const fn bit(self) -> u8 {
        1 << self.index()
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for SignerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}", self.number())
    }
}

/// A validated signer mask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SignerMask(u8);

impl SignerMask {
    pub const EMPTY: SignerMask = SignerMask(0);
    pub const ALL: SignerMask = SignerMask(SIGNER_MASK_BITS);

    /// Validate a raw byte. Any bit outside the three slot bits rejects.
    pub fn new(bits: u8) -> Result<Self, PolicyError> {
        if bits & !SIGNER_MASK_BITS != 0 {
            return Err(PolicyError::IllegalMask { mask: bits });
        }
        Ok(Self(bits))
    }

    pub fn from_slots(slots: &[SignerSlot]) -> Self {
        Self(slots.iter().fold(0, |acc, s| acc | s.bit()))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, slot: SignerSlot) -> bool {
        self.0 & slot.bit() != 0
    }

    pub fn with(self, slot: SignerSlot) -> Self {
        Self(self.0 | slot.bit())
    }

    pub fn without(self, slot: SignerSlot) -> Self {
        Self(self.0 & !slot.bit())
    }

    pub fn first(self) -> bool {
        self.contains(SignerSlot::First)
    }

    pub fn second(self) -> bool {
        self.contains(SignerSlot::Second)
    }

    pub fn third(self) -> bool {
        self.contains(SignerSlot::Third)
    }

    /// Number of slots named by the mask.
    pub fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Named slots in bit order.
    pub fn slots(self) -> impl Iterator<Item = SignerSlot> {
        SignerSlot::ALL.into_iter().filter(move |s| self.contains(*s))
    }
}

impl TryFrom<u8> for SignerMask {
    type Error = PolicyError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        Self::new(bits)
    }
}

impl From<SignerMask> for u8 {
    fn from(mask: SignerMask) -> u8 {
        mask.0
    }
}

impl fmt::Debug for SignerMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignerMask({:#05b})", self.0)
    }
}
