//! 4-bit value type.
//!
//! Every register, immediate operand and the program counter of the TD4 is
//! four bits wide. [`Nibble`] keeps that invariant by construction: every
//! constructor masks to the low four bits, so no arithmetic can leave a
//! register holding more than a hex digit.

use std::fmt;
use serde::{Serialize, Deserialize};

/// A 4-bit unsigned value (0..=15).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Nibble(u8);

impl Nibble {
    /// Number of bits in a nibble.
    pub const WIDTH: u32 = 4;

    /// Bit mask selecting the low nibble of a byte.
    pub const MASK: u8 = 0x0F;

    /// The largest representable value.
    pub const MAX: Nibble = Nibble(0x0F);

    /// Zero.
    pub const ZERO: Nibble = Nibble(0);

    /// Create a nibble from the low four bits of `value`.
    #[inline]
    pub const fn new(value: u8) -> Self {
        Self(value & Self::MASK)
    }

    /// The high nibble of a byte.
    #[inline]
    pub const fn high(byte: u8) -> Self {
        Self::new(byte >> Self::WIDTH)
    }

    /// The low nibble of a byte.
    #[inline]
    pub const fn low(byte: u8) -> Self {
        Self::new(byte)
    }

    /// Raw value, always in 0..=15.
    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Use as an index into a 16-entry table.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Add two nibbles, returning the 4-bit sum and the carry out of bit 3.
    ///
    /// The carry is taken from the unmasked sum before it is truncated.
    #[inline]
    pub const fn add_with_carry(self, rhs: Nibble) -> (Nibble, bool) {
        let wide = self.0 + rhs.0;
        (Nibble::new(wide), wide > Self::MASK)
    }

    /// Increment modulo 16.
    #[inline]
    pub const fn wrapping_inc(self) -> Nibble {
        Nibble::new(self.0 + 1)
    }

    /// Parse a single hex digit (either case).
    pub fn from_hex_digit(c: char) -> Option<Nibble> {
        c.to_digit(16).map(|d| Nibble::new(d as u8))
    }

    /// Pack an opcode nibble and an immediate nibble into an instruction byte.
    #[inline]
    pub const fn pack(high: Nibble, low: Nibble) -> u8 {
        (high.0 << Self::WIDTH) | low.0
    }

    /// All sixteen values in ascending order.
    pub fn all() -> impl Iterator<Item = Nibble> {
        (0..=Self::MASK).map(Nibble)
    }
}

impl From<u8> for Nibble {
    fn from(value: u8) -> Self {
        Nibble::new(value)
    }
}

impl From<Nibble> for u8 {
    fn from(n: Nibble) -> Self {
        n.0
    }
}

impl From<bool> for Nibble {
    fn from(flag: bool) -> Self {
        Nibble(flag as u8)
    }
}

impl fmt::Debug for Nibble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nibble(0x{:X})", self.0)
    }
}

impl fmt::Display for Nibble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

impl fmt::UpperHex for Nibble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.0, f)
    }
}
