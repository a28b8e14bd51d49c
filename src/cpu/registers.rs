//! TD4 CPU registers.
//!
//! The TD4 has:
//! - A, B: 4-bit general purpose registers
//! - IN: 4-bit input latch (filled from the input port)
//! - OUT: 4-bit output latch (the only user visible result)
//! - C: 1-bit carry flag, written only by ADD
//! - PC: 4-bit program counter

use crate::nibble::Nibble;
use serde::{Serialize, Deserialize};

/// The TD4 register file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// A: general purpose register
    pub a: Nibble,

    /// B: general purpose register
    pub b: Nibble,

    /// IN: value latched from the input port by the last IN instruction
    #[serde(rename = "in")]
    pub input: Nibble,

    /// OUT: output port latch
    pub out: Nibble,

    /// Carry flag.
    /// Set when an ADD overflows four bits, cleared by an ADD that
    /// does not. Every other instruction leaves it alone.
    pub carry: bool,

    /// Program counter, wraps modulo 16
    pub pc: Nibble,
}

impl Registers {
    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Add `imm` to A, updating carry.
    pub fn add_a(&mut self, imm: Nibble) {
        let (sum, carry) = self.a.add_with_carry(imm);
        self.a = sum;
        self.carry = carry;
    }

    /// Add `imm` to B, updating carry.
    pub fn add_b(&mut self, imm: Nibble) {
        let (sum, carry) = self.b.add_with_carry(imm);
        self.b = sum;
        self.carry = carry;
    }

    /// Address of the instruction after the current one.
    pub fn next_pc(&self) -> Nibble {
        self.pc.wrapping_inc()
    }

    /// Set the program counter to an absolute address.
    pub fn jump(&mut self, addr: Nibble) {
        self.pc = addr;
    }
}
