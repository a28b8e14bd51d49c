//! Instruction decoder for the TD4.
//!
//! Every instruction is a single byte: the high nibble is the opcode and
//! the low nibble is an immediate operand. All 256 byte values decode;
//! four opcodes (0x8, 0xB, 0xC, 0xD) are unassigned and execute as no-ops.

use crate::nibble::Nibble;
use serde::{Serialize, Deserialize};

/// The sixteen TD4 opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    /// A := A + imm, sets carry
    AddA = 0x0,
    /// A := B
    MovAB = 0x1,
    /// A := IN
    InA = 0x2,
    /// A := imm
    MovA = 0x3,
    /// B := A
    MovBA = 0x4,
    /// B := imm
    MovB = 0x5,
    /// B := B + imm, sets carry
    AddB = 0x6,
    /// B := IN
    InB = 0x7,
    Unused8 = 0x8,
    /// OUT := B
    OutB = 0x9,
    /// OUT := imm
    Out = 0xA,
    UnusedB = 0xB,
    UnusedC = 0xC,
    UnusedD = 0xD,
    /// PC := imm if carry
    Jc = 0xE,
    /// PC := imm
    Jmp = 0xF,
}

impl Opcode {
    /// All opcodes in encoding order.
    pub const ALL: [Opcode; 16] = [
        Opcode::AddA, Opcode::MovAB, Opcode::InA, Opcode::MovA,
        Opcode::MovBA, Opcode::MovB, Opcode::AddB, Opcode::InB,
        Opcode::Unused8, Opcode::OutB, Opcode::Out, Opcode::UnusedB,
        Opcode::UnusedC, Opcode::UnusedD, Opcode::Jc, Opcode::Jmp,
    ];

    /// Decode an opcode nibble. Total: every nibble names an opcode.
    #[inline]
    pub const fn from_nibble(n: Nibble) -> Self {
        Self::ALL[n.index()]
    }

    /// The opcode's nibble value.
    #[inline]
    pub const fn to_nibble(self) -> Nibble {
        Nibble::new(self as u8)
    }

    /// Short name used in the execution trace.
    pub const fn name(self) -> &'static str {
        match self {
            Opcode::AddA => "ADD A,Im",
            Opcode::MovAB => "MOV A,B",
            Opcode::InA => "IN A",
            Opcode::MovA => "MOV A,Im",
            Opcode::MovBA => "MOV B,A",
            Opcode::MovB => "MOV B,Im",
            Opcode::AddB => "ADD B,Im",
            Opcode::InB => "IN B",
            Opcode::OutB => "OUT B",
            Opcode::Out => "OUT Im",
            Opcode::Jc => "JC Im",
            Opcode::Jmp => "JMP Im",
            Opcode::Unused8 | Opcode::UnusedB | Opcode::UnusedC | Opcode::UnusedD => "???",
        }
    }

    /// True for the opcodes that read the input port.
    pub const fn reads_input(self) -> bool {
        matches!(self, Opcode::InA | Opcode::InB)
    }

    /// True for the four unassigned opcodes.
    #[cfg(test)]
    pub const fn is_unused(self) -> bool {
        matches!(
            self,
            Opcode::Unused8 | Opcode::UnusedB | Opcode::UnusedC | Opcode::UnusedD
        )
    }
}

/// A decoded instruction: a view of one ROM byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub imm: Nibble,
}

impl Instruction {
    /// Build an instruction from its parts.
    pub const fn new(opcode: Opcode, imm: Nibble) -> Self {
        Self { opcode, imm }
    }

    /// An instruction whose operand is ignored.
    pub const fn bare(opcode: Opcode) -> Self {
        Self::new(opcode, Nibble::ZERO)
    }
}

/// Decode an instruction byte.
pub const fn decode(byte: u8) -> Instruction {
    Instruction {
        opcode: Opcode::from_nibble(Nibble::high(byte)),
        imm: Nibble::low(byte),
    }
}

/// Encode an instruction back into a ROM byte.
pub const fn encode(instr: &Instruction) -> u8 {
    Nibble::pack(instr.opcode.to_nibble(), instr.imm)
}
