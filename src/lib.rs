//! # TD4 Emulator
//!
//! An emulator and assembler for the TD4, a minimal 4-bit educational CPU.
//!
//! The TD4 has two 4-bit registers, an input and an output port, a carry
//! flag and a 16-byte program ROM. Programs are written in a tiny assembly
//! language, assembled into the ROM, and stepped one instruction at a time
//! while a trace shows the machine state evolving.

pub mod nibble;
pub mod cpu;
pub mod asm;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use nibble::Nibble;
pub use cpu::{Cpu, CpuError, Instruction, Opcode, Registers, Rom, RomError};
pub use asm::{assemble, assemble_reader, disassemble, AssemblerError, HexError, load_hex, parse_hex, save_hex, write_hex};
