//! Assembler and disassembler for TD4 programs.
//!
//! This module provides:
//! - A single-pass assembler (text → ROM image)
//! - A disassembler (ROM image → readable text)
//! - The hex ROM image format

pub mod assembler;
pub mod disasm;
pub mod hex;

pub use assembler::{assemble, assemble_reader, AssemblerError};
pub use disasm::disassemble;
pub use hex::{HexError, parse_hex, load_hex, write_hex, save_hex};
