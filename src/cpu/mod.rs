//! CPU emulation for the TD4.
//!
//! This module implements the TD4 4-bit architecture:
//! - 16 one-byte ROM cells holding the program
//! - registers A, B, IN, OUT, the carry flag and a 4-bit PC
//! - 12 instructions in a 16-entry opcode space

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;

pub use memory::{Rom, RomError, ROM_SIZE};
pub use registers::Registers;
pub use decode::{Instruction, Opcode};
pub use execute::{Cpu, CpuError};
