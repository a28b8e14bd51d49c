//! TD4 program memory.
//!
//! The TD4 runs straight out of a 16-byte ROM. Each byte is one
//! instruction: the high nibble selects the operation and the low nibble
//! is the immediate operand.

use crate::nibble::Nibble;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The number of ROM cells in the TD4.
pub const ROM_SIZE: usize = 16;

/// TD4 program ROM: 16 one-byte instructions.
#[derive(Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rom {
    cells: [u8; ROM_SIZE],
}

impl Rom {
    /// Create a ROM with every cell zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a full 16-byte image.
    pub const fn from_bytes(cells: [u8; ROM_SIZE]) -> Self {
        Self { cells }
    }

    /// Read the instruction byte at `addr`.
    #[inline]
    pub fn read(&self, addr: Nibble) -> u8 {
        self.cells[addr.index()]
    }

    /// Overwrite the instruction byte at `addr`.
    #[inline]
    pub fn write(&mut self, addr: Nibble, value: u8) {
        self.cells[addr.index()] = value;
    }

    /// Clear all cells to zero.
    pub fn clear(&mut self) {
        self.cells = [0; ROM_SIZE];
    }

    /// Load a program starting at address 0. Cells past the end of the
    /// program are zeroed.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), RomError> {
        if program.len() > ROM_SIZE {
            return Err(RomError::ProgramTooLarge { size: program.len() });
        }

        self.clear();
        self.cells[..program.len()].copy_from_slice(program);
        Ok(())
    }

    /// The raw image.
    pub fn as_bytes(&self) -> &[u8; ROM_SIZE] {
        &self.cells
    }

    /// Iterate over `(address, byte)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Nibble, u8)> + '_ {
        Nibble::all().zip(self.cells.iter().copied())
    }
}

impl std::fmt::Debug for Rom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rom[")?;
        for (i, byte) in self.cells.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        write!(f, "]")
    }
}

/// Errors that can occur when filling the ROM.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RomError {
    #[error("program size {size} exceeds ROM size {}", ROM_SIZE)]
    ProgramTooLarge { size: usize },
}
