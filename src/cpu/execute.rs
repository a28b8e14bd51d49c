//! CPU execution engine for the TD4.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use crate::nibble::Nibble;
use crate::cpu::{Registers, Rom};
use crate::cpu::decode::{self, Instruction, Opcode};
use serde::{Serialize, Deserialize};
use std::io::{BufRead, Write};
use thiserror::Error;

/// Prompt written to the trace stream before an IN instruction reads.
pub const INPUT_PROMPT: &str = "IN: ";

/// The TD4 machine state: registers plus program ROM.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Program ROM.
    pub rom: Rom,
    /// Completed steps (for profiling).
    pub cycles: u64,
}

impl Cpu {
    /// Create a new CPU with zeroed registers and ROM.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a CPU that will run `rom` from address 0.
    pub fn with_rom(rom: Rom) -> Self {
        Self { rom, ..Self::default() }
    }

    /// Zero the registers and cycle count, keeping the ROM.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.cycles = 0;
    }

    /// The instruction at the current program counter.
    pub fn current_instruction(&self) -> Instruction {
        decode::decode(self.rom.read(self.regs.pc))
    }

    /// Execute a single instruction.
    ///
    /// With `input` attached, IN A / IN B first read one hex token into the
    /// IN latch (after writing [`INPUT_PROMPT`] to `trace`, if attached).
    /// Without it they copy whatever the latch already holds. With `trace`
    /// attached one status line is written after execution.
    ///
    /// A failed read or write aborts the step. Registers already updated
    /// by the instruction keep their new values and the program counter is
    /// not advanced.
    ///
    /// Returns the instruction that was executed.
    pub fn step(
        &mut self,
        input: Option<&mut (dyn BufRead + '_)>,
        mut trace: Option<&mut (dyn Write + '_)>,
    ) -> Result<Instruction, CpuError> {
        // Fetch
        let pc = self.regs.pc;
        let instr = self.current_instruction();
        let mut next = self.regs.next_pc();

        // Latch input
        if let Some(input) = input {
            if instr.opcode.reads_input() {
                if let Some(out) = trace.as_deref_mut() {
                    out.write_all(INPUT_PROMPT.as_bytes())
                        .and_then(|_| out.flush())
                        .map_err(|e| CpuError::OutputFailure(e.to_string()))?;
                }
                self.regs.input = read_hex_token(input)?;
            }
        }

        // Execute
        let imm = instr.imm;
        match instr.opcode {
            Opcode::AddA => self.regs.add_a(imm),
            Opcode::MovAB => self.regs.a = self.regs.b,
            Opcode::InA => self.regs.a = self.regs.input,
            Opcode::MovA => self.regs.a = imm,

            Opcode::MovBA => self.regs.b = self.regs.a,
            Opcode::MovB => self.regs.b = imm,
            Opcode::AddB => self.regs.add_b(imm),
            Opcode::InB => self.regs.b = self.regs.input,

            Opcode::OutB => self.regs.out = self.regs.b,
            Opcode::Out => self.regs.out = imm,

            Opcode::Jc => {
                if self.regs.carry {
                    next = imm;
                }
            }
            Opcode::Jmp => next = imm,

            Opcode::Unused8 | Opcode::UnusedB | Opcode::UnusedC | Opcode::UnusedD => {}
        }

        if let Some(out) = trace {
            writeln!(out, "{}", self.trace_line(pc, &instr))
                .map_err(|e| CpuError::OutputFailure(e.to_string()))?;
        }

        // Commit
        self.regs.jump(next);
        self.cycles += 1;

        Ok(instr)
    }

    /// Run `steps` instructions, or until a step fails when `steps` is 0.
    ///
    /// Returns the number of instructions executed. On failure the count so
    /// far is still reflected in [`Cpu::cycles`].
    pub fn run(
        &mut self,
        steps: u64,
        mut input: Option<&mut (dyn BufRead + '_)>,
        mut trace: Option<&mut (dyn Write + '_)>,
    ) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while steps == 0 || self.cycles - start_cycles < steps {
            self.step(input.as_deref_mut(), trace.as_deref_mut())?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Format one trace line for `instr` executed at `pc`, using the
    /// current register values.
    pub fn trace_line(&self, pc: Nibble, instr: &Instruction) -> String {
        format!(
            "PC:{} {:<8} IM:{} A:{} B:{} OUT:{} CARRY:{}",
            pc,
            instr.opcode.name(),
            instr.imm,
            self.regs.a,
            self.regs.b,
            self.regs.out,
            Nibble::from(self.regs.carry),
        )
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("rom", &self.rom)
            .finish()
    }
}

/// Read one whitespace-delimited hex token and return its low nibble.
///
/// Accepts an optional `0x` prefix. Leading whitespace (including newlines)
/// is skipped; the byte that ends the token is left in the reader.
fn read_hex_token(input: &mut (dyn BufRead + '_)) -> Result<Nibble, CpuError> {
    let mut token = String::new();

    loop {
        let (consumed, done) = {
            let buf = input
                .fill_buf()
                .map_err(|e| CpuError::ReadFailure(e.to_string()))?;
            if buf.is_empty() {
                break;
            }

            let mut consumed = 0;
            let mut done = false;
            for &byte in buf {
                if byte.is_ascii_whitespace() {
                    if !token.is_empty() {
                        done = true;
                        break;
                    }
                } else {
                    token.push(byte as char);
                }
                consumed += 1;
            }
            (consumed, done)
        };
        input.consume(consumed);
        if done {
            break;
        }
    }

    if token.is_empty() {
        return Err(CpuError::InputExhausted);
    }

    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(&token);

    // Only the last digit survives masking to four bits.
    let mut value = None;
    for c in digits.chars() {
        value = Some(Nibble::from_hex_digit(c).ok_or_else(|| CpuError::InvalidInput(token.clone()))?);
    }
    value.ok_or_else(|| CpuError::InvalidInput(token.clone()))
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("input exhausted")]
    InputExhausted,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("input read failed: {0}")]
    ReadFailure(String),

    #[error("output failure: {0}")]
    OutputFailure(String),
}
