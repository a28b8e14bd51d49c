//! WebAssembly bindings for the TD4 emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.

use wasm_bindgen::prelude::*;
use crate::{Cpu, Nibble, Rom};
use crate::asm::assembler::assemble;
use crate::asm::disasm::disassemble_instruction;
use crate::asm::hex::parse_hex;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly CPU wrapper.
#[wasm_bindgen]
pub struct WasmTd4 {
    cpu: Cpu,
}

#[wasm_bindgen]
impl WasmTd4 {
    /// Create a new CPU instance with an empty ROM.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self { cpu: Cpu::new() }
    }

    /// Load a program from assembly source code.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<(), JsError> {
        self.cpu = assemble(source).map_err(|e| JsError::new(&e.to_string()))?;
        Ok(())
    }

    /// Load a program from a hex image.
    #[wasm_bindgen]
    pub fn load_hex(&mut self, text: &str) -> Result<(), JsError> {
        let rom = parse_hex(text).map_err(|e| JsError::new(&e.to_string()))?;
        self.cpu = Cpu::with_rom(rom);
        Ok(())
    }

    /// Load a raw ROM image of at most 16 bytes. Missing cells are zeroed.
    #[wasm_bindgen]
    pub fn load_rom(&mut self, bytes: &[u8]) -> Result<(), JsError> {
        let mut rom = Rom::new();
        rom.load_program(bytes).map_err(|e| JsError::new(&e.to_string()))?;
        self.cpu = Cpu::with_rom(rom);
        Ok(())
    }

    /// Step one instruction. Returns the trace line.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        let mut trace: Vec<u8> = Vec::new();
        self.cpu
            .step(None, Some(&mut trace))
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(String::from_utf8_lossy(&trace).trim_end().to_string())
    }

    /// Run `steps` instructions without tracing.
    ///
    /// Without an input stream nothing can fail, so an unbounded run would
    /// never return. `steps` must be at least 1.
    #[wasm_bindgen]
    pub fn run(&mut self, steps: u32) -> Result<u64, JsError> {
        let steps = step_limit(steps).ok_or_else(|| JsError::new("steps must be at least 1"))?;
        self.cpu
            .run(steps, None, None)
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Zero the registers, keeping the loaded program.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.cpu.reset();
    }

    /// Set the input port latch read by IN A / IN B.
    #[wasm_bindgen]
    pub fn set_input(&mut self, value: u8) {
        self.cpu.regs.input = Nibble::new(value);
    }

    #[wasm_bindgen]
    pub fn a(&self) -> u8 {
        self.cpu.regs.a.get()
    }

    #[wasm_bindgen]
    pub fn b(&self) -> u8 {
        self.cpu.regs.b.get()
    }

    #[wasm_bindgen]
    pub fn out(&self) -> u8 {
        self.cpu.regs.out.get()
    }

    #[wasm_bindgen]
    pub fn carry(&self) -> bool {
        self.cpu.regs.carry
    }

    #[wasm_bindgen]
    pub fn pc(&self) -> u8 {
        self.cpu.regs.pc.get()
    }

    /// Get cycle count.
    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    /// The 16 ROM bytes.
    #[wasm_bindgen]
    pub fn rom(&self) -> Vec<u8> {
        self.cpu.rom.as_bytes().to_vec()
    }

    /// Disassembled text of every ROM cell, one per line.
    #[wasm_bindgen]
    pub fn listing(&self) -> String {
        self.cpu
            .rom
            .iter()
            .map(|(_, byte)| disassemble_instruction(byte))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Machine state as a JSON string.
    #[wasm_bindgen]
    pub fn state_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.cpu).map_err(|e| JsError::new(&e.to_string()))
    }
}

fn step_limit(steps: u32) -> Option<u64> {
    (steps > 0).then(|| u64::from(steps))
}

impl Default for WasmTd4 {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble source code and return the ROM image.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<Vec<u8>, JsError> {
    let cpu = assemble(source).map_err(|e| JsError::new(&e.to_string()))?;
    Ok(cpu.rom.as_bytes().to_vec())
}

/// Disassemble a single instruction byte.
#[wasm_bindgen]
pub fn wasm_disassemble(byte: u8) -> String {
    disassemble_instruction(byte)
}

/// Round-trip a hex image through the ROM, normalising its format.
#[wasm_bindgen]
pub fn wasm_normalize_hex(text: &str) -> Result<String, JsError> {
    let rom: Rom = parse_hex(text).map_err(|e| JsError::new(&e.to_string()))?;
    let mut out: Vec<u8> = Vec::new();
    crate::asm::hex::write_hex(&rom, &mut out).map_err(|e| JsError::new(&e.to_string()))?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}
