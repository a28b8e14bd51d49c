//! Disassembler for TD4 programs.
//!
//! Converts ROM bytes back to assembler syntax.

use crate::cpu::decode::{decode, Instruction, Opcode};
use crate::cpu::Rom;

/// Disassemble a single instruction byte to text.
pub fn disassemble_instruction(byte: u8) -> String {
    format_instruction(&decode(byte), byte)
}

/// Disassemble a whole ROM, one line per cell.
pub fn disassemble(rom: &Rom) -> String {
    let mut output = String::new();
    output.push_str("; TD4 Disassembly\n");
    output.push_str("; ---------------\n\n");

    for (addr, byte) in rom.iter() {
        let line = disassemble_instruction(byte);
        output.push_str(&format!("{:<12} ; {:X}: 0x{:02X}\n", line, addr, byte));
    }

    output
}

/// Format a decoded instruction as assembly text.
fn format_instruction(instr: &Instruction, byte: u8) -> String {
    let imm = instr.imm;
    match instr.opcode {
        Opcode::AddA => format!("add a, {}", imm.get()),
        Opcode::MovAB => "mov a, b".to_string(),
        Opcode::InA => "in a".to_string(),
        Opcode::MovA => format!("mov a, {}", imm.get()),
        Opcode::MovBA => "mov b, a".to_string(),
        Opcode::MovB => format!("mov b, {}", imm.get()),
        Opcode::AddB => format!("add b, {}", imm.get()),
        Opcode::InB => "in b".to_string(),
        Opcode::OutB => "out b".to_string(),
        Opcode::Out => format!("out {}", imm.get()),
        Opcode::Jc => format!("jc {}", imm.get()),
        Opcode::Jmp => format!("jmp {}", imm.get()),
        Opcode::Unused8 | Opcode::UnusedB | Opcode::UnusedC | Opcode::UnusedD => {
            format!("??? 0x{:02X}", byte)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble;

    #[test]
    fn test_disassemble_forms() {
        assert_eq!(disassemble_instruction(0x55), "mov b, 5");
        assert_eq!(disassemble_instruction(0x10), "mov a, b");
        assert_eq!(disassemble_instruction(0x90), "out b");
        assert_eq!(disassemble_instruction(0xF2), "jmp 2");
        assert_eq!(disassemble_instruction(0x8F), "??? 0x8F");
    }

    #[test]
    fn test_reassembles_every_emittable_byte() {
        for byte in 0..=255u8 {
            let instr = decode(byte);
            if instr.opcode.is_unused() {
                continue;
            }
            let text = disassemble_instruction(byte);
            let cpu = assemble(&text).unwrap();
            let expected = match instr.opcode {
                // Operand field is ignored by these and assembles as zero.
                Opcode::MovAB | Opcode::InA | Opcode::MovBA | Opcode::InB | Opcode::OutB => byte & 0xF0,
                _ => byte,
            };
            assert_eq!(cpu.rom.as_bytes()[0], expected, "{}", text);
        }
    }

    #[test]
    fn test_listing_reassembles() {
        let cpu = assemble("mov b,5\nadd b,3\nout b\njmp 2").unwrap();
        let listing = disassemble(&cpu.rom);

        assert_eq!(listing.lines().filter(|l| !l.starts_with(';') && !l.is_empty()).count(), 16);
        assert_eq!(assemble(&listing).unwrap().rom, cpu.rom);
    }
}
