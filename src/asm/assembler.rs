//! Single-pass assembler for TD4 programs.
//!
//! Syntax:
//! ```text
//! ; Comment (so is '#')
//!     mov b, 5     ; B := 5
//!     add b, 3     ; B := B + 3, sets carry on overflow
//!     out b        ; OUT := B
//!     jmp 2        ; absolute jump, there are no labels
//! ```
//!
//! Mnemonics and register names are case-insensitive. Operands are
//! separated by whitespace and/or commas. Numbers may be decimal (optionally
//! signed), `0x` hex or `0b` binary; any value is accepted and only its low
//! four bits are kept.

use crate::nibble::Nibble;
use crate::cpu::{Cpu, Instruction, Opcode, ROM_SIZE};
use crate::cpu::decode::encode;
use std::io::{BufRead, Write};
use thiserror::Error;

/// Characters past this column are dropped before a line is parsed.
pub const MAX_LINE_LEN: usize = 255;

/// Assemble source text into a machine with its ROM filled in.
///
/// Registers are zeroed and unused ROM cells are left at 0x00.
pub fn assemble(source: &str) -> Result<Cpu, AssemblerError> {
    let mut asm = Assembler::new();
    for (line_num, line) in source.lines().enumerate() {
        asm.process_line(line, line_num + 1)?;
    }
    Ok(asm.finish())
}

/// Assemble from a line reader, writing a one-line diagnostic to `err` if
/// assembly fails.
pub fn assemble_reader<R: BufRead>(source: R, err: &mut dyn Write) -> Result<Cpu, AssemblerError> {
    let result = assemble_lines(source);
    if let Err(e) = &result {
        // The assembly error is still returned if the diagnostic can't be written.
        let _ = writeln!(err, "{}", e);
    }
    result
}

/// Lines are read as bytes and decoded lossily, so a non-UTF-8 line is
/// diagnosed with its line number like any other bad line.
fn assemble_lines<R: BufRead>(mut source: R) -> Result<Cpu, AssemblerError> {
    let mut asm = Assembler::new();
    let mut buf = Vec::new();
    let mut line_num = 0;

    loop {
        buf.clear();
        let n = source
            .read_until(b'\n', &mut buf)
            .map_err(|e| AssemblerError::Io(e.to_string()))?;
        if n == 0 {
            break;
        }
        line_num += 1;

        let text = String::from_utf8_lossy(&buf);
        let line = text.trim_end_matches(|c: char| c == '\n' || c == '\r');
        asm.process_line(line, line_num)?;
    }
    Ok(asm.finish())
}

/// Register operand names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Register {
    A,
    B,
}

impl Register {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "a" => Some(Register::A),
            "b" => Some(Register::B),
            _ => None,
        }
    }
}

/// The assembler state.
struct Assembler {
    /// Machine being filled in.
    cpu: Cpu,
    /// Next free ROM cell.
    cursor: usize,
}

impl Assembler {
    fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            cursor: 0,
        }
    }

    fn finish(self) -> Cpu {
        self.cpu
    }

    fn process_line(&mut self, raw: &str, line_num: usize) -> Result<(), AssemblerError> {
        let line = truncate_line(raw);

        // Remove comments
        let code = match line.find(|c: char| c == ';' || c == '#') {
            Some(idx) => &line[..idx],
            None => line,
        };

        let tokens: Vec<String> = code
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();

        let Some((mnemonic, operands)) = tokens.split_first() else {
            return Ok(());
        };

        let instr = self.parse_instruction(mnemonic, operands, raw, line_num)?;
        self.emit(instr, line_num)
    }

    fn parse_instruction(
        &self,
        mnemonic: &str,
        operands: &[String],
        raw: &str,
        line_num: usize,
    ) -> Result<Instruction, AssemblerError> {
        let instr = match mnemonic {
            "add" => {
                let [reg, value] = expect_operands::<2>(mnemonic, operands, line_num)?;
                let imm = parse_immediate(value, line_num)?;
                match Register::parse(reg) {
                    Some(Register::A) => Instruction::new(Opcode::AddA, imm),
                    Some(Register::B) => Instruction::new(Opcode::AddB, imm),
                    None => return Err(syntax(line_num, format!("invalid operands to add: '{}'", reg))),
                }
            }

            "mov" => {
                let [dst, src] = expect_operands::<2>(mnemonic, operands, line_num)?;
                match (Register::parse(dst), Register::parse(src)) {
                    (Some(Register::A), Some(Register::B)) => Instruction::bare(Opcode::MovAB),
                    (Some(Register::B), Some(Register::A)) => Instruction::bare(Opcode::MovBA),
                    (Some(Register::A), _) => Instruction::new(Opcode::MovA, parse_immediate(src, line_num)?),
                    (Some(Register::B), _) => Instruction::new(Opcode::MovB, parse_immediate(src, line_num)?),
                    (None, _) => return Err(syntax(line_num, format!("invalid operands to mov: '{}'", dst))),
                }
            }

            "in" => {
                let [reg] = expect_operands::<1>(mnemonic, operands, line_num)?;
                match Register::parse(reg) {
                    Some(Register::A) => Instruction::bare(Opcode::InA),
                    Some(Register::B) => Instruction::bare(Opcode::InB),
                    None => return Err(syntax(line_num, format!("invalid operand to in: '{}'", reg))),
                }
            }

            "out" => {
                let [src] = expect_operands::<1>(mnemonic, operands, line_num)?;
                match Register::parse(src) {
                    // The output port is wired to B only.
                    Some(Register::A) => {
                        return Err(syntax(line_num, "'a' is not a valid operand for 'out'".into()));
                    }
                    Some(Register::B) => Instruction::bare(Opcode::OutB),
                    None => Instruction::new(Opcode::Out, parse_immediate(src, line_num)?),
                }
            }

            "jc" => {
                let [addr] = expect_operands::<1>(mnemonic, operands, line_num)?;
                Instruction::new(Opcode::Jc, parse_immediate(addr, line_num)?)
            }

            "jmp" => {
                let [addr] = expect_operands::<1>(mnemonic, operands, line_num)?;
                Instruction::new(Opcode::Jmp, parse_immediate(addr, line_num)?)
            }

            _ => {
                return Err(AssemblerError::UnknownMnemonic {
                    line: line_num,
                    text: raw.trim().to_string(),
                })
            }
        };

        Ok(instr)
    }

    fn emit(&mut self, instr: Instruction, line_num: usize) -> Result<(), AssemblerError> {
        if self.cursor >= ROM_SIZE {
            return Err(AssemblerError::ProgramTooLarge { line: line_num });
        }
        self.cpu.rom.write(Nibble::new(self.cursor as u8), encode(&instr));
        self.cursor += 1;
        Ok(())
    }
}

/// Check the operand count for `mnemonic` and hand the operands back as an
/// array.
fn expect_operands<'a, const N: usize>(
    mnemonic: &str,
    operands: &'a [String],
    line_num: usize,
) -> Result<[&'a str; N], AssemblerError> {
    if operands.len() != N {
        return Err(syntax(
            line_num,
            format!("{} expects {} operand(s), found {}", mnemonic, N, operands.len()),
        ));
    }
    Ok(std::array::from_fn(|i| operands[i].as_str()))
}

fn parse_immediate(token: &str, line_num: usize) -> Result<Nibble, AssemblerError> {
    parse_number(token).ok_or_else(|| syntax(line_num, format!("invalid number '{}'", token)))
}

/// Parse a numeric operand, keeping only its low four bits.
///
/// Accepts an optional sign followed by decimal digits, `0x` hex or `0b`
/// binary. Arithmetic wraps, which is exact modulo 16 for any length.
fn parse_number(token: &str) -> Option<Nibble> {
    let (negative, body) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token.strip_prefix('+').unwrap_or(token)),
    };

    let (radix, digits) = if let Some(hex) = body.strip_prefix("0x") {
        (16, hex)
    } else if let Some(bin) = body.strip_prefix("0b") {
        (2, bin)
    } else {
        (10, body)
    };

    if digits.is_empty() {
        return None;
    }

    let mut value: u64 = 0;
    for c in digits.chars() {
        let d = c.to_digit(radix)?;
        value = value.wrapping_mul(radix as u64).wrapping_add(d as u64);
    }
    if negative {
        value = value.wrapping_neg();
    }

    Some(Nibble::new(value as u8))
}

/// Cut a line down to [`MAX_LINE_LEN`] characters.
fn truncate_line(line: &str) -> &str {
    match line.char_indices().nth(MAX_LINE_LEN) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

fn syntax(line: usize, message: String) -> AssemblerError {
    AssemblerError::SyntaxError { line, message }
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("invalid operation on line {line}: '{text}'")]
    UnknownMnemonic { line: usize, text: String },

    #[error("too many instructions (>{}) on line {line}", ROM_SIZE)]
    ProgramTooLarge { line: usize },

    #[error("I/O error: {0}")]
    Io(String),
}

impl AssemblerError {
    /// The 1-based source line the error refers to, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            AssemblerError::SyntaxError { line, .. }
            | AssemblerError::UnknownMnemonic { line, .. }
            | AssemblerError::ProgramTooLarge { line } => Some(*line),
            AssemblerError::Io(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::decode;
    use proptest::prelude::*;

    fn rom_of(source: &str) -> Vec<u8> {
        assemble(source).unwrap().rom.as_bytes().to_vec()
    }

    #[test]
    fn test_assemble_counter() {
        let source = "mov b,5\nadd b,3\nout b\njmp 2\n";
        let cpu = assemble(source).unwrap();

        let mut expected = [0u8; ROM_SIZE];
        expected[..4].copy_from_slice(&[0x55, 0x63, 0x90, 0xF2]);
        assert_eq!(cpu.rom.as_bytes(), &expected);
        assert_eq!(cpu.regs, crate::cpu::Registers::new());
        assert_eq!(cpu.cycles, 0);
    }

    #[test]
    fn test_every_form_decodes_as_written() {
        let table = [
            ("add a, 7", Opcode::AddA, 7),
            ("add b, 2", Opcode::AddB, 2),
            ("mov a, b", Opcode::MovAB, 0),
            ("mov a, 9", Opcode::MovA, 9),
            ("mov b, a", Opcode::MovBA, 0),
            ("mov b, 4", Opcode::MovB, 4),
            ("in a", Opcode::InA, 0),
            ("in b", Opcode::InB, 0),
            ("out b", Opcode::OutB, 0),
            ("out 5", Opcode::Out, 5),
            ("jc 12", Opcode::Jc, 12),
            ("jmp 15", Opcode::Jmp, 15),
        ];

        let source: Vec<&str> = table.iter().map(|(text, _, _)| *text).collect();
        let rom = rom_of(&source.join("\n"));

        for (i, (text, opcode, imm)) in table.iter().enumerate() {
            let instr = decode(rom[i]);
            assert_eq!(instr.opcode, *opcode, "{}", text);
            assert_eq!(instr.imm, Nibble::new(*imm), "{}", text);
        }
    }

    #[test]
    fn test_out_operands() {
        assert_eq!(rom_of("out b")[0], 0x90);
        assert_eq!(rom_of("out 5")[0], 0xA5);

        let err = assemble("out a").unwrap_err();
        assert!(matches!(err, AssemblerError::SyntaxError { line: 1, .. }));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(rom_of("MOV B, A\nOut B\nADD A,0X1f"), rom_of("mov b, a\nout b\nadd a, 15"));
    }

    #[test]
    fn test_separators() {
        assert_eq!(rom_of("mov a,3"), rom_of("mov a 3"));
        assert_eq!(rom_of("mov a , 3"), rom_of("\tmov   a,\t3  "));
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let source = "; header\n\n   # another\nmov a, 1 ; trailing\nout 2#x\n";
        let rom = rom_of(source);
        assert_eq!(&rom[..3], &[0x31, 0xA2, 0x00]);
    }

    #[test]
    fn test_numbers_are_masked() {
        assert_eq!(rom_of("mov a, 17")[0], 0x31);
        assert_eq!(rom_of("mov a, -1")[0], 0x3F);
        assert_eq!(rom_of("jmp 0x1E")[0], 0xFE);
        assert_eq!(rom_of("out 0b101")[0], 0xA5);
        assert_eq!(rom_of("add b, +3")[0], 0x63);
    }

    #[test]
    fn test_invalid_number() {
        let err = assemble("\njmp start").unwrap_err();
        assert_eq!(
            err,
            AssemblerError::SyntaxError { line: 2, message: "invalid number 'start'".into() }
        );
        assert!(assemble("mov a, a").is_err());
        assert!(assemble("jc 0x").is_err());
    }

    #[test]
    fn test_invalid_registers() {
        assert!(matches!(assemble("add c, 1"), Err(AssemblerError::SyntaxError { .. })));
        assert!(matches!(assemble("mov c, 1"), Err(AssemblerError::SyntaxError { .. })));
        assert!(matches!(assemble("in 3"), Err(AssemblerError::SyntaxError { .. })));
    }

    #[test]
    fn test_operand_count() {
        for source in ["add a", "mov a", "mov a, b, 3", "in", "out", "out b 1", "jc", "jmp 1 2"] {
            let err = assemble(source).unwrap_err();
            assert!(matches!(err, AssemblerError::SyntaxError { line: 1, .. }), "{}", source);
        }
    }

    #[test]
    fn test_unknown_mnemonic() {
        let err = assemble("mov a, 1\n  nop  ; idle\n").unwrap_err();
        assert_eq!(
            err,
            AssemblerError::UnknownMnemonic { line: 2, text: "nop  ; idle".into() }
        );
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.to_string(), "invalid operation on line 2: 'nop  ; idle'");
    }

    #[test]
    fn test_sixteen_instructions_fit() {
        let source = "out 1\n".repeat(ROM_SIZE);
        assert!(rom_of(&source).iter().all(|&b| b == 0xA1));
    }

    #[test]
    fn test_program_too_large() {
        let source = "out 1\n".repeat(ROM_SIZE + 1);
        assert_eq!(assemble(&source).unwrap_err(), AssemblerError::ProgramTooLarge { line: 17 });
    }

    #[test]
    fn test_program_too_large_counts_source_lines() {
        let source = format!("; counter\n\n{}", "jmp 0\n".repeat(ROM_SIZE + 1));
        assert_eq!(assemble(&source).unwrap_err().line(), Some(19));
    }

    #[test]
    fn test_long_lines_are_truncated() {
        let source = format!("jmp 3{}junk", " ".repeat(MAX_LINE_LEN));
        assert_eq!(rom_of(&source)[0], 0xF3);
    }

    #[test]
    fn test_reader_reports_diagnostic() {
        let mut err: Vec<u8> = Vec::new();
        let result = assemble_reader("mov a, 1\nhalt\n".as_bytes(), &mut err);

        assert!(result.is_err());
        assert_eq!(String::from_utf8(err).unwrap(), "invalid operation on line 2: 'halt'\n");
    }

    #[test]
    fn test_reader_non_utf8_line_has_line_number() {
        let mut err: Vec<u8> = Vec::new();
        let result = assemble_reader(&b"mov a,1\n\xff\n"[..], &mut err);

        assert_eq!(result.unwrap_err().line(), Some(2));
        assert!(String::from_utf8(err).unwrap().contains("line 2"));
    }

    #[test]
    fn test_reader_crlf_lines() {
        let mut err: Vec<u8> = Vec::new();
        let cpu = assemble_reader("mov b,5\r\nout b\r\n".as_bytes(), &mut err).unwrap();

        assert!(err.is_empty());
        assert_eq!(&cpu.rom.as_bytes()[..2], &[0x55, 0x90]);
    }

    struct ClosedStream;

    impl Write for ClosedStream {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_reader_error_survives_closed_error_stream() {
        let err = assemble_reader("out 1\njmp\n".as_bytes(), &mut ClosedStream).unwrap_err();
        assert!(matches!(err, AssemblerError::SyntaxError { line: 2, .. }));
    }

    #[test]
    fn test_reader_success_is_silent() {
        let mut err: Vec<u8> = Vec::new();
        let cpu = assemble_reader("mov b,5\nadd b,3\nout b\njmp 2\n".as_bytes(), &mut err).unwrap();

        assert!(err.is_empty());
        assert_eq!(&cpu.rom.as_bytes()[..4], &[0x55, 0x63, 0x90, 0xF2]);
    }

    #[test]
    fn test_assembled_counter_runs() {
        let mut cpu = assemble("mov b,5\nadd b,3\nout b\njmp 2").unwrap();

        cpu.run(3, None, None).unwrap();
        assert_eq!(cpu.regs.out, Nibble::new(8));
        cpu.step(None, None).unwrap();
        assert_eq!(cpu.regs.pc, Nibble::new(2));
    }

    #[test]
    fn test_timer_demo_signals_overflow() {
        let mut cpu = assemble(include_str!("../../demos/timer.asm")).unwrap();

        let mut steps = 0;
        while cpu.regs.out != Nibble::MAX && steps < 100 {
            cpu.step(None, None).unwrap();
            steps += 1;
        }
        // mov, 15 x (add, jc, jmp), add, jc, out
        assert_eq!(steps, 49);
        assert_eq!(cpu.regs.a, Nibble::ZERO);
        assert!(cpu.regs.carry);
    }

    proptest! {
        #[test]
        fn prop_decimal_masking(n in any::<i64>()) {
            prop_assert_eq!(parse_number(&n.to_string()), Some(Nibble::new((n & 0xF) as u8)));
        }

        #[test]
        fn prop_hex_masking(n in any::<u32>()) {
            prop_assert_eq!(parse_number(&format!("0x{:x}", n)), Some(Nibble::new((n & 0xF) as u8)));
        }
    }
}
