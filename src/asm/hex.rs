//! Hex ROM image format for TD4 programs.
//!
//! A hex image is a plain list of instruction bytes:
//! - Tokens are hexadecimal, with or without a `0x` prefix
//! - Tokens are separated by commas and/or whitespace
//! - The first 16 tokens fill the ROM in order; missing cells stay zero
//!
//! [`write_hex`] produces the same format, one `0xNN,` token per line.

use crate::cpu::{Rom, ROM_SIZE};
use crate::nibble::Nibble;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Parse a hex image.
///
/// Tokens after the sixteenth are ignored.
pub fn parse_hex(text: &str) -> Result<Rom, HexError> {
    let mut rom = Rom::new();

    let tokens = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .take(ROM_SIZE);

    for (i, token) in tokens.enumerate() {
        let digits = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);

        let byte = u8::from_str_radix(digits, 16).map_err(|_| HexError::ParseError {
            index: i + 1,
            token: token.to_string(),
        })?;
        rom.write(Nibble::new(i as u8), byte);
    }

    Ok(rom)
}

/// Load a hex image from disk.
pub fn load_hex<P: AsRef<Path>>(path: P) -> Result<Rom, HexError> {
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|e| HexError::IoError(e.to_string()))?;
    parse_hex(&text)
}

/// Write all 16 ROM cells as `0xNN,` lines.
pub fn write_hex(rom: &Rom, out: &mut dyn Write) -> Result<(), HexError> {
    for byte in rom.as_bytes() {
        writeln!(out, "0x{:X},", byte).map_err(|e| HexError::IoError(e.to_string()))?;
    }
    Ok(())
}

/// Save a hex image to disk.
pub fn save_hex<P: AsRef<Path>>(path: P, rom: &Rom) -> Result<(), HexError> {
    let mut file = std::fs::File::create(path.as_ref())
        .map_err(|e| HexError::IoError(e.to_string()))?;
    write_hex(rom, &mut file)
}

/// Errors that can occur reading or writing hex images.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error at token {index}: '{token}' is not a hex byte")]
    ParseError { index: usize, token: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dump_format() {
        let rom = parse_hex("0x55,\n0x63,\n0x90,\n0xF2,\n").unwrap();
        assert_eq!(&rom.as_bytes()[..5], &[0x55, 0x63, 0x90, 0xF2, 0x00]);
    }

    #[test]
    fn test_parse_loose_separators() {
        let rom = parse_hex("31 a2, F0\t0x0").unwrap();
        assert_eq!(&rom.as_bytes()[..4], &[0x31, 0xA2, 0xF0, 0x00]);
    }

    #[test]
    fn test_parse_ignores_extra_tokens() {
        let text = vec!["A1"; ROM_SIZE + 4].join(",");
        let rom = parse_hex(&text).unwrap();
        assert!(rom.as_bytes().iter().all(|&b| b == 0xA1));
    }

    #[test]
    fn test_parse_rejects_bad_tokens() {
        assert_eq!(
            parse_hex("31, zz").unwrap_err(),
            HexError::ParseError { index: 2, token: "zz".into() }
        );
        assert!(parse_hex("100").is_err());
    }

    #[test]
    fn test_write_then_parse() {
        let mut rom = Rom::new();
        rom.load_program(&[0x55, 0x63, 0x90, 0xF2]).unwrap();

        let mut out: Vec<u8> = Vec::new();
        write_hex(&rom, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("0x55,\n0x63,\n0x90,\n0xF2,\n0x0,\n"));
        assert_eq!(text.lines().count(), ROM_SIZE);
        assert_eq!(parse_hex(&text).unwrap(), rom);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_hex("/nonexistent/td4/rom.hex").unwrap_err();
        assert!(matches!(err, HexError::IoError(_)));
    }
}
