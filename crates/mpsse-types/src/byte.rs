//! Byte literal parsing and display.
//!
//! Tokens typed at the shell are decimal by default. A `0b` prefix selects
//! binary (at most eight digits) and a `0x` prefix selects hexadecimal.
//! Prefixes are case-sensitive.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ShellError};

/// Why a token could not be read as a byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ByteParseError {
    #[error("empty value")]
    Empty,
    #[error("more than 8 binary digits")]
    TooManyBinaryDigits,
    #[error("invalid digit")]
    InvalidDigit,
    #[error("value does not fit in a byte")]
    Overflow,
}

/// Parse a byte literal (`42`, `0b101010`, `0x2a`).
pub fn parse_byte(token: &str) -> std::result::Result<u8, ByteParseError> {
    let value = token.trim();
    if value.is_empty() {
        return Err(ByteParseError::Empty);
    }

    // Need at least three characters to carry a prefix, e.g. "0x3".
    if value.len() > 2 {
        if let Some(digits) = value.strip_prefix("0b") {
            if digits.len() > 8 {
                return Err(ByteParseError::TooManyBinaryDigits);
            }
            return parse_radix(digits, 2);
        }
        if let Some(digits) = value.strip_prefix("0x") {
            return parse_radix(digits, 16);
        }
    }
    parse_radix(value, 10)
}

fn parse_radix(digits: &str, radix: u32) -> std::result::Result<u8, ByteParseError> {
    // A leading '+' is tolerated for decimal only.
    let digits = match digits.strip_prefix('+') {
        Some(rest) if radix == 10 && !rest.is_empty() => rest,
        _ => digits,
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(ByteParseError::InvalidDigit);
    }
    // Only overflow is left once every digit is valid.
    u8::from_str_radix(digits, radix).map_err(|_| ByteParseError::Overflow)
}

/// Parse a byte-valued command argument, naming it in the error.
pub fn parse_byte_arg(what: &'static str, token: &str) -> Result<u8> {
    parse_byte(token).map_err(|source| ShellError::Parse {
        what,
        token: token.to_string(),
        source,
    })
}

/// Parse an unsigned decimal count argument (`num bytes`, `num loops`).
pub fn parse_count(what: &'static str, token: &str) -> Result<u32> {
    token
        .trim()
        .parse::<u32>()
        .map_err(|_| ShellError::InvalidCount {
            what,
            token: token.to_string(),
        })
}

/// How bytes are rendered in command output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    Binary,
    #[default]
    Decimal,
    Hexadecimal,
}

impl OutputMode {
    /// Short name accepted by the `output` command.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Binary => "bin",
            Self::Decimal => "dec",
            Self::Hexadecimal => "hex",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputMode {
    type Err = ShellError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bin" => Ok(Self::Binary),
            "dec" => Ok(Self::Decimal),
            "hex" => Ok(Self::Hexadecimal),
            _ => Err(ShellError::InvalidOutputMode(s.to_string())),
        }
    }
}

/// Render one byte. Hex is lowercase and unpadded; binary is always 8 digits.
pub fn format_byte(b: u8, mode: OutputMode) -> String {
    match mode {
        OutputMode::Binary => format!("{b:08b}"),
        OutputMode::Decimal => b.to_string(),
        OutputMode::Hexadecimal => format!("{b:x}"),
    }
}

/// Render a run of bytes separated by single spaces.
pub fn format_bytes(bytes: &[u8], mode: OutputMode) -> String {
    bytes
        .iter()
        .map(|&b| format_byte(b, mode))
        .collect::<Vec<_>>()
        .join(" ")
}
