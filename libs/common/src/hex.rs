//! Hex helpers for register dumps

use crate::error::{Error, Result};

/// Parse one register word: `0x028C`, `028c` or `28C`
pub fn parse_word(token: &str) -> Result<u16> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    if digits.is_empty() || digits.len() > 4 {
        return Err(Error::parse(format!("'{}' is not a 16-bit hex word", token)));
    }
    u16::from_str_radix(digits, 16)
        .map_err(|e| Error::parse(format!("'{}' is not a 16-bit hex word: {}", token, e)))
}

/// Parse a register dump separated by whitespace and/or commas
///
/// Example: "0x028C, 0000 1a2b" -> [0x028C, 0x0000, 0x1A2B]
pub fn parse_words(input: &str) -> Result<Vec<u16>> {
    input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(parse_word)
        .collect()
}
