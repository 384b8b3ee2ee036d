//! Typed value ↔ register conversions
//!
//! Every conversion goes through the big-endian byte image of the value:
//! bytes are packed two per register (first byte high), then `swap_bytes`
//! is applied inside each register and finally `swap_words` reverses the
//! registers. Decoding runs the same steps backwards, so for every order
//! `decode(encode(v, o), o) == v`.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

use super::order::RegisterOrder;
use crate::error::{RegMapError, Result};

// ============================================================================
// Byte image helpers
// ============================================================================

/// Pack a big-endian byte image into registers using the given order
///
/// `bytes.len()` must be even; callers pad text before calling.
pub fn bytes_to_registers(bytes: &[u8], order: RegisterOrder) -> Vec<u16> {
    debug_assert!(bytes.len() % 2 == 0, "Odd byte image: {}", bytes.len());

    let mut regs: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| {
            let reg = u16::from_be_bytes([pair[0], pair[1]]);
            if order.swap_bytes {
                reg.swap_bytes()
            } else {
                reg
            }
        })
        .collect();

    if order.swap_words {
        regs.reverse();
    }
    regs
}

/// Unpack registers into the big-endian byte image of the value
pub fn registers_to_bytes(regs: &[u16], order: RegisterOrder) -> Vec<u8> {
    let mut out = Vec::with_capacity(regs.len() * 2);
    let mut push = |reg: u16| {
        let reg = if order.swap_bytes {
            reg.swap_bytes()
        } else {
            reg
        };
        out.extend_from_slice(&reg.to_be_bytes());
    };

    if order.swap_words {
        regs.iter().rev().copied().for_each(&mut push);
    } else {
        regs.iter().copied().for_each(&mut push);
    }
    out
}

fn check_count(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(RegMapError::RegisterCountMismatch { expected, actual });
    }
    Ok(())
}

// ============================================================================
// RegisterCodec trait
// ============================================================================

/// Fixed-size conversion between a native value and register words
pub trait RegisterCodec: Sized {
    /// Number of registers one value occupies: `ceil(bits / 16)`
    const REGISTERS: usize;

    fn encode(&self, order: RegisterOrder) -> Vec<u16>;

    /// Decode exactly `REGISTERS` words; any other length is a schema error
    fn decode(words: &[u16], order: RegisterOrder) -> Result<Self>;
}

macro_rules! impl_numeric_codec {
    ($($ty:ty),* $(,)?) => {
        $(
            impl RegisterCodec for $ty {
                const REGISTERS: usize = std::mem::size_of::<$ty>() / 2;

                fn encode(&self, order: RegisterOrder) -> Vec<u16> {
                    bytes_to_registers(&self.to_be_bytes(), order)
                }

                fn decode(words: &[u16], order: RegisterOrder) -> Result<Self> {
                    check_count(Self::REGISTERS, words.len())?;
                    let bytes = registers_to_bytes(words, order);
                    let mut image = [0u8; std::mem::size_of::<$ty>()];
                    image.copy_from_slice(&bytes);
                    Ok(<$ty>::from_be_bytes(image))
                }
            }
        )*
    };
}

impl_numeric_codec!(u16, i16, u32, i32, u64, i64, f32, f64);

// ============================================================================
// Bit flags
// ============================================================================

/// Sixteen status bits carried by one register
///
/// Bit `i` is `(register >> i) & 1`. With `swap_bytes` the high and low byte
/// of the register are exchanged first, so bits 0-7 trade places with 8-15.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BitFlags16(u16);

impl BitFlags16 {
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u16 {
        self.0
    }

    #[inline]
    pub fn get(&self, index: u8) -> bool {
        super::bit_ops::extract_bit_u16(self.0, index)
    }

    #[inline]
    pub fn set(&mut self, index: u8, on: bool) {
        self.0 = super::bit_ops::insert_bit_u16(self.0, index, on);
    }

    /// Packed sub-field of `len` bits starting at bit `start`
    pub fn field(&self, start: u8, len: u8) -> u16 {
        super::bit_ops::extract_bits_u16(self.0, start, len)
    }

    pub fn set_field(&mut self, start: u8, len: u8, value: u16) {
        self.0 = super::bit_ops::insert_bits_u16(self.0, start, len, value);
    }

    /// All sixteen bits, index 0 first
    pub fn to_array(&self) -> [bool; 16] {
        std::array::from_fn(|i| self.get(i as u8))
    }

    pub fn from_array(bits: [bool; 16]) -> Self {
        let mut flags = Self::default();
        for (i, on) in bits.into_iter().enumerate() {
            flags.set(i as u8, on);
        }
        flags
    }

    /// Indices of the bits that are set
    pub fn set_bits(&self) -> Vec<u8> {
        (0..16).filter(|i| self.get(*i)).collect()
    }
}

impl fmt::Display for BitFlags16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016b}", self.0)
    }
}

impl RegisterCodec for BitFlags16 {
    const REGISTERS: usize = 1;

    fn encode(&self, order: RegisterOrder) -> Vec<u16> {
        self.0.encode(order)
    }

    fn decode(words: &[u16], order: RegisterOrder) -> Result<Self> {
        u16::decode(words, order).map(Self)
    }
}

// ============================================================================
// Fixed-length ASCII text
// ============================================================================

const TEXT_PAD: u8 = b' ';

/// Encode ASCII text into exactly `registers` registers
///
/// Two characters per register, first character in the high byte. Short input
/// is padded with spaces (an odd-length string gains one trailing space in its
/// last register); long input is truncated. Non-ASCII characters become `?`.
pub fn encode_text(text: &str, registers: usize, order: RegisterOrder) -> Vec<u16> {
    let capacity = registers * 2;
    let mut bytes: Vec<u8> = text
        .chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .take(capacity)
        .collect();
    bytes.resize(capacity, TEXT_PAD);
    bytes_to_registers(&bytes, order)
}

/// Decode ASCII text, stripping trailing pad spaces and NUL bytes
pub fn decode_text(words: &[u16], order: RegisterOrder) -> String {
    let bytes = registers_to_bytes(words, order);
    let end = bytes
        .iter()
        .rposition(|b| *b != TEXT_PAD && *b != 0)
        .map_or(0, |i| i + 1);

    bytes[..end]
        .iter()
        .map(|b| if b.is_ascii() { char::from(*b) } else { '?' })
        .collect()
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Render registers as uppercase hex, four characters per register
///
/// Example: `[0x0000, 0x0064]` → `"00000064"`
pub fn hex_dump(words: &[u16]) -> String {
    let mut out = String::with_capacity(words.len() * 4);
    for word in words {
        // Writing to String buffer is infallible
        let _ = write!(&mut out, "{:04X}", word);
    }
    out
}
