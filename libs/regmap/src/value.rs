//! Field data types and typed values
//!
//! `DataType` is what a field is declared as; `RegisterValue` is the native
//! value a model holds for it. Dynamic encode/decode dispatches to the
//! fixed-size [`RegisterCodec`] implementations.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::bytes::{decode_text, encode_text, BitFlags16, RegisterCodec, RegisterOrder};
use crate::error::{RegMapError, Result};

// ============================================================================
// DataType
// ============================================================================

/// Declared type of a mapped field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    // Unsigned integers
    UInt16,
    UInt32,
    UInt64,
    // Signed integers
    Int16,
    Int32,
    Int64,
    // Floating point
    Float32,
    Float64,
    // Special types
    /// Fixed-length ASCII, two characters per register
    Text { registers: u16 },
    /// Sixteen bit flags in one register
    Flags,
}

impl DataType {
    /// Parse from string representation (case-insensitive)
    ///
    /// Text fields use `text[N]` where `N` is the register count.
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        if let Some(inner) = lower
            .strip_prefix("text[")
            .and_then(|rest| rest.strip_suffix(']'))
        {
            return inner
                .parse::<u16>()
                .ok()
                .filter(|n| *n > 0)
                .map(|registers| Self::Text { registers });
        }

        match lower.as_str() {
            "uint16" | "u16" => Some(Self::UInt16),
            "uint32" | "u32" => Some(Self::UInt32),
            "uint64" | "u64" => Some(Self::UInt64),
            "int16" | "i16" => Some(Self::Int16),
            "int32" | "i32" => Some(Self::Int32),
            "int64" | "i64" => Some(Self::Int64),
            "float32" | "f32" | "float" => Some(Self::Float32),
            "float64" | "f64" | "double" => Some(Self::Float64),
            "flags" | "bits" | "bitfield" => Some(Self::Flags),
            _ => None,
        }
    }

    /// Registers one value of this type occupies: `ceil(bits / 16)`
    pub fn register_count(&self) -> u16 {
        match self {
            Self::UInt16 | Self::Int16 | Self::Flags => 1,
            Self::UInt32 | Self::Int32 | Self::Float32 => 2,
            Self::UInt64 | Self::Int64 | Self::Float64 => 4,
            Self::Text { registers } => *registers,
        }
    }

    /// Check if this is an integer type
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::UInt16 | Self::UInt32 | Self::UInt64 | Self::Int16 | Self::Int32 | Self::Int64
        )
    }

    /// Check if this is a floating-point type
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// Check if values of this type have a numeric reading
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UInt16 => f.write_str("uint16"),
            Self::UInt32 => f.write_str("uint32"),
            Self::UInt64 => f.write_str("uint64"),
            Self::Int16 => f.write_str("int16"),
            Self::Int32 => f.write_str("int32"),
            Self::Int64 => f.write_str("int64"),
            Self::Float32 => f.write_str("float32"),
            Self::Float64 => f.write_str("float64"),
            Self::Text { registers } => write!(f, "text[{}]", registers),
            Self::Flags => f.write_str("flags"),
        }
    }
}

// ============================================================================
// RegisterValue
// ============================================================================

/// Native value of one mapped field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegisterValue {
    U16(u16),
    U32(u32),
    U64(u64),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Text(String),
    Flags(BitFlags16),
}

impl RegisterValue {
    /// Zero / empty value for a freshly constructed model
    pub fn default_for(data_type: DataType) -> Self {
        match data_type {
            DataType::UInt16 => Self::U16(0),
            DataType::UInt32 => Self::U32(0),
            DataType::UInt64 => Self::U64(0),
            DataType::Int16 => Self::I16(0),
            DataType::Int32 => Self::I32(0),
            DataType::Int64 => Self::I64(0),
            DataType::Float32 => Self::F32(0.0),
            DataType::Float64 => Self::F64(0.0),
            DataType::Text { .. } => Self::Text(String::new()),
            DataType::Flags => Self::Flags(BitFlags16::default()),
        }
    }

    /// Short name of the carried type, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::U16(_) => "uint16",
            Self::U32(_) => "uint32",
            Self::U64(_) => "uint64",
            Self::I16(_) => "int16",
            Self::I32(_) => "int32",
            Self::I64(_) => "int64",
            Self::F32(_) => "float32",
            Self::F64(_) => "float64",
            Self::Text(_) => "text",
            Self::Flags(_) => "flags",
        }
    }

    /// Check whether this value can be stored in a field of `data_type`
    pub fn matches(&self, data_type: DataType) -> bool {
        matches!(
            (self, data_type),
            (Self::U16(_), DataType::UInt16)
                | (Self::U32(_), DataType::UInt32)
                | (Self::U64(_), DataType::UInt64)
                | (Self::I16(_), DataType::Int16)
                | (Self::I32(_), DataType::Int32)
                | (Self::I64(_), DataType::Int64)
                | (Self::F32(_), DataType::Float32)
                | (Self::F64(_), DataType::Float64)
                | (Self::Text(_), DataType::Text { .. })
                | (Self::Flags(_), DataType::Flags)
        )
    }

    /// Encode into exactly `data_type.register_count()` registers
    pub fn encode(&self, data_type: DataType, order: RegisterOrder) -> Result<Vec<u16>> {
        let words = match (self, data_type) {
            (Self::U16(v), DataType::UInt16) => v.encode(order),
            (Self::U32(v), DataType::UInt32) => v.encode(order),
            (Self::U64(v), DataType::UInt64) => v.encode(order),
            (Self::I16(v), DataType::Int16) => v.encode(order),
            (Self::I32(v), DataType::Int32) => v.encode(order),
            (Self::I64(v), DataType::Int64) => v.encode(order),
            (Self::F32(v), DataType::Float32) => v.encode(order),
            (Self::F64(v), DataType::Float64) => v.encode(order),
            (Self::Flags(v), DataType::Flags) => v.encode(order),
            (Self::Text(s), DataType::Text { registers }) => {
                encode_text(s, usize::from(registers), order)
            },
            (value, expected) => {
                return Err(RegMapError::type_mismatch(
                    "<value>",
                    expected,
                    value.type_name(),
                ))
            },
        };
        Ok(words)
    }

    /// Decode exactly `data_type.register_count()` registers
    pub fn decode(data_type: DataType, words: &[u16], order: RegisterOrder) -> Result<Self> {
        let value = match data_type {
            DataType::UInt16 => Self::U16(u16::decode(words, order)?),
            DataType::UInt32 => Self::U32(u32::decode(words, order)?),
            DataType::UInt64 => Self::U64(u64::decode(words, order)?),
            DataType::Int16 => Self::I16(i16::decode(words, order)?),
            DataType::Int32 => Self::I32(i32::decode(words, order)?),
            DataType::Int64 => Self::I64(i64::decode(words, order)?),
            DataType::Float32 => Self::F32(f32::decode(words, order)?),
            DataType::Float64 => Self::F64(f64::decode(words, order)?),
            DataType::Flags => Self::Flags(BitFlags16::decode(words, order)?),
            DataType::Text { registers } => {
                let expected = usize::from(registers);
                if words.len() != expected {
                    return Err(RegMapError::RegisterCountMismatch {
                        expected,
                        actual: words.len(),
                    });
                }
                Self::Text(decode_text(words, order))
            },
        };
        Ok(value)
    }

    /// Numeric reading of the raw value (flags report their bit pattern)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::U16(v) => Some(f64::from(*v)),
            Self::U32(v) => Some(f64::from(*v)),
            Self::U64(v) => Some(*v as f64),
            Self::I16(v) => Some(f64::from(*v)),
            Self::I32(v) => Some(f64::from(*v)),
            Self::I64(v) => Some(*v as f64),
            Self::F32(v) => Some(f64::from(*v)),
            Self::F64(v) => Some(*v),
            Self::Flags(v) => Some(f64::from(v.bits())),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_flags(&self) -> Option<BitFlags16> {
        match self {
            Self::Flags(v) => Some(*v),
            _ => None,
        }
    }

    /// Parse a textual value as the given type
    ///
    /// Integers and flags accept decimal or `0x` hex; flags also accept `0b` binary.
    pub fn parse_as(data_type: DataType, s: &str) -> std::result::Result<Self, String> {
        let s = s.trim();
        let value = match data_type {
            DataType::UInt16 => Self::U16(parse_unsigned(s)?.try_into().map_err(range_err)?),
            DataType::UInt32 => Self::U32(parse_unsigned(s)?.try_into().map_err(range_err)?),
            DataType::UInt64 => Self::U64(parse_unsigned(s)?),
            DataType::Int16 => Self::I16(s.parse().map_err(|e| format!("{e}"))?),
            DataType::Int32 => Self::I32(s.parse().map_err(|e| format!("{e}"))?),
            DataType::Int64 => Self::I64(s.parse().map_err(|e| format!("{e}"))?),
            DataType::Float32 => Self::F32(s.parse().map_err(|e| format!("{e}"))?),
            DataType::Float64 => Self::F64(s.parse().map_err(|e| format!("{e}"))?),
            DataType::Flags => {
                let bits = match s.strip_prefix("0b") {
                    Some(bin) => u16::from_str_radix(bin, 2).map_err(|e| format!("{e}"))?,
                    None => parse_unsigned(s)?.try_into().map_err(range_err)?,
                };
                Self::Flags(BitFlags16::from_bits(bits))
            },
            DataType::Text { registers } => {
                let capacity = usize::from(registers) * 2;
                if s.len() > capacity {
                    return Err(format!("text longer than {capacity} characters"));
                }
                Self::Text(s.to_string())
            },
        };
        Ok(value)
    }
}

fn parse_unsigned(s: &str) -> std::result::Result<u64, String> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).map_err(|e| format!("{e}")),
        None => s.parse().map_err(|e| format!("{e}")),
    }
}

fn range_err(e: std::num::TryFromIntError) -> String {
    format!("out of range: {e}")
}

impl fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Flags(v) => write!(f, "0x{:04X}", v.bits()),
        }
    }
}

macro_rules! impl_from_native {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for RegisterValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from_native!(
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    String => Text,
    BitFlags16 => Flags,
);

impl From<&str> for RegisterValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}
