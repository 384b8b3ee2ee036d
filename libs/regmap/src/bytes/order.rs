//! Register byte/word order
//!
//! Devices disagree on how a multi-register value is laid out. Two independent
//! axes cover every layout seen in the field:
//! - **Word order**: which of the `length` registers holds the most significant part
//! - **Byte order**: which byte inside a single register is the most significant
//!
//! # Naming Convention
//! Uses ABCD notation where A is the most significant byte of a 32-bit value:
//!
//! | Name   | swap_words | swap_bytes | `0x12345678` on the wire      |
//! |--------|------------|------------|-------------------------------|
//! | `ABCD` | false      | false      | `[0x1234, 0x5678]`            |
//! | `CDAB` | true       | false      | `[0x5678, 0x1234]`            |
//! | `BADC` | false      | true       | `[0x3412, 0x7856]`            |
//! | `DCBA` | true       | true       | `[0x7856, 0x3412]`            |

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::RegMapError;
use crate::value::DataType;

/// Byte/word order applied when converting a value to registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RegisterOrder {
    /// Reverse the order of the registers making up one value
    pub swap_words: bool,
    /// Exchange the high and low byte inside every register
    pub swap_bytes: bool,
}

impl RegisterOrder {
    /// ABCD: most significant register first, high byte first
    pub const ABCD: Self = Self::new(false, false);
    /// CDAB: least significant register first (common on energy meters)
    pub const CDAB: Self = Self::new(true, false);
    /// BADC: bytes swapped inside each register
    pub const BADC: Self = Self::new(false, true);
    /// DCBA: fully little-endian
    pub const DCBA: Self = Self::new(true, true);

    /// All four orders, handy for exhaustive checks
    pub const ALL: [Self; 4] = [Self::ABCD, Self::CDAB, Self::BADC, Self::DCBA];

    pub const fn new(swap_words: bool, swap_bytes: bool) -> Self {
        Self {
            swap_words,
            swap_bytes,
        }
    }

    /// ABCD-style name of this order
    pub fn as_str(&self) -> &'static str {
        match (self.swap_words, self.swap_bytes) {
            (false, false) => "ABCD",
            (true, false) => "CDAB",
            (false, true) => "BADC",
            (true, true) => "DCBA",
        }
    }

    /// Parse legacy string formats
    ///
    /// Supports:
    /// - "ABCD", "AB-CD", "BE", "BIG_ENDIAN" → ABCD
    /// - "CDAB", "CD-AB", "BIG_ENDIAN_SWAP" → CDAB
    /// - "BADC", "BA-DC", "LITTLE_ENDIAN_SWAP" → BADC
    /// - "DCBA", "DC-BA", "LE", "LITTLE_ENDIAN" → DCBA
    /// - "AB" / "BA" for single-register fields
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.to_uppercase().replace('-', "");
        match normalized.as_str() {
            "ABCD" | "AB" | "BE" | "BIG_ENDIAN" | "BIGENDIAN" | "ABCDEFGH" => Some(Self::ABCD),
            "CDAB" | "BIG_ENDIAN_SWAP" | "BIGENDIANSWAP" | "GHEFCDAB" => Some(Self::CDAB),
            "BADC" | "BA" | "LITTLE_ENDIAN_SWAP" | "LITTLEENDIANSWAP" | "BADCFEHG" => {
                Some(Self::BADC)
            },
            "DCBA" | "LE" | "LITTLE_ENDIAN" | "LITTLEENDIAN" | "HGFEDCBA" => Some(Self::DCBA),
            _ => None,
        }
    }
}

impl fmt::Display for RegisterOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegisterOrder {
    type Err = RegMapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| RegMapError::InvalidOrder(s.to_string()))
    }
}

impl Serialize for RegisterOrder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RegisterOrder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("unknown register order: {s}")))
    }
}

/// Model-wide register orders, one per field category
///
/// Vendors frequently store integers in ABCD while their floats come out of a
/// DSP in CDAB, so the order is chosen per field type rather than per model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderPolicy {
    pub integers: RegisterOrder,
    pub floats: RegisterOrder,
    pub text: RegisterOrder,
    pub flags: RegisterOrder,
}

impl OrderPolicy {
    /// Same order for every field type
    pub const fn uniform(order: RegisterOrder) -> Self {
        Self {
            integers: order,
            floats: order,
            text: order,
            flags: order,
        }
    }

    pub const fn with_floats(mut self, order: RegisterOrder) -> Self {
        self.floats = order;
        self
    }

    pub const fn with_text(mut self, order: RegisterOrder) -> Self {
        self.text = order;
        self
    }

    pub const fn with_flags(mut self, order: RegisterOrder) -> Self {
        self.flags = order;
        self
    }

    /// Order used for a field of the given type
    pub fn order_for(&self, data_type: DataType) -> RegisterOrder {
        match data_type {
            DataType::Float32 | DataType::Float64 => self.floats,
            DataType::Text { .. } => self.text,
            DataType::Flags => self.flags,
            _ => self.integers,
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(RegisterOrder::parse("ABCD"), Some(RegisterOrder::ABCD));
        assert_eq!(RegisterOrder::parse("ab-cd"), Some(RegisterOrder::ABCD));
        assert_eq!(RegisterOrder::parse("be"), Some(RegisterOrder::ABCD));
        assert_eq!(RegisterOrder::parse("CDAB"), Some(RegisterOrder::CDAB));
        assert_eq!(RegisterOrder::parse("BADC"), Some(RegisterOrder::BADC));
        assert_eq!(RegisterOrder::parse("LE"), Some(RegisterOrder::DCBA));
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(RegisterOrder::parse("ACBD"), None);
        assert_eq!(RegisterOrder::parse(""), None);
        assert!("xyz".parse::<RegisterOrder>().is_err());
    }

    #[test]
    fn test_axes_are_independent() {
        assert!(RegisterOrder::CDAB.swap_words && !RegisterOrder::CDAB.swap_bytes);
        assert!(!RegisterOrder::BADC.swap_words && RegisterOrder::BADC.swap_bytes);
        assert_eq!(RegisterOrder::default(), RegisterOrder::ABCD);
    }

    #[test]
    fn test_serde_uses_names() {
        let json = serde_json::to_string(&RegisterOrder::CDAB).unwrap();
        assert_eq!(json, r#""CDAB""#);
        let back: RegisterOrder = serde_json::from_str(r#""dcba""#).unwrap();
        assert_eq!(back, RegisterOrder::DCBA);
    }

    #[test]
    fn test_policy_routes_by_type() {
        let policy = OrderPolicy::uniform(RegisterOrder::ABCD).with_floats(RegisterOrder::CDAB);
        assert_eq!(policy.order_for(DataType::Float32), RegisterOrder::CDAB);
        assert_eq!(policy.order_for(DataType::UInt32), RegisterOrder::ABCD);
        assert_eq!(policy.order_for(DataType::Flags), RegisterOrder::ABCD);
    }
}
