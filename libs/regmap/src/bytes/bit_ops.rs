//! Bit-level operations on 16-bit registers
//!
//! Common use cases:
//! - Status / alarm words exposed as bit-flag registers
//! - Packed sub-fields (e.g. a 4-bit operating stage inside a state register)

/// Extract single bit from u16 value
#[inline]
pub fn extract_bit_u16(value: u16, bit_index: u8) -> bool {
    debug_assert!(bit_index < 16, "Bit index out of range: {}", bit_index);
    (value >> bit_index) & 1 == 1
}

/// Return `value` with one bit forced on or off
#[inline]
pub fn insert_bit_u16(value: u16, bit_index: u8, on: bool) -> u16 {
    debug_assert!(bit_index < 16, "Bit index out of range: {}", bit_index);
    if on {
        value | (1 << bit_index)
    } else {
        value & !(1 << bit_index)
    }
}

/// Extract a packed sub-field of `bit_length` bits starting at `start_bit` (LSB = 0)
pub fn extract_bits_u16(value: u16, start_bit: u8, bit_length: u8) -> u16 {
    debug_assert!(bit_length > 0, "Bit length must be greater than 0");
    debug_assert!(
        start_bit + bit_length <= 16,
        "Bit range out of register: {}+{}",
        start_bit,
        bit_length
    );

    let mask = if bit_length >= 16 {
        u16::MAX
    } else {
        (1u16 << bit_length) - 1
    };
    (value >> start_bit) & mask
}

/// Write a packed sub-field, leaving the surrounding bits untouched
pub fn insert_bits_u16(value: u16, start_bit: u8, bit_length: u8, field: u16) -> u16 {
    debug_assert!(bit_length > 0, "Bit length must be greater than 0");
    debug_assert!(
        start_bit + bit_length <= 16,
        "Bit range out of register: {}+{}",
        start_bit,
        bit_length
    );

    let mask = if bit_length >= 16 {
        u16::MAX
    } else {
        (1u16 << bit_length) - 1
    };
    (value & !(mask << start_bit)) | ((field & mask) << start_bit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bit_u16() {
        let value = 0b1010_1100u16;
        assert!(!extract_bit_u16(value, 0));
        assert!(extract_bit_u16(value, 2));
        assert!(extract_bit_u16(value, 3));
        assert!(extract_bit_u16(0x8000, 15));
    }

    #[test]
    fn test_insert_bit_u16() {
        assert_eq!(insert_bit_u16(0, 3, true), 0b1000);
        assert_eq!(insert_bit_u16(0xFFFF, 0, false), 0xFFFE);
        assert_eq!(insert_bit_u16(0b1000, 3, true), 0b1000);
    }

    #[test]
    fn test_extract_bits_u16() {
        assert_eq!(extract_bits_u16(0x0A50, 4, 4), 0x5);
        assert_eq!(extract_bits_u16(0x0A50, 8, 4), 0xA);
        assert_eq!(extract_bits_u16(0xBEEF, 0, 16), 0xBEEF);
    }

    #[test]
    fn test_insert_extract_round_trip() {
        let packed = insert_bits_u16(0xF00F, 4, 8, 0xAB);
        assert_eq!(packed, 0xFABF);
        assert_eq!(extract_bits_u16(packed, 4, 8), 0xAB);
    }
}
