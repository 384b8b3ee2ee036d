//! Register codec utilities
//!
//! Provides byte/word order handling, bit extraction and the typed
//! value ↔ register conversions used by every device model.
//!
//! # Design Principles
//!
//! - **Pure**: no state, no I/O; safe to call from any thread
//! - **Symmetric**: every encode has an exact inverse for all four orders
//! - **Fixed size**: a value's register count depends only on its type

pub mod bit_ops;
pub mod codec;
pub mod order;

pub use bit_ops::*;
pub use codec::{
    bytes_to_registers, decode_text, encode_text, hex_dump, registers_to_bytes, BitFlags16,
    RegisterCodec,
};
pub use order::{OrderPolicy, RegisterOrder};
