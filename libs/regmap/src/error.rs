//! Register map error types
//!
//! Only schema errors live here: a model definition and the code using it
//! disagree. Anything a live device can legitimately cause (timeouts,
//! garbage replies, offline units) is reported through [`crate::Status`]
//! instead, never as an `Err`.

use thiserror::Error;

/// Result type for regmap operations
pub type Result<T> = std::result::Result<T, RegMapError>;

/// Schema / implementation mismatch errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegMapError {
    /// Field has no descriptor in the model's registry
    #[error("Missing metadata for field {field}")]
    MissingMetadata { field: String },

    /// Field described twice while building a registry
    #[error("Duplicate metadata for field {field}")]
    DuplicateMetadata { field: String },

    /// Declared register length disagrees with the field's data type
    #[error("Field {field}: declared length {declared} but {data_type} needs {required} registers")]
    LengthMismatch {
        field: String,
        data_type: String,
        declared: u16,
        required: u16,
    },

    /// Field declared with no registers
    #[error("Field {field} spans no registers")]
    EmptyField { field: String },

    /// Scale divisor that is not a positive finite number
    #[error("Field {field}: scale {scale} must be positive and finite")]
    InvalidScale { field: String, scale: f64 },

    /// Typed decode handed the wrong number of registers
    #[error("Register count mismatch: expected {expected}, got {actual}")]
    RegisterCountMismatch { expected: usize, actual: usize },

    /// Block buffer length differs from the block's register count
    #[error("Block {block}: buffer holds {actual} registers, block spans {expected}")]
    BufferLengthMismatch {
        block: String,
        expected: usize,
        actual: usize,
    },

    /// Field range crosses a block boundary
    #[error("Field {field} straddles the boundary of block {block}")]
    BlockStraddle { field: String, block: String },

    /// Two members of one block claim the same register
    #[error("Block {block}: fields {first} and {second} overlap")]
    OverlappingMembers {
        block: String,
        first: String,
        second: String,
    },

    /// Range runs past register 65535
    #[error("Register range {offset}+{length} exceeds the 16-bit address space")]
    AddressOverflow { offset: u16, length: u32 },

    /// Value type does not match the field's declared type
    #[error("Type mismatch for {field}: expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    /// Write requested on a read-only field
    #[error("Field {0} is not writable")]
    NotWritable(String),

    /// Read requested on a write-only field
    #[error("Field {0} is not readable")]
    NotReadable(String),

    /// Block name not defined by the model
    #[error("Unknown block: {0}")]
    UnknownBlock(String),

    /// Field name not defined by the model
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Unparseable byte/word order name
    #[error("Invalid register order: {0}")]
    InvalidOrder(String),

    /// Textual value could not be converted to the field's type
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl RegMapError {
    pub fn missing_metadata(field: impl Into<String>) -> Self {
        Self::MissingMetadata {
            field: field.into(),
        }
    }

    pub fn type_mismatch(
        field: impl Into<String>,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable identifier
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingMetadata { .. } => "MISSING_METADATA",
            Self::DuplicateMetadata { .. } => "DUPLICATE_METADATA",
            Self::LengthMismatch { .. } => "LENGTH_MISMATCH",
            Self::EmptyField { .. } => "EMPTY_FIELD",
            Self::InvalidScale { .. } => "INVALID_SCALE",
            Self::RegisterCountMismatch { .. } => "REGISTER_COUNT_MISMATCH",
            Self::BufferLengthMismatch { .. } => "BUFFER_LENGTH_MISMATCH",
            Self::BlockStraddle { .. } => "BLOCK_STRADDLE",
            Self::OverlappingMembers { .. } => "OVERLAPPING_MEMBERS",
            Self::AddressOverflow { .. } => "ADDRESS_OVERFLOW",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::NotWritable(_) => "NOT_WRITABLE",
            Self::NotReadable(_) => "NOT_READABLE",
            Self::UnknownBlock(_) => "UNKNOWN_BLOCK",
            Self::UnknownField(_) => "UNKNOWN_FIELD",
            Self::InvalidOrder(_) => "INVALID_ORDER",
            Self::InvalidValue { .. } => "INVALID_VALUE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = RegMapError::BufferLengthMismatch {
            block: "measurements".into(),
            expected: 4,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "Block measurements: buffer holds 3 registers, block spans 4"
        );
        assert_eq!(err.error_code(), "BUFFER_LENGTH_MISMATCH");
    }

    #[test]
    fn test_helpers() {
        assert_eq!(
            RegMapError::missing_metadata("Pressure"),
            RegMapError::MissingMetadata {
                field: "Pressure".into()
            }
        );
        let err = RegMapError::type_mismatch("Pressure", "uint32", "float32");
        assert_eq!(err.error_code(), "TYPE_MISMATCH");
        assert!(err.to_string().contains("expected uint32"));
    }
}
