//! Per-field register metadata
//!
//! Each model type declares its fields once, as an enum implementing
//! [`FieldId`], and describes every variant with a [`FieldMetadata`]. The
//! [`FieldRegistry`] is validated when it is built, so a field without a
//! descriptor is caught at startup instead of on first access.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

use crate::error::{RegMapError, Result};
use crate::value::DataType;

/// Direction a field may be transferred in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl Access {
    pub fn is_readable(&self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOnly => "R",
            Self::WriteOnly => "W",
            Self::ReadWrite => "RW",
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Register location and shape of one field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMetadata {
    /// First register, 0-65535
    pub offset: u16,
    /// Register count; always equals `data_type.register_count()`
    pub length: u16,
    pub access: Access,
    pub data_type: DataType,
    /// Divisor turning the raw integer into an engineering value
    pub scale: f64,
    /// Engineering unit label, empty if none
    pub unit: &'static str,
}

impl FieldMetadata {
    /// Declare a field; the length invariant is checked by [`FieldRegistry::build`]
    pub const fn declare(offset: u16, length: u16, access: Access, data_type: DataType) -> Self {
        Self {
            offset,
            length,
            access,
            data_type,
            scale: 1.0,
            unit: "",
        }
    }

    /// Read-only field whose length follows from its type
    pub const fn read_only(offset: u16, data_type: DataType) -> Self {
        Self::declare(offset, data_type_len(data_type), Access::ReadOnly, data_type)
    }

    /// Read-write field whose length follows from its type
    pub const fn read_write(offset: u16, data_type: DataType) -> Self {
        Self::declare(offset, data_type_len(data_type), Access::ReadWrite, data_type)
    }

    pub const fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub const fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self
    }

    /// One past the last register, widened so 65535+N does not wrap
    pub fn end(&self) -> u32 {
        u32::from(self.offset) + u32::from(self.length)
    }

    /// Check if `[offset, end)` lies inside `[base, base + count)`
    pub fn within(&self, base: u16, count: u16) -> bool {
        self.offset >= base && self.end() <= u32::from(base) + u32::from(count)
    }

    /// Check if the two register ranges share at least one register
    pub fn overlaps(&self, other: &FieldMetadata) -> bool {
        u32::from(self.offset) < other.end() && u32::from(other.offset) < self.end()
    }

    pub fn is_readable(&self) -> bool {
        self.access.is_readable()
    }

    pub fn is_writable(&self) -> bool {
        self.access.is_writable()
    }
}

// `DataType::register_count` is not const; mirror it for the const constructors.
const fn data_type_len(data_type: DataType) -> u16 {
    match data_type {
        DataType::UInt16 | DataType::Int16 | DataType::Flags => 1,
        DataType::UInt32 | DataType::Int32 | DataType::Float32 => 2,
        DataType::UInt64 | DataType::Int64 | DataType::Float64 => 4,
        DataType::Text { registers } => registers,
    }
}

/// Identifier of a field within one model type
///
/// Implemented by a fieldless enum; `index` must be the variant's position
/// in `ALL`.
pub trait FieldId: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Every field of the model, in declaration order
    const ALL: &'static [Self];

    fn index(self) -> usize;

    fn name(self) -> &'static str;

    /// Look a field up by name (case-insensitive)
    fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }
}

/// Declare a field enum and its [`FieldId`] implementation
///
/// ```
/// regmap::define_fields! {
///     /// Fields of a flow sensor
///     pub enum FlowField {
///         Flow,
///         Total,
///     }
/// }
///
/// use regmap::FieldId;
/// assert_eq!(FlowField::Total.index(), 1);
/// assert_eq!(FlowField::from_name("flow"), Some(FlowField::Flow));
/// ```
#[macro_export]
macro_rules! define_fields {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),*
        }

        impl $crate::metadata::FieldId for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),*];

            fn index(self) -> usize {
                self as usize
            }

            fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }
        }
    };
}

/// Index-keyed registry mapping every field to its metadata
#[derive(Debug, Clone)]
pub struct FieldRegistry<F: FieldId> {
    entries: Vec<Option<(F, FieldMetadata)>>,
}

impl<F: FieldId> FieldRegistry<F> {
    /// Build and validate a registry
    ///
    /// Fails if any field of `F::ALL` is undescribed or described twice, if a
    /// field spans no registers or its declared length disagrees with its data
    /// type, if a scale is not a positive finite number, or if a range runs
    /// past the end of the 16-bit address space.
    pub fn build(descriptors: impl IntoIterator<Item = (F, FieldMetadata)>) -> Result<Self> {
        let mut entries: Vec<Option<(F, FieldMetadata)>> = vec![None; F::ALL.len()];

        for (field, meta) in descriptors {
            if meta.length == 0 {
                return Err(RegMapError::EmptyField {
                    field: field.name().to_string(),
                });
            }
            let required = meta.data_type.register_count();
            if meta.length != required {
                return Err(RegMapError::LengthMismatch {
                    field: field.name().to_string(),
                    data_type: meta.data_type.to_string(),
                    declared: meta.length,
                    required,
                });
            }
            if !meta.scale.is_finite() || meta.scale <= 0.0 {
                return Err(RegMapError::InvalidScale {
                    field: field.name().to_string(),
                    scale: meta.scale,
                });
            }
            if meta.end() > u32::from(u16::MAX) + 1 {
                return Err(RegMapError::AddressOverflow {
                    offset: meta.offset,
                    length: u32::from(meta.length),
                });
            }

            let slot = entries
                .get_mut(field.index())
                .ok_or_else(|| RegMapError::missing_metadata(field.name()))?;
            if slot.is_some() {
                return Err(RegMapError::DuplicateMetadata {
                    field: field.name().to_string(),
                });
            }
            *slot = Some((field, meta));
        }

        if let Some(missing) = F::ALL.iter().find(|f| entries[f.index()].is_none()) {
            return Err(RegMapError::missing_metadata(missing.name()));
        }

        Ok(Self { entries })
    }

    /// Full descriptor of a field
    pub fn describe(&self, field: F) -> Result<&FieldMetadata> {
        self.entries
            .get(field.index())
            .and_then(|e| e.as_ref())
            .map(|(_, meta)| meta)
            .ok_or_else(|| RegMapError::missing_metadata(field.name()))
    }

    pub fn offset_of(&self, field: F) -> Result<u16> {
        self.describe(field).map(|m| m.offset)
    }

    pub fn length_of(&self, field: F) -> Result<u16> {
        self.describe(field).map(|m| m.length)
    }

    pub fn access_of(&self, field: F) -> Result<Access> {
        self.describe(field).map(|m| m.access)
    }

    pub fn is_readable(&self, field: F) -> Result<bool> {
        self.describe(field).map(FieldMetadata::is_readable)
    }

    pub fn is_writable(&self, field: F) -> Result<bool> {
        self.describe(field).map(FieldMetadata::is_writable)
    }

    /// All described fields in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (F, &FieldMetadata)> + '_ {
        self.entries
            .iter()
            .flatten()
            .map(|(field, meta)| (*field, meta))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Probe {
        Pressure,
        Flow,
        Label,
    }

    impl FieldId for Probe {
        const ALL: &'static [Self] = &[Self::Pressure, Self::Flow, Self::Label];

        fn index(self) -> usize {
            self as usize
        }

        fn name(self) -> &'static str {
            match self {
                Self::Pressure => "Pressure",
                Self::Flow => "Flow",
                Self::Label => "Label",
            }
        }
    }

    fn full() -> Vec<(Probe, FieldMetadata)> {
        vec![
            (
                Probe::Pressure,
                FieldMetadata::read_only(1000, DataType::UInt32).with_scale(100.0),
            ),
            (Probe::Flow, FieldMetadata::read_write(1002, DataType::Int16)),
            (
                Probe::Label,
                FieldMetadata::declare(1003, 2, Access::WriteOnly, DataType::Text { registers: 2 }),
            ),
        ]
    }

    #[test]
    fn test_lookups() {
        let reg = FieldRegistry::build(full()).unwrap();
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.offset_of(Probe::Pressure).unwrap(), 1000);
        assert_eq!(reg.length_of(Probe::Pressure).unwrap(), 2);
        assert_eq!(reg.access_of(Probe::Flow).unwrap(), Access::ReadWrite);
        assert!(reg.is_readable(Probe::Pressure).unwrap());
        assert!(!reg.is_writable(Probe::Pressure).unwrap());
        assert!(!reg.is_readable(Probe::Label).unwrap());
        assert!(reg.is_writable(Probe::Label).unwrap());
        assert_eq!(reg.describe(Probe::Pressure).unwrap().scale, 100.0);
    }

    #[test]
    fn test_missing_descriptor_fails_at_build() {
        let mut descriptors = full();
        descriptors.remove(1);
        let err = FieldRegistry::build(descriptors).unwrap_err();
        assert_eq!(err, RegMapError::missing_metadata("Flow"));
    }

    #[test]
    fn test_duplicate_descriptor_fails() {
        let mut descriptors = full();
        descriptors.push((Probe::Flow, FieldMetadata::read_only(2000, DataType::Int16)));
        let err = FieldRegistry::build(descriptors).unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_METADATA");
    }

    #[test]
    fn test_length_must_match_type() {
        let mut descriptors = full();
        descriptors[0].1 = FieldMetadata::declare(1000, 1, Access::ReadOnly, DataType::UInt32);
        let err = FieldRegistry::build(descriptors).unwrap_err();
        assert!(matches!(
            err,
            RegMapError::LengthMismatch {
                declared: 1,
                required: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_zero_length_field_rejected() {
        let mut descriptors = full();
        descriptors[2].1 =
            FieldMetadata::declare(1003, 0, Access::WriteOnly, DataType::Text { registers: 0 });
        let err = FieldRegistry::build(descriptors).unwrap_err();
        assert_eq!(
            err,
            RegMapError::EmptyField {
                field: "Label".into()
            }
        );

        let mut descriptors = full();
        descriptors[2].1 = FieldMetadata::read_only(1003, DataType::Text { registers: 0 });
        assert_eq!(
            FieldRegistry::build(descriptors).unwrap_err().error_code(),
            "EMPTY_FIELD"
        );
    }

    #[test]
    fn test_scale_must_be_positive_and_finite() {
        for scale in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            let mut descriptors = full();
            descriptors[0].1 =
                FieldMetadata::read_only(1000, DataType::UInt32).with_scale(scale);
            let err = FieldRegistry::build(descriptors).unwrap_err();
            assert_eq!(err.error_code(), "INVALID_SCALE", "scale {scale}");
        }

        let mut descriptors = full();
        descriptors[0].1 = FieldMetadata::read_only(1000, DataType::UInt32).with_scale(0.5);
        assert!(FieldRegistry::build(descriptors).is_ok());
    }

    #[test]
    fn test_range_past_address_space() {
        let mut descriptors = full();
        descriptors[0].1 = FieldMetadata::read_only(65535, DataType::UInt32);
        let err = FieldRegistry::build(descriptors).unwrap_err();
        assert_eq!(err.error_code(), "ADDRESS_OVERFLOW");

        let mut descriptors = full();
        descriptors[1].1 = FieldMetadata::read_only(65535, DataType::Int16);
        assert!(FieldRegistry::build(descriptors).is_ok());
    }

    #[test]
    fn test_range_helpers() {
        let a = FieldMetadata::read_only(10, DataType::UInt32);
        let b = FieldMetadata::read_only(11, DataType::UInt16);
        let c = FieldMetadata::read_only(12, DataType::UInt16);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(a.within(10, 2));
        assert!(!a.within(11, 4));
        assert!(!a.within(8, 3));
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Probe::from_name("pressure"), Some(Probe::Pressure));
        assert_eq!(Probe::from_name("nope"), None);
    }
}
