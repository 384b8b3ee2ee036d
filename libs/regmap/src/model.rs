//! Device model: typed field values plus a status envelope
//!
//! One `DeviceModel` exists per physical device. Values and status are the
//! only mutable state; layout and metadata come from the `'static` schema of
//! the model's [`DeviceKind`].
//!
//! # Design Principles
//! - **Stale but labelled**: failures degrade the status, never the values
//! - **Type-checked writes**: a value of the wrong type is a schema error
//! - **One status per cycle**: every refresh sets exactly one code

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use tracing::info;

use crate::bytes::BitFlags16;
use crate::error::{RegMapError, Result};
use crate::metadata::{Access, FieldId, FieldMetadata};
use crate::schema::{DeviceKind, DeviceSchema};
use crate::status::{Status, StatusCode};
use crate::value::{DataType, RegisterValue};

/// Live state of one device
pub struct DeviceModel<K: DeviceKind> {
    schema: &'static DeviceSchema<K::Field>,
    /// Indexed by `FieldId::index`
    values: Vec<RegisterValue>,
    status: Status,
    _kind: PhantomData<fn() -> K>,
}

impl<K: DeviceKind> DeviceModel<K> {
    /// Fresh model: zero/empty values, status `Uncertain`
    pub fn new() -> Result<Self> {
        let schema = K::schema()?;
        let values = <K::Field as FieldId>::ALL
            .iter()
            .map(|field| {
                schema
                    .registry()
                    .describe(*field)
                    .map(|meta| RegisterValue::default_for(meta.data_type))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            schema,
            values,
            status: Status::new(),
            _kind: PhantomData,
        })
    }

    pub fn schema(&self) -> &'static DeviceSchema<K::Field> {
        self.schema
    }

    pub fn name(&self) -> &'static str {
        self.schema.name()
    }

    /// Metadata of a field
    pub fn describe(&self, field: K::Field) -> Result<&'static FieldMetadata> {
        self.schema.registry().describe(field)
    }

    /// Field by case-insensitive name
    pub fn field_by_name(&self, name: &str) -> Result<K::Field> {
        self.schema.field(name)
    }

    // ========================================================================
    // Values
    // ========================================================================

    /// Current raw value of a field
    pub fn get(&self, field: K::Field) -> &RegisterValue {
        &self.values[field.index()]
    }

    /// Replace a field's value
    ///
    /// The value must match the field's declared type; text must fit the
    /// field's register count.
    pub fn set(&mut self, field: K::Field, value: impl Into<RegisterValue>) -> Result<()> {
        let value = value.into();
        let meta = self.describe(field)?;
        if !value.matches(meta.data_type) {
            return Err(RegMapError::type_mismatch(
                field.name(),
                meta.data_type,
                value.type_name(),
            ));
        }
        if let (RegisterValue::Text(text), DataType::Text { registers }) = (&value, meta.data_type) {
            let capacity = usize::from(registers) * 2;
            if text.chars().count() > capacity {
                return Err(RegMapError::invalid_value(
                    field.name(),
                    format!("text longer than {capacity} characters"),
                ));
            }
        }
        self.values[field.index()] = value;
        Ok(())
    }

    /// Set a field from its textual form (`0x` hex accepted for integers)
    pub fn set_from_str(&mut self, field: K::Field, text: &str) -> Result<()> {
        let meta = self.describe(field)?;
        let value = RegisterValue::parse_as(meta.data_type, text)
            .map_err(|reason| RegMapError::invalid_value(field.name(), reason))?;
        self.set(field, value)
    }

    /// Set a field that is about to be written to the device
    pub fn stage_write(&mut self, field: K::Field, value: impl Into<RegisterValue>) -> Result<()> {
        if !self.describe(field)?.is_writable() {
            return Err(RegMapError::NotWritable(field.name().to_string()));
        }
        self.set(field, value)
    }

    /// Engineering value: raw numeric value divided by the field's scale
    ///
    /// `None` for text and flag fields.
    pub fn scaled(&self, field: K::Field) -> Option<f64> {
        let meta = self.describe(field).ok()?;
        if !meta.data_type.is_numeric() {
            return None;
        }
        self.get(field).as_f64().map(|raw| raw / meta.scale)
    }

    /// Value formatted for presentation
    ///
    /// Scaled integers get as many decimals as the scale implies (scale 100
    /// shows two); floats show at least two.
    pub fn display(&self, field: K::Field) -> String {
        let value = self.get(field);
        let Ok(meta) = self.describe(field) else {
            return value.to_string();
        };
        match self.scaled(field) {
            Some(scaled) => {
                let mut decimals = decimals_for(meta.scale);
                if meta.data_type.is_float() {
                    decimals = decimals.max(2);
                }
                format!("{:.*}", decimals, scaled)
            },
            None => value.to_string(),
        }
    }

    /// Text field contents, empty for non-text fields
    pub fn text(&self, field: K::Field) -> &str {
        self.get(field).as_text().unwrap_or_default()
    }

    /// Flag field contents, all clear for non-flag fields
    pub fn flags(&self, field: K::Field) -> BitFlags16 {
        self.get(field).as_flags().unwrap_or_default()
    }

    /// Replace several values at once; callers have already type-checked them
    pub(crate) fn apply(&mut self, staged: Vec<(K::Field, RegisterValue)>) {
        for (field, value) in staged {
            self.values[field.index()] = value;
        }
    }

    // ========================================================================
    // Status
    // ========================================================================

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn is_good(&self) -> bool {
        self.status.is_good()
    }

    pub fn is_bad(&self) -> bool {
        self.status.is_bad()
    }

    pub fn is_uncertain(&self) -> bool {
        self.status.is_uncertain()
    }

    /// Copy every value and the status code from `source`
    ///
    /// With no source, values are kept and the status drops to `Uncertain`.
    pub fn refresh(&mut self, source: Option<&Self>) {
        match source {
            Some(source) => {
                self.values.clone_from(&source.values);
                self.mark(source.status.code());
            },
            None => self.mark(StatusCode::Uncertain),
        }
    }

    /// Set the status code without touching values
    pub fn mark(&mut self, code: StatusCode) {
        let previous = self.status.code();
        if self.status.set(code) {
            info!("{} status {} -> {}", self.name(), previous, code);
        }
    }

    /// Serialisable copy of values and status for presentation layers
    pub fn snapshot(&self) -> DeviceSnapshot {
        let fields = self
            .schema
            .registry()
            .iter()
            .map(|(field, meta)| FieldReading {
                name: field.name(),
                raw: self.get(field).clone(),
                value: self.scaled(field),
                display: self.display(field),
                unit: meta.unit,
                access: meta.access,
            })
            .collect();

        DeviceSnapshot {
            device: self.name(),
            status: self.status.code(),
            explanation: self.status.explanation(),
            changed_at: self.status.changed_at(),
            refreshed_at: self.status.refreshed_at(),
            fields,
        }
    }
}

fn decimals_for(scale: f64) -> usize {
    if scale > 1.0 {
        scale.log10().ceil() as usize
    } else {
        0
    }
}

impl<K: DeviceKind> Clone for DeviceModel<K> {
    fn clone(&self) -> Self {
        Self {
            schema: self.schema,
            values: self.values.clone(),
            status: self.status.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K: DeviceKind> fmt::Debug for DeviceModel<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceModel")
            .field("device", &self.name())
            .field("status", &self.status.code())
            .field("values", &self.values)
            .finish()
    }
}

/// One field in a [`DeviceSnapshot`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldReading {
    pub name: &'static str,
    pub raw: RegisterValue,
    /// Scaled engineering value, numeric fields only
    pub value: Option<f64>,
    pub display: String,
    pub unit: &'static str,
    pub access: Access,
}

/// Point-in-time view of a device model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSnapshot {
    pub device: &'static str,
    pub status: StatusCode,
    pub explanation: &'static str,
    pub changed_at: DateTime<Utc>,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub fields: Vec<FieldReading>,
}

impl DeviceSnapshot {
    pub fn field(&self, name: &str) -> Option<&FieldReading> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::bytes::{OrderPolicy, RegisterOrder};
    use crate::schema::BlockSpec;
    use once_cell::sync::Lazy;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Pump {
        Pressure,
        Speed,
        Label,
        Faults,
        Target,
    }

    impl FieldId for Pump {
        const ALL: &'static [Self] = &[
            Self::Pressure,
            Self::Speed,
            Self::Label,
            Self::Faults,
            Self::Target,
        ];

        fn index(self) -> usize {
            self as usize
        }

        fn name(self) -> &'static str {
            match self {
                Self::Pressure => "Pressure",
                Self::Speed => "Speed",
                Self::Label => "Label",
                Self::Faults => "Faults",
                Self::Target => "Target",
            }
        }
    }

    struct PumpKind;

    static PUMP: Lazy<Result<DeviceSchema<Pump>>> = Lazy::new(|| {
        DeviceSchema::build(
            "pump",
            OrderPolicy::uniform(RegisterOrder::ABCD),
            [
                (
                    Pump::Pressure,
                    FieldMetadata::read_only(0, DataType::UInt32)
                        .with_scale(100.0)
                        .with_unit("bar"),
                ),
                (Pump::Speed, FieldMetadata::read_only(2, DataType::Float32).with_unit("rpm")),
                (Pump::Label, FieldMetadata::read_only(4, DataType::Text { registers: 2 })),
                (Pump::Faults, FieldMetadata::read_only(6, DataType::Flags)),
                (Pump::Target, FieldMetadata::read_write(7, DataType::Int16).with_scale(10.0)),
            ],
            &[BlockSpec::new("all", 0, 8)],
        )
    });

    impl DeviceKind for PumpKind {
        type Field = Pump;

        fn schema() -> Result<&'static DeviceSchema<Pump>> {
            PUMP.as_ref().map_err(Clone::clone)
        }
    }

    #[test]
    fn test_new_model_is_uncertain_and_zeroed() {
        let model = DeviceModel::<PumpKind>::new().unwrap();
        assert!(model.is_uncertain());
        assert!(!model.is_good());
        assert!(!model.is_bad());
        assert!(model.status().refreshed_at().is_none());
        assert_eq!(model.get(Pump::Pressure), &RegisterValue::U32(0));
        assert_eq!(model.text(Pump::Label), "");
    }

    #[test]
    fn test_set_is_type_checked() {
        let mut model = DeviceModel::<PumpKind>::new().unwrap();
        model.set(Pump::Pressure, 250u32).unwrap();

        let err = model.set(Pump::Pressure, 1.5f32).unwrap_err();
        assert_eq!(
            err,
            RegMapError::type_mismatch("Pressure", "uint32", "float32")
        );
        assert_eq!(model.get(Pump::Pressure), &RegisterValue::U32(250));

        let err = model.set(Pump::Label, "too long").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_VALUE");
    }

    #[test]
    fn test_stage_write_requires_writable() {
        let mut model = DeviceModel::<PumpKind>::new().unwrap();
        assert_eq!(
            model.stage_write(Pump::Pressure, 1u32).unwrap_err(),
            RegMapError::NotWritable("Pressure".into())
        );
        model.stage_write(Pump::Target, 215i16).unwrap();
        assert_eq!(model.scaled(Pump::Target), Some(21.5));
    }

    #[test]
    fn test_display_uses_scale() {
        let mut model = DeviceModel::<PumpKind>::new().unwrap();
        model.set(Pump::Pressure, 100u32).unwrap();
        model.set(Pump::Speed, 1450.0f32).unwrap();
        model.set(Pump::Target, -15i16).unwrap();
        model.set(Pump::Faults, BitFlags16::from_bits(0x0011)).unwrap();

        assert_eq!(model.display(Pump::Pressure), "1.00");
        assert_eq!(model.display(Pump::Speed), "1450.00");
        assert_eq!(model.display(Pump::Target), "-1.5");
        assert_eq!(model.display(Pump::Faults), "0x0011");
        assert_eq!(model.scaled(Pump::Faults), None);
    }

    #[test]
    fn test_set_from_str() {
        let mut model = DeviceModel::<PumpKind>::new().unwrap();
        model.set_from_str(Pump::Target, "0x10").unwrap_err();
        model.set_from_str(Pump::Target, "-20").unwrap();
        model.set_from_str(Pump::Pressure, "0x64").unwrap();
        assert_eq!(model.get(Pump::Pressure), &RegisterValue::U32(100));
        let err = model.set_from_str(Pump::Speed, "fast").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_VALUE");
    }

    #[test]
    fn test_refresh_copies_values_and_status() {
        let mut live = DeviceModel::<PumpKind>::new().unwrap();
        let mut staged = live.clone();
        staged.set(Pump::Pressure, 42u32).unwrap();
        staged.mark(StatusCode::Good);

        live.refresh(Some(&staged));
        assert!(live.is_good());
        assert_eq!(live.get(Pump::Pressure), &RegisterValue::U32(42));

        live.refresh(None);
        assert!(live.is_uncertain());
        assert_eq!(live.get(Pump::Pressure), &RegisterValue::U32(42));
    }

    #[test]
    fn test_mark_keeps_values() {
        let mut model = DeviceModel::<PumpKind>::new().unwrap();
        model.set(Pump::Speed, 900.0f32).unwrap();
        model.mark(StatusCode::BadTimeout);
        assert!(model.is_bad());
        assert_eq!(model.status().code(), StatusCode::BadTimeout);
        assert_eq!(model.get(Pump::Speed), &RegisterValue::F32(900.0));
    }

    #[test]
    fn test_snapshot() {
        let mut model = DeviceModel::<PumpKind>::new().unwrap();
        model.set(Pump::Pressure, 100u32).unwrap();
        model.mark(StatusCode::Good);

        let snapshot = model.snapshot();
        assert_eq!(snapshot.device, "pump");
        assert_eq!(snapshot.status, StatusCode::Good);
        assert_eq!(snapshot.fields.len(), 5);

        let pressure = snapshot.field("pressure").unwrap();
        assert_eq!(pressure.value, Some(1.0));
        assert_eq!(pressure.display, "1.00");
        assert_eq!(pressure.unit, "bar");

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["status"], "good");
        assert_eq!(json["fields"][0]["raw"], 100);
    }
}
