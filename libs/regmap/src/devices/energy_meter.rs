//! Three-phase energy meter
//!
//! Integers are big-endian (`ABCD`); floats are IEEE 754 with the low word
//! first (`CDAB`), as most DIN-rail meters ship them.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::bytes::{BitFlags16, OrderPolicy, RegisterOrder};
use crate::error::Result;
use crate::metadata::FieldMetadata;
use crate::model::DeviceModel;
use crate::schema::{BlockSpec, DeviceKind, DeviceSchema};
use crate::value::DataType;

crate::define_fields! {
    /// Fields of [`EnergyMeter`]
    pub enum MeterField {
        VoltageL1,
        VoltageL2,
        VoltageL3,
        CurrentL1,
        CurrentL2,
        CurrentL3,
        PowerL1,
        PowerL2,
        PowerL3,
        Frequency,
        ImportEnergy,
        ExportEnergy,
        SerialNumber,
        ModelName,
        StatusFlags,
        CtRatio,
    }
}

/// Marker type for the energy meter model
pub struct EnergyMeter;

/// Block names
pub mod blocks {
    pub const INSTANTANEOUS: &str = "instantaneous";
    pub const ENERGY: &str = "energy";
    pub const IDENTIFICATION: &str = "identification";
    pub const CONFIG: &str = "config";
}

static SCHEMA: Lazy<Result<DeviceSchema<MeterField>>> = Lazy::new(|| {
    use MeterField as F;

    let float = |offset, unit| FieldMetadata::read_only(offset, DataType::Float32).with_unit(unit);
    let energy = |offset| FieldMetadata::read_only(offset, DataType::UInt64).with_unit("Wh");

    DeviceSchema::build(
        "energy_meter",
        OrderPolicy::uniform(RegisterOrder::ABCD).with_floats(RegisterOrder::CDAB),
        [
            (F::VoltageL1, float(0, "V")),
            (F::VoltageL2, float(2, "V")),
            (F::VoltageL3, float(4, "V")),
            (F::CurrentL1, float(6, "A")),
            (F::CurrentL2, float(8, "A")),
            (F::CurrentL3, float(10, "A")),
            (F::PowerL1, float(12, "W")),
            (F::PowerL2, float(14, "W")),
            (F::PowerL3, float(16, "W")),
            (F::Frequency, float(18, "Hz")),
            (F::ImportEnergy, energy(256)),
            (F::ExportEnergy, energy(260)),
            (
                F::SerialNumber,
                FieldMetadata::read_only(512, DataType::Text { registers: 8 }),
            ),
            (
                F::ModelName,
                FieldMetadata::read_only(520, DataType::Text { registers: 8 }),
            ),
            (F::StatusFlags, FieldMetadata::read_only(528, DataType::Flags)),
            (F::CtRatio, FieldMetadata::read_write(768, DataType::UInt16)),
        ],
        &[
            BlockSpec::new(blocks::INSTANTANEOUS, 0, 20),
            BlockSpec::new(blocks::ENERGY, 256, 8),
            BlockSpec::new(blocks::IDENTIFICATION, 512, 18),
            BlockSpec::new(blocks::CONFIG, 768, 1),
        ],
    )
});

impl DeviceKind for EnergyMeter {
    type Field = MeterField;

    fn schema() -> Result<&'static DeviceSchema<MeterField>> {
        SCHEMA.as_ref().map_err(Clone::clone)
    }
}

/// Conductor of a three-phase supply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    L1,
    L2,
    L3,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::L1, Phase::L2, Phase::L3];

    fn fields(self) -> (MeterField, MeterField, MeterField) {
        match self {
            Phase::L1 => (MeterField::VoltageL1, MeterField::CurrentL1, MeterField::PowerL1),
            Phase::L2 => (MeterField::VoltageL2, MeterField::CurrentL2, MeterField::PowerL2),
            Phase::L3 => (MeterField::VoltageL3, MeterField::CurrentL3, MeterField::PowerL3),
        }
    }
}

// Status flag bits
pub const STATUS_PHASE_LOSS: u8 = 0;
pub const STATUS_REVERSE_POWER: u8 = 1;
pub const STATUS_OVERVOLTAGE: u8 = 2;
pub const STATUS_TAMPER: u8 = 15;

impl DeviceModel<EnergyMeter> {
    /// Phase-to-neutral voltage in V
    pub fn voltage(&self, phase: Phase) -> f64 {
        self.scaled(phase.fields().0).unwrap_or_default()
    }

    /// Phase current in A
    pub fn current(&self, phase: Phase) -> f64 {
        self.scaled(phase.fields().1).unwrap_or_default()
    }

    /// Active power in W, negative when exporting
    pub fn power(&self, phase: Phase) -> f64 {
        self.scaled(phase.fields().2).unwrap_or_default()
    }

    /// Sum of the three phase powers in W
    pub fn total_power(&self) -> f64 {
        Phase::ALL.iter().map(|p| self.power(*p)).sum()
    }

    pub fn frequency(&self) -> f64 {
        self.scaled(MeterField::Frequency).unwrap_or_default()
    }

    /// Imported energy in kWh
    pub fn import_kwh(&self) -> f64 {
        self.scaled(MeterField::ImportEnergy).unwrap_or_default() / 1000.0
    }

    /// Exported energy in kWh
    pub fn export_kwh(&self) -> f64 {
        self.scaled(MeterField::ExportEnergy).unwrap_or_default() / 1000.0
    }

    pub fn serial_number(&self) -> &str {
        self.text(MeterField::SerialNumber)
    }

    pub fn model_name(&self) -> &str {
        self.text(MeterField::ModelName)
    }

    pub fn status_flags(&self) -> BitFlags16 {
        self.flags(MeterField::StatusFlags)
    }

    /// Stage a new current-transformer ratio
    pub fn set_ct_ratio(&mut self, ratio: u16) -> Result<()> {
        self.stage_write(MeterField::CtRatio, ratio)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::block::BlockAggregator;
    use crate::bytes::{encode_text, RegisterCodec};

    #[test]
    fn test_schema_builds() {
        let schema = EnergyMeter::schema().unwrap();
        assert_eq!(schema.block(blocks::INSTANTANEOUS).unwrap().members.len(), 10);
        assert!(schema.block(blocks::INSTANTANEOUS).unwrap().gaps().is_empty());
        assert_eq!(schema.block(blocks::ENERGY).unwrap().members.len(), 2);
        assert_eq!(schema.block(blocks::IDENTIFICATION).unwrap().gaps(), vec![17]);
        assert_eq!(schema.order_of(MeterField::VoltageL1).unwrap(), RegisterOrder::CDAB);
        assert_eq!(schema.order_of(MeterField::ImportEnergy).unwrap(), RegisterOrder::ABCD);
    }

    #[test]
    fn test_decode_instantaneous_low_word_first() {
        let schema = EnergyMeter::schema().unwrap();
        let mut buffer = Vec::new();
        for value in [
            230.1f32, 229.8, 231.0, // volts
            5.0, 4.5, 0.5, // amps
            1150.0, 1000.0, -100.0, // watts
            50.0,
        ] {
            buffer.extend(value.encode(RegisterOrder::CDAB));
        }
        // 230.1 is 0x4366199A: low word first on the wire
        assert_eq!(&buffer[..2], &[0x199A, 0x4366]);

        let mut model = DeviceModel::<EnergyMeter>::new().unwrap();
        BlockAggregator::decode(&mut model, schema.block(blocks::INSTANTANEOUS).unwrap(), &buffer)
            .unwrap();

        assert_eq!(model.voltage(Phase::L1), f64::from(230.1f32));
        assert_eq!(model.current(Phase::L3), 0.5);
        assert_eq!(model.power(Phase::L3), -100.0);
        assert_eq!(model.total_power(), 2050.0);
        assert_eq!(model.frequency(), 50.0);
        assert_eq!(model.display(MeterField::VoltageL2), "229.80");
    }

    #[test]
    fn test_energy_and_identification() {
        let schema = EnergyMeter::schema().unwrap();
        let mut model = DeviceModel::<EnergyMeter>::new().unwrap();

        let mut energy = 12_345_678u64.encode(RegisterOrder::ABCD);
        energy.extend(1_500u64.encode(RegisterOrder::ABCD));
        BlockAggregator::decode(&mut model, schema.block(blocks::ENERGY).unwrap(), &energy)
            .unwrap();
        assert_eq!(model.import_kwh(), 12_345.678);
        assert_eq!(model.export_kwh(), 1.5);

        let mut ident = encode_text("71234567", 8, RegisterOrder::ABCD);
        ident.extend(encode_text("DTS353F", 8, RegisterOrder::ABCD));
        ident.extend([0x8002, 0]);
        BlockAggregator::decode(&mut model, schema.block(blocks::IDENTIFICATION).unwrap(), &ident)
            .unwrap();
        assert_eq!(model.serial_number(), "71234567");
        assert_eq!(model.model_name(), "DTS353F");
        assert!(model.status_flags().get(STATUS_REVERSE_POWER));
        assert!(model.status_flags().get(STATUS_TAMPER));
        assert!(!model.status_flags().get(STATUS_PHASE_LOSS));
    }

    #[test]
    fn test_ct_ratio_is_the_only_writable_field() {
        let mut model = DeviceModel::<EnergyMeter>::new().unwrap();
        model.set_ct_ratio(40).unwrap();
        assert!(model.stage_write(MeterField::Frequency, 60.0f32).is_err());
    }
}
