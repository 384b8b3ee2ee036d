//! Pellet boiler controller
//!
//! Register map of a wood-pellet boiler controller. All values are big-endian
//! (`ABCD`); temperatures are signed tenths of a degree.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::bytes::{BitFlags16, OrderPolicy, RegisterOrder};
use crate::error::{RegMapError, Result};
use crate::metadata::{FieldId, FieldMetadata};
use crate::model::DeviceModel;
use crate::schema::{BlockSpec, DeviceKind, DeviceSchema};
use crate::value::{DataType, RegisterValue};

crate::define_fields! {
    /// Fields of [`PelletBoiler`]
    pub enum BoilerField {
        BoilerTemperature,
        FlueGasTemperature,
        OutdoorTemperature,
        HotWaterTemperature,
        ReturnTemperature,
        BoilerState,
        Modulation,
        StatusFlags,
        ErrorFlags,
        ErrorCode,
        OperatingHours,
        BurnerStarts,
        PelletConsumption,
        SerialNumber,
        FirmwareVersion,
        OperatingMode,
        BoilerSetpoint,
        HotWaterSetpoint,
    }
}

/// Marker type for the pellet boiler model
pub struct PelletBoiler;

/// Block names
pub mod blocks {
    pub const MEASUREMENTS: &str = "measurements";
    pub const COUNTERS: &str = "counters";
    pub const IDENTIFICATION: &str = "identification";
    pub const SETTINGS: &str = "settings";
}

static SCHEMA: Lazy<Result<DeviceSchema<BoilerField>>> = Lazy::new(|| {
    use BoilerField as F;

    let temperature = |offset| {
        FieldMetadata::read_only(offset, DataType::Int16)
            .with_scale(10.0)
            .with_unit("°C")
    };

    DeviceSchema::build(
        "pellet_boiler",
        OrderPolicy::uniform(RegisterOrder::ABCD),
        [
            // Measurements
            (F::BoilerTemperature, temperature(0)),
            (F::FlueGasTemperature, temperature(1)),
            (F::OutdoorTemperature, temperature(2)),
            (F::HotWaterTemperature, temperature(3)),
            (F::ReturnTemperature, temperature(4)),
            (F::BoilerState, FieldMetadata::read_only(6, DataType::UInt16)),
            (
                F::Modulation,
                FieldMetadata::read_only(7, DataType::UInt16).with_unit("%"),
            ),
            (F::StatusFlags, FieldMetadata::read_only(8, DataType::Flags)),
            (F::ErrorFlags, FieldMetadata::read_only(9, DataType::Flags)),
            (F::ErrorCode, FieldMetadata::read_only(10, DataType::UInt16)),
            // Counters
            (
                F::OperatingHours,
                FieldMetadata::read_only(100, DataType::UInt32).with_unit("h"),
            ),
            (F::BurnerStarts, FieldMetadata::read_only(102, DataType::UInt32)),
            (
                F::PelletConsumption,
                FieldMetadata::read_only(104, DataType::UInt32)
                    .with_scale(10.0)
                    .with_unit("kg"),
            ),
            // Identification
            (
                F::SerialNumber,
                FieldMetadata::read_only(200, DataType::Text { registers: 8 }),
            ),
            (
                F::FirmwareVersion,
                FieldMetadata::read_only(208, DataType::UInt16).with_scale(100.0),
            ),
            // Settings
            (F::OperatingMode, FieldMetadata::read_write(300, DataType::UInt16)),
            (
                F::BoilerSetpoint,
                FieldMetadata::read_write(301, DataType::Int16)
                    .with_scale(10.0)
                    .with_unit("°C"),
            ),
            (
                F::HotWaterSetpoint,
                FieldMetadata::read_write(302, DataType::Int16)
                    .with_scale(10.0)
                    .with_unit("°C"),
            ),
        ],
        &[
            BlockSpec::new(blocks::MEASUREMENTS, 0, 12),
            BlockSpec::new(blocks::COUNTERS, 100, 8),
            BlockSpec::new(blocks::IDENTIFICATION, 200, 10),
            BlockSpec::new(blocks::SETTINGS, 300, 4),
        ],
    )
});

impl DeviceKind for PelletBoiler {
    type Field = BoilerField;

    fn schema() -> Result<&'static DeviceSchema<BoilerField>> {
        SCHEMA.as_ref().map_err(Clone::clone)
    }
}

/// Combustion state reported in `BoilerState`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoilerState {
    Off,
    Standby,
    Ignition,
    Heating,
    Burnout,
    Cleaning,
    Fault,
    Unknown(u16),
}

impl From<u16> for BoilerState {
    fn from(raw: u16) -> Self {
        match raw {
            0 => Self::Off,
            1 => Self::Standby,
            2 => Self::Ignition,
            3 => Self::Heating,
            4 => Self::Burnout,
            5 => Self::Cleaning,
            99 => Self::Fault,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for BoilerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "OFF"),
            Self::Standby => write!(f, "STANDBY"),
            Self::Ignition => write!(f, "IGNITION"),
            Self::Heating => write!(f, "HEATING"),
            Self::Burnout => write!(f, "BURNOUT"),
            Self::Cleaning => write!(f, "CLEANING"),
            Self::Fault => write!(f, "FAULT"),
            Self::Unknown(raw) => write!(f, "UNKNOWN({})", raw),
        }
    }
}

/// Operating mode set through `OperatingMode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    Off = 0,
    Auto = 1,
    HotWaterOnly = 2,
    Manual = 3,
}

impl OperatingMode {
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(Self::Off),
            1 => Some(Self::Auto),
            2 => Some(Self::HotWaterOnly),
            3 => Some(Self::Manual),
            _ => None,
        }
    }
}

// Status flag bits
pub const STATUS_BURNER_ON: u8 = 0;
pub const STATUS_PUMP_ON: u8 = 1;
pub const STATUS_FEED_ON: u8 = 2;
pub const STATUS_HOT_WATER_DEMAND: u8 = 3;
/// Auger feed stage 0-7, packed in bits 4..7
pub const STATUS_FEED_STAGE: (u8, u8) = (4, 3);

// Setpoint limits, °C
const BOILER_SETPOINT_RANGE: (f64, f64) = (30.0, 90.0);
const HOT_WATER_SETPOINT_RANGE: (f64, f64) = (10.0, 70.0);

impl DeviceModel<PelletBoiler> {
    pub fn boiler_temperature(&self) -> f64 {
        self.scaled(BoilerField::BoilerTemperature).unwrap_or_default()
    }

    pub fn flue_gas_temperature(&self) -> f64 {
        self.scaled(BoilerField::FlueGasTemperature).unwrap_or_default()
    }

    pub fn outdoor_temperature(&self) -> f64 {
        self.scaled(BoilerField::OutdoorTemperature).unwrap_or_default()
    }

    pub fn hot_water_temperature(&self) -> f64 {
        self.scaled(BoilerField::HotWaterTemperature).unwrap_or_default()
    }

    pub fn boiler_state(&self) -> BoilerState {
        BoilerState::from(self.code(BoilerField::BoilerState))
    }

    pub fn operating_mode(&self) -> Option<OperatingMode> {
        OperatingMode::from_raw(self.code(BoilerField::OperatingMode))
    }

    pub fn status_flags(&self) -> BitFlags16 {
        self.flags(BoilerField::StatusFlags)
    }

    pub fn burner_on(&self) -> bool {
        self.status_flags().get(STATUS_BURNER_ON)
    }

    pub fn feed_stage(&self) -> u16 {
        let (start, len) = STATUS_FEED_STAGE;
        self.status_flags().field(start, len)
    }

    /// Check if the controller reports any error
    pub fn has_error(&self) -> bool {
        self.flags(BoilerField::ErrorFlags).bits() != 0
            || self.code(BoilerField::ErrorCode) != 0
    }

    /// Total pellet consumption in kg
    pub fn pellet_consumption(&self) -> f64 {
        self.scaled(BoilerField::PelletConsumption).unwrap_or_default()
    }

    pub fn serial_number(&self) -> &str {
        self.text(BoilerField::SerialNumber)
    }

    /// Unscaled value of an enumerated 16-bit field
    fn code(&self, field: BoilerField) -> u16 {
        match self.get(field) {
            RegisterValue::U16(raw) => *raw,
            _ => 0,
        }
    }

    /// Stage a new operating mode
    pub fn set_operating_mode(&mut self, mode: OperatingMode) -> Result<()> {
        self.stage_write(BoilerField::OperatingMode, mode as u16)
    }

    /// Stage a boiler set-point in °C
    pub fn set_boiler_setpoint(&mut self, celsius: f64) -> Result<()> {
        self.stage_tenths(BoilerField::BoilerSetpoint, celsius, BOILER_SETPOINT_RANGE)
    }

    /// Stage a hot-water set-point in °C
    pub fn set_hot_water_setpoint(&mut self, celsius: f64) -> Result<()> {
        self.stage_tenths(BoilerField::HotWaterSetpoint, celsius, HOT_WATER_SETPOINT_RANGE)
    }

    fn stage_tenths(&mut self, field: BoilerField, celsius: f64, (min, max): (f64, f64)) -> Result<()> {
        if !(min..=max).contains(&celsius) {
            return Err(RegMapError::invalid_value(
                field.name(),
                format!("{celsius} °C outside {min}..={max}"),
            ));
        }
        let raw = (celsius * 10.0).round() as i16;
        self.stage_write(field, raw)
    }
}
