//! Built-in device models

pub mod energy_meter;
pub mod pellet_boiler;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use energy_meter::{EnergyMeter, MeterField, Phase};
pub use pellet_boiler::{BoilerField, BoilerState, OperatingMode, PelletBoiler};

/// Kinds of built-in device, for selecting a model at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    PelletBoiler,
    EnergyMeter,
}

impl DeviceType {
    pub const ALL: [DeviceType; 2] = [DeviceType::PelletBoiler, DeviceType::EnergyMeter];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PelletBoiler => "pellet_boiler",
            Self::EnergyMeter => "energy_meter",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::PelletBoiler => "Wood-pellet boiler controller (temperatures, counters, set-points)",
            Self::EnergyMeter => "Three-phase energy meter (per-phase V/A/W, import/export energy)",
        }
    }

    /// Parse from string representation (case-insensitive, `-` or `_`)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "pellet_boiler" | "boiler" => Some(Self::PelletBoiler),
            "energy_meter" | "meter" => Some(Self::EnergyMeter),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown device type: {s}"))
    }
}
