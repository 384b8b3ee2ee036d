//! Tool configuration
//!
//! Loaded from defaults, an optional YAML/TOML/JSON file and `REGDUMP_*`
//! environment variables, in that order.

use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use common::LogConfig;
use serde::{Deserialize, Serialize};

/// How command results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegdumpConfig {
    pub log: LogConfig,
    /// Device used when a command omits one
    pub default_device: Option<String>,
    /// Word written into gap registers by `encode`
    pub gap_fill: u16,
    pub output: OutputFormat,
}

impl Default for RegdumpConfig {
    fn default() -> Self {
        Self {
            log: LogConfig::default(),
            default_device: None,
            gap_fill: 0x0000,
            output: OutputFormat::Table,
        }
    }
}

impl RegdumpConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        common::load_config("regdump", path).context("Failed to load regdump configuration")
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use common::LogFormat;

    #[test]
    fn test_yaml_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("regdump.yaml");
        std::fs::write(
            &path,
            "default_device: meter\ngap_fill: 65535\noutput: json\nlog:\n  format: json\n",
        )
        .unwrap();

        let config = RegdumpConfig::load(Some(&path)).unwrap();
        assert_eq!(config.default_device.as_deref(), Some("meter"));
        assert_eq!(config.gap_fill, 0xFFFF);
        assert_eq!(config.output, OutputFormat::Json);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.level, "warn");
    }
}
