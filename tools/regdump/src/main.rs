//! regdump - register map inspector
//!
//! Shows the block layout of the built-in device models, decodes raw
//! register dumps and encodes blocks to hex, without touching a device.

mod commands;
mod config;
mod output;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use regmap::devices::DeviceType;
use tracing::debug;

use crate::commands::{Assignment, DeviceAction};
use crate::config::{OutputFormat, RegdumpConfig};

#[derive(Parser)]
#[command(name = "regdump")]
#[command(about = "Inspect, decode and encode device register blocks")]
#[command(long_about = "Inspect, decode and encode device register blocks

Examples:
  regdump devices
  regdump layout boiler
  regdump decode boiler measurements 028C 0000 0000 0000 0000 0000 0002 0032 0001 0000 0000 0000
  regdump encode meter config --set CtRatio=40
  regdump -o json decode meter config 0x0028")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (yaml, toml or json)
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Output format, overrides the configuration
    #[arg(short = 'o', long, global = true, value_enum)]
    output: Option<OutputFormat>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in device models
    Devices,

    /// Show blocks and field layout of a device
    Layout {
        /// Device type (pellet_boiler, energy_meter); defaults to the configured device
        device: Option<String>,
    },

    /// Decode a raw block dump given as hex words
    Decode {
        /// Device type
        device: String,
        /// Block name
        block: String,
        /// Register words, e.g. 028C 0x0000 (commas allowed)
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },

    /// Encode a block from field assignments
    Encode {
        /// Device type
        device: String,
        /// Block name
        block: String,
        /// Field assignment name=value, repeatable
        #[arg(short, long = "set")]
        set: Vec<Assignment>,
        /// Word for gap registers, overrides the configuration
        #[arg(long)]
        fill: Option<String>,
    },
}

fn resolve_device(requested: Option<&str>, config: &RegdumpConfig) -> Result<DeviceType> {
    let name = requested
        .or(config.default_device.as_deref())
        .ok_or_else(|| anyhow!("No device given and no default_device configured"))?;
    name.parse::<DeviceType>().map_err(|e| anyhow!(e))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let mut config = RegdumpConfig::load(cli.config.as_deref())?;
    if cli.verbose {
        config.log.level = "debug".to_string();
    }
    if let Some(output) = cli.output {
        config.output = output;
    }
    common::init_logging(&config.log)?;
    debug!("Loaded configuration: {:?}", config);

    let (device, action) = match cli.command {
        Commands::Devices => {
            return output::print_devices(&commands::summaries()?, config.output);
        },
        Commands::Layout { device } => (
            resolve_device(device.as_deref(), &config)?,
            DeviceAction::Layout,
        ),
        Commands::Decode {
            device,
            block,
            words,
        } => {
            let words = common::hex::parse_words(&words.join(" "))
                .context("Invalid register dump")?;
            (
                resolve_device(Some(&device), &config)?,
                DeviceAction::Decode { block, words },
            )
        },
        Commands::Encode {
            device,
            block,
            set,
            fill,
        } => {
            let fill = match fill {
                Some(word) => common::hex::parse_word(&word).context("Invalid --fill")?,
                None => config.gap_fill,
            };
            (
                resolve_device(Some(&device), &config)?,
                DeviceAction::Encode {
                    block,
                    assignments: set,
                    fill,
                },
            )
        },
    };

    match commands::execute(device, &action) {
        Ok(report) => output::print_report(&report, config.output),
        Err(e) => {
            eprintln!("{} {:#}", "ERROR".red(), e);
            std::process::exit(1);
        },
    }
}
