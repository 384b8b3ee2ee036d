//! Shared ambient stack for the regmap workspace
//!
//! Provides:
//! - logging initialisation on top of `tracing-subscriber`
//! - layered configuration loading with `figment`
//! - hex helpers for register dumps

pub mod config;
pub mod error;
pub mod hex;
pub mod logging;

pub use config::load_config;
pub use error::{Error, Result};
pub use logging::{init_logging, init_test_logging, LogConfig, LogFormat};

// Re-export common dependencies
pub use serde;
pub use serde_json;
