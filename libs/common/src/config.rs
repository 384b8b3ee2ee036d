//! Layered configuration loading
//!
//! Priority (highest to lowest):
//! 1. Environment variables prefixed with `<NAME>_`
//! 2. Config file (format chosen by extension)
//! 3. `T::default()`

use std::path::Path;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Load `T` for the tool called `name`, optionally from `path`
///
/// A missing file is an error when a path is given explicitly. Nested keys
/// are reached through `__` in environment variables, e.g.
/// `REGDUMP_LOG__LEVEL=debug`.
pub fn load_config<T>(name: &str, path: Option<&Path>) -> Result<T>
where
    T: Serialize + for<'de> Deserialize<'de> + Default,
{
    let mut figment = Figment::from(Serialized::defaults(T::default()));

    if let Some(path) = path {
        if !path.exists() {
            return Err(Error::config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        figment = merge_file(figment, path)?;
    }

    figment
        .merge(Env::prefixed(&format!("{}_", name.to_uppercase())).split("__"))
        .extract()
        .map_err(|e| Error::config(format!("Failed to load configuration: {}", e)))
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::config("Config file must have an extension"))?;

    match extension {
        "toml" => Ok(figment.merge(Toml::file(path))),
        "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
        "json" => Ok(figment.merge(Json::file(path))),
        _ => Err(Error::config(format!(
            "Unsupported config file format: {}",
            extension
        ))),
    }
}
