//! Configuration loading.
//!
//! Layers, lowest to highest priority: embedded defaults, `TONBRIDGE_*`
//! environment fallbacks, then the config file. The merged tree is
//! deserialized and validated.

use std::collections::{BTreeSet, HashMap};
use std::hash::BuildHasher;
use std::path::Path;

use tracing::debug;

use crate::env::apply_env_fallbacks;
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{deep_merge, leaf_paths};
use crate::types::BridgeConfig;
use crate::validate;

/// The embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load configuration, reading env fallbacks from the process environment.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, an env
/// var is malformed, or the result fails validation.
pub fn load(path: Option<&Path>) -> ConfigResult<BridgeConfig> {
    let env_vars: HashMap<String, String> = std::env::vars().collect();
    load_with_env(path, &env_vars)
}

/// Load configuration with an explicit environment.
///
/// # Errors
///
/// Same as [`load`].
pub fn load_with_env<S: BuildHasher>(
    path: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<BridgeConfig> {
    let mut merged = defaults()?;

    let mut file_fields = BTreeSet::new();
    if let Some(path) = path {
        let overlay = read_file(path)?;
        file_fields = leaf_paths(&overlay);
        deep_merge(&mut merged, &overlay);
        debug!(path = %path.display(), fields = file_fields.len(), "merged config file");
    }

    let env_count = apply_env_fallbacks(&mut merged, &file_fields, env_vars)?;
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    finish(merged, "<merged config>")
}

/// Parse a config from a TOML string layered over the defaults. No
/// environment fallbacks are applied.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the string cannot be parsed or the result
/// fails validation.
pub fn from_toml_str(content: &str) -> ConfigResult<BridgeConfig> {
    let overlay: toml::Value = toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: "<string>".to_owned(),
        source: e,
    })?;
    let mut merged = defaults()?;
    deep_merge(&mut merged, &overlay);
    finish(merged, "<string>")
}

fn defaults() -> ConfigResult<toml::Value> {
    toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
        path: "<embedded defaults>".to_owned(),
        source: e,
    })
}

fn finish(merged: toml::Value, origin: &str) -> ConfigResult<BridgeConfig> {
    let config: BridgeConfig =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: origin.to_owned(),
                source: e,
            })?;
    validate::validate(&config)?;
    Ok(config)
}

fn read_file(path: &Path) -> ConfigResult<toml::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}
