#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Layered configuration for the tonbridge engine bridge.
//!
//! # Usage
//!
//! ```rust,no_run
//! use tonbridge_config::BridgeConfig;
//!
//! let config = BridgeConfig::load(Some(std::path::Path::new("tonbridge.toml"))).unwrap();
//! println!("live entry limit: {}", config.correlation.max_live_entries);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Config file** passed to [`BridgeConfig::load`]
//! 2. **Environment variables** (`TONBRIDGE_*`), fallback only
//! 3. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! This crate has no dependencies on other tonbridge crates.

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file loading.
pub mod loader;
/// Layered configuration merging.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

use std::path::Path;

pub use error::{ConfigError, ConfigResult};
pub use types::*;

impl BridgeConfig {
    /// Load configuration: defaults, then env fallbacks, then `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if loading or validation fails.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        loader::load(path)
    }

    /// Parse a TOML string layered over the defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if parsing or validation fails.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        loader::from_toml_str(content)
    }
}
