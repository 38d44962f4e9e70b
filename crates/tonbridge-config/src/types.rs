//! Configuration struct definitions.
//!
//! Every struct derives `Default` with the same values as the embedded
//! `defaults.toml`, so a config built in code and one loaded from an empty
//! file are identical.

use serde::{Deserialize, Serialize};

/// Top-level bridge configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Correlation table settings.
    pub correlation: CorrelationConfig,
    /// Callback dispatch settings.
    pub dispatch: DispatchConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Correlation table settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Maximum live one-shot entries (0 = unlimited).
    pub max_live_entries: usize,
    /// Log each entry still live at shutdown.
    pub warn_on_shutdown_leaks: bool,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            max_live_entries: 0,
            warn_on_shutdown_leaks: true,
        }
    }
}

/// Callback dispatch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Log dropped callbacks at `warn` instead of `debug`.
    pub log_dropped_events: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            log_dropped_events: true,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Output format (`pretty`, `compact`, `json`, `full`).
    pub format: String,
    /// Extra filter directives (e.g. `tonbridge_correlation=trace`).
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
