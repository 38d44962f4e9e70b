//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::BridgeConfig;

/// Accepted `logging.level` values.
pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Accepted `logging.format` values.
pub const VALID_LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &BridgeConfig) -> ConfigResult<()> {
    validate_correlation(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_correlation(config: &BridgeConfig) -> ConfigResult<()> {
    // Tokens are u32 and zero is reserved, so a larger limit can never bind.
    let ceiling = usize::try_from(u32::MAX).unwrap_or(usize::MAX);
    if config.correlation.max_live_entries > ceiling {
        return Err(ConfigError::ValidationError {
            field: "correlation.max_live_entries".to_owned(),
            message: format!("must be at most {ceiling}, or 0 for unlimited"),
        });
    }
    Ok(())
}

fn validate_logging(config: &BridgeConfig) -> ConfigResult<()> {
    if !VALID_LOG_LEVELS.contains(&config.logging.level.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                VALID_LOG_LEVELS.join(", ")
            ),
        });
    }

    if !VALID_LOG_FORMATS.contains(&config.logging.format.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                VALID_LOG_FORMATS.join(", ")
            ),
        });
    }

    for directive in &config.logging.directives {
        if directive.trim().is_empty() || directive.contains(char::is_whitespace) {
            return Err(ConfigError::ValidationError {
                field: "logging.directives".to_owned(),
                message: format!("invalid directive '{directive}'"),
            });
        }
    }

    Ok(())
}
