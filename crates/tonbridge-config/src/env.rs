//! Environment variable fallbacks.
//!
//! Env vars are **fallback**, not override: they only apply to fields that
//! the config file did not set.

use std::collections::{BTreeSet, HashMap};
use std::hash::BuildHasher;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::set_path;

#[derive(Clone, Copy)]
enum FieldKind {
    Integer,
    Boolean,
    Text,
}

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    kind: FieldKind,
}

/// All supported `TONBRIDGE_*` env var mappings.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "TONBRIDGE_MAX_LIVE_ENTRIES",
        field_path: "correlation.max_live_entries",
        kind: FieldKind::Integer,
    },
    EnvMapping {
        var_name: "TONBRIDGE_WARN_ON_SHUTDOWN_LEAKS",
        field_path: "correlation.warn_on_shutdown_leaks",
        kind: FieldKind::Boolean,
    },
    EnvMapping {
        var_name: "TONBRIDGE_LOG_DROPPED_EVENTS",
        field_path: "dispatch.log_dropped_events",
        kind: FieldKind::Boolean,
    },
    EnvMapping {
        var_name: "TONBRIDGE_LOG_LEVEL",
        field_path: "logging.level",
        kind: FieldKind::Text,
    },
    EnvMapping {
        var_name: "TONBRIDGE_LOG_FORMAT",
        field_path: "logging.format",
        kind: FieldKind::Text,
    },
];

/// Apply environment variable fallbacks to fields not in `file_fields`.
///
/// Returns the number of env vars applied.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if a variable cannot be parsed as the
/// type of its field.
pub fn apply_env_fallbacks<S: BuildHasher>(
    merged: &mut toml::Value,
    file_fields: &BTreeSet<String>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<usize> {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if file_fields.contains(mapping.field_path) {
            continue;
        }
        let Some(raw) = env_vars.get(mapping.var_name) else {
            continue;
        };

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        set_path(merged, mapping.field_path, coerce(mapping, raw)?);
        count = count.saturating_add(1);
    }

    Ok(count)
}

fn coerce(mapping: &EnvMapping, raw: &str) -> ConfigResult<toml::Value> {
    let raw = raw.trim();
    match mapping.kind {
        FieldKind::Integer => raw
            .parse::<i64>()
            .ok()
            .filter(|n| *n >= 0)
            .map(toml::Value::Integer)
            .ok_or_else(|| ConfigError::EnvError {
                var_name: mapping.var_name.to_owned(),
                message: format!("expected a non-negative integer, got '{raw}'"),
            }),
        FieldKind::Boolean => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(toml::Value::Boolean(true)),
            "0" | "false" | "no" | "off" => Ok(toml::Value::Boolean(false)),
            _ => Err(ConfigError::EnvError {
                var_name: mapping.var_name.to_owned(),
                message: format!("expected a boolean, got '{raw}'"),
            }),
        },
        FieldKind::Text => Ok(toml::Value::String(raw.to_owned())),
    }
}
