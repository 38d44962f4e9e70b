//! Bridge logs written through the telemetry crate.
//!
//! Installs a global subscriber, so this binary holds a single test.

use std::sync::Arc;

use tonbridge::{Bridge, BridgeConfig, ResponseKind, ResponseRoute};
use tonbridge_telemetry::{FileRotation, LogConfig, LogFormat, setup_logging};
use tonbridge_test::{MockEngine, MockRuntime};

#[test]
fn test_dropped_callbacks_reach_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = BridgeConfig::from_toml_str("[logging]\nformat = \"json\"\n").unwrap();
    let log_config = LogConfig::try_from(&config.logging)
        .unwrap()
        .with_file_logging(dir.path(), "tonbridge", FileRotation::Never);
    assert_eq!(log_config.format, LogFormat::Json);
    setup_logging(&log_config).unwrap();

    let bridge = Bridge::new(
        Arc::new(MockEngine::new()),
        Arc::new(MockRuntime::new()),
        &config,
    );
    bridge.dispatch(ResponseRoute::OneShot, 404, b"{}", ResponseKind::SUCCESS, true);

    let log_file = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .find(|path| {
            path.file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with("tonbridge"))
        })
        .unwrap();
    let contents = std::fs::read_to_string(log_file).unwrap();
    let line = contents
        .lines()
        .find(|line| line.contains("no live correlation entry"))
        .unwrap();
    let record: serde_json::Value = serde_json::from_str(line).unwrap();

    assert_eq!(record["level"], "WARN");
    assert_eq!(record["fields"]["key"], "token #404");
}
