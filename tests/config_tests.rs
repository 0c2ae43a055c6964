// Config loading and validation tests

use netperf::config::{AppConfig, OutputFormat};

const VALID_CONFIG: &str = r#"
[reporter]
session_prefix = "probe"
min_window_ms = 250

[host]
poll_interval_secs = 2
target_pid = 4321
output = "json"
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.reporter.session_prefix, "probe");
    assert_eq!(config.reporter.min_window_ms, 250);
    assert_eq!(config.host.poll_interval_secs, 2);
    assert_eq!(config.host.target_pid, Some(4321));
    assert_eq!(config.host.output, OutputFormat::Json);
}

#[test]
fn test_config_defaults_when_empty() {
    let config = AppConfig::load_from_str("").expect("empty config");
    assert_eq!(config.reporter.session_prefix, "netperf");
    assert_eq!(config.reporter.min_window_ms, 1);
    assert_eq!(config.host.poll_interval_secs, 5);
    assert_eq!(config.host.target_pid, None);
    assert_eq!(config.host.output, OutputFormat::Plain);
}

#[test]
fn test_config_partial_section_keeps_other_defaults() {
    let config = AppConfig::load_from_str("[host]\ntarget_pid = 1\n").expect("partial");
    assert_eq!(config.host.target_pid, Some(1));
    assert_eq!(config.host.poll_interval_secs, 5);
    assert_eq!(config.reporter.session_prefix, "netperf");
}

#[test]
fn test_config_validation_rejects_empty_session_prefix() {
    let bad = VALID_CONFIG.replace("session_prefix = \"probe\"", "session_prefix = \" \"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("reporter.session_prefix"));
}

#[test]
fn test_config_validation_rejects_min_window_zero() {
    let bad = VALID_CONFIG.replace("min_window_ms = 250", "min_window_ms = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("min_window_ms"));
}

#[test]
fn test_config_validation_rejects_poll_interval_zero() {
    let bad = VALID_CONFIG.replace("poll_interval_secs = 2", "poll_interval_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("poll_interval_secs"));
}

#[test]
fn test_config_rejects_unknown_output_format() {
    let bad = VALID_CONFIG.replace("output = \"json\"", "output = \"xml\"");
    assert!(AppConfig::load_from_str(&bad).is_err());
}

#[test]
fn test_config_validation_rejects_invalid_toml() {
    let err = AppConfig::load_from_str("not valid toml [[[").unwrap_err();
    assert!(!err.to_string().is_empty());
}

// Only this test touches CONFIG_FILE; the missing-file case is covered in the
// same test so the two never race on the environment.
#[test]
fn test_config_load_from_file_via_env() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("netperf.toml");
    std::fs::write(&path, VALID_CONFIG).unwrap();
    unsafe { std::env::set_var("CONFIG_FILE", path.to_str().unwrap()) };
    let result = AppConfig::load();
    let missing = dir.path().join("missing.toml");
    unsafe { std::env::set_var("CONFIG_FILE", missing.to_str().unwrap()) };
    let missing_result = AppConfig::load();
    unsafe { std::env::remove_var("CONFIG_FILE") };

    let config = result.expect("load from CONFIG_FILE");
    assert_eq!(config.reporter.session_prefix, "probe");
    assert_eq!(config.host.target_pid, Some(4321));
    assert!(missing_result.is_err(), "explicit CONFIG_FILE must exist");
}
