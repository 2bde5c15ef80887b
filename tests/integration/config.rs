//! Configuration file loading and scheduler construction.

use roundup::config::{ConfigError, YamlLoader, load_scheduler};
use std::io::Write;
use std::time::Duration;

/// Test: A full configuration file produces a scheduler with those settings.
#[tokio::test]
async fn test_scheduler_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
scheduler:
  batch_size: 4
  round_duration_minutes: 45
  poll_interval_ms: 750
  min_dispatch_gap_secs: 20
  timezone: Asia/Kolkata
backend:
  base_url: http://127.0.0.1:18080/
  candidates_path: candidates
  rounds_path: /rounds
api:
  port: 9001
"#
    )
    .unwrap();

    let (config, scheduler) = load_scheduler(file.path()).unwrap();

    assert_eq!(config.backend.candidates_url(), "http://127.0.0.1:18080/candidates");
    assert_eq!(config.backend.rounds_url(), "http://127.0.0.1:18080/rounds");
    assert_eq!(config.api.port, 9001);

    let settings = scheduler.settings();
    assert_eq!(settings.batch_size, 4);
    assert_eq!(settings.round_duration_minutes, 45);
    assert_eq!(settings.poll_interval, Duration::from_millis(750));
    assert_eq!(settings.min_dispatch_gap, Duration::from_secs(20));
    assert!(!scheduler.is_running());
}

/// Test: Invalid values are reported with the offending field.
#[test]
fn test_invalid_config_file_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "scheduler:\n  batch_size: 0\n  round_duration_minutes: 30\n").unwrap();

    let err = YamlLoader::load_config(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidConfig(_)));
    assert!(err.to_string().contains("batch_size"));
}

/// Test: Malformed YAML names the file.
#[test]
fn test_malformed_yaml_names_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "scheduler: [unclosed").unwrap();

    let err = YamlLoader::load_config(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::YamlFileError { .. }));
    assert!(
        err.to_string()
            .contains(&file.path().display().to_string())
    );
}

/// Test: Unknown fields inside a section are ignored, keeping files forward compatible.
#[test]
fn test_unknown_fields_are_ignored() {
    let config = YamlLoader::parse_config("scheduler:\n  batch_size: 2\n  colour: blue\n").unwrap();
    assert_eq!(config.scheduler.batch_size, 2);
}

/// Test: The shipped example configuration is valid.
#[test]
fn test_example_config_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/roundup.example.yaml");
    let config = YamlLoader::load_config(path).unwrap();

    assert_eq!(config.scheduler.timezone, "Asia/Kolkata");
    assert_eq!(config.backend.api_token_env.as_deref(), Some("ROUNDUP_API_TOKEN"));
}
