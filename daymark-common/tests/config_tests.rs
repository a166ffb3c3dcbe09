//! Integration tests for configuration loading and graceful degradation
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate DAYMARK_* variables are marked with #[serial].

use daymark_common::config::{
    load_toml_config, resolve_api_key, ConfigResolver, TomlConfig, CONFIG_ENV_VAR,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_partial_toml_keeps_defaults_for_missing_sections() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("daymark.toml");
    std::fs::write(
        &path,
        r#"
[dispatch]
min_interval_ms = 50

[tiers.primary]
query = "rocket launches"
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();

    assert_eq!(config.dispatch.min_interval_ms, 50);
    // Field omitted inside a present section falls back to its default
    assert_eq!(config.dispatch.max_in_flight, 3);
    assert_eq!(config.tiers.primary.query, "rocket launches");
    assert!(config.tiers.primary.include_domains.is_empty());
    // Untouched sections keep compiled defaults
    assert_eq!(config.server, TomlConfig::default().server);
    assert_eq!(config.tiers.tertiary, TomlConfig::default().tiers.tertiary);
}

#[test]
fn test_malformed_toml_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "[dispatch\nmax_in_flight = ").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(matches!(err, daymark_common::Error::Config(_)));
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    env::remove_var(CONFIG_ENV_VAR);
    let resolver = ConfigResolver::new(Some(PathBuf::from("/nonexistent/daymark.toml")));

    let config = resolver.load();

    assert_eq!(config, TomlConfig::default());
}

#[test]
#[serial]
fn test_cli_path_beats_environment() {
    let temp_dir = TempDir::new().unwrap();
    let cli_path = temp_dir.path().join("cli.toml");
    let env_path = temp_dir.path().join("env.toml");
    std::fs::write(&cli_path, "[server]\nport = 6001\n").unwrap();
    std::fs::write(&env_path, "[server]\nport = 6002\n").unwrap();

    env::set_var(CONFIG_ENV_VAR, &env_path);
    let from_cli = ConfigResolver::new(Some(cli_path.clone())).load();
    let from_env = ConfigResolver::new(None).load();
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(from_cli.server.port, 6001);
    assert_eq!(from_env.server.port, 6002);
}

#[test]
#[serial]
fn test_api_key_environment_wins_over_toml() {
    env::set_var("DAYMARK_TEST_KEY", "env-key");
    let key = resolve_api_key("Test", "DAYMARK_TEST_KEY", Some("toml-key"));
    env::remove_var("DAYMARK_TEST_KEY");

    assert_eq!(key.as_deref(), Some("env-key"));
}

#[test]
#[serial]
fn test_api_key_blank_sources_are_ignored() {
    env::set_var("DAYMARK_TEST_KEY", "   ");
    let key = resolve_api_key("Test", "DAYMARK_TEST_KEY", Some("toml-key"));
    let none = resolve_api_key("Test", "DAYMARK_TEST_KEY", Some(""));
    env::remove_var("DAYMARK_TEST_KEY");

    assert_eq!(key.as_deref(), Some("toml-key"));
    assert!(none.is_none());
}
