//! Configuration Module Tests
//!
//! Defaults, validation, and layered loading through `ConfigManager`.

use decision_core::config::ConfigurationError;
use decision_core::{ConfigManager, DecisionServiceConfig};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

#[test]
fn config_has_expected_defaults() {
    let config = DecisionServiceConfig::default();

    assert_eq!(config.ttl_seconds, 5);
    assert_eq!(config.max_size, 10_000);
    assert_eq!(config.failure_threshold, 3);
    assert_eq!(config.recovery_check_interval_seconds, 10);
    assert_eq!(config.hit_rate_target, 0.8);
    assert_eq!(config.alert_hit_rate_threshold, 0.5);
    assert_eq!(config.alert_error_rate_threshold, 0.1);
    assert_eq!(config.alert_check_interval_seconds, 60);
    assert_eq!(config.local_inference_timeout(), Duration::from_millis(20));
    assert_eq!(config.key_prefix, "decision:");
    assert!(config.warmup_seeds.is_empty());
    assert!(config.validate().is_ok());
}

#[test]
fn zero_ttl_is_rejected() {
    let config = DecisionServiceConfig {
        ttl_seconds: 0,
        ..DecisionServiceConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
    assert!(ConfigManager::from_config(config).is_err());
}

#[test]
fn file_with_environment_override_loads() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("decision-core.toml");
    fs::write(
        &base,
        r#"
ttl_seconds = 30
max_size = 250
key_prefix = "svc:"

[[warmup_seeds]]
symbol = "BTC"
fields = { price = 100.0, volume = 5 }
"#,
    )
    .unwrap();
    fs::create_dir_all(dir.path().join("environments")).unwrap();
    fs::write(
        dir.path().join("environments").join("production.toml"),
        "max_size = 50000\nfailure_threshold = 5\n",
    )
    .unwrap();

    let manager = assert_ok!(ConfigManager::load_from_file_with_env(&base, "production"));
    let config = manager.config();

    assert_eq!(manager.environment(), "production");
    assert_eq!(config.ttl_seconds, 30);
    assert_eq!(config.max_size, 50_000);
    assert_eq!(config.failure_threshold, 5);
    assert_eq!(config.key_prefix, "svc:");
    assert_eq!(config.warmup_seeds.len(), 1);
    assert_eq!(config.warmup_seeds[0].symbol(), "BTC");
}

#[test]
fn invalid_file_values_fail_loading() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("decision-core.toml");
    fs::write(&base, "alert_hit_rate_threshold = 1.5\n").unwrap();

    let result = ConfigManager::load_from_file_with_env(&base, "test");
    assert!(matches!(
        result,
        Err(ConfigurationError::InvalidValue { .. })
    ));
}

#[test]
fn missing_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let err = assert_err!(ConfigManager::load_from_file_with_env(
        &dir.path().join("absent.toml"),
        "test"
    ));
    assert!(matches!(err, ConfigurationError::ConfigFileNotFound { .. }));
}
