/*!
 * Tests for application configuration functionality
 */

use std::path::PathBuf;

use wikireplica::app_config::{Config, LogLevel};
use wikireplica::errors::ConfigError;

use crate::common::{create_temp_dir, create_test_file};

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.replica.host, "analytics.db.svc.wikimedia.cloud");
    assert_eq!(config.replica.meta_database, "meta_p");
    assert_eq!(config.replica.port, None);
    assert!(config.replica.port_overrides.is_empty());
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.retry.backoff_ms, 1000);
    assert!(config.retry.exponential);
    assert_eq!(config.output_dir, PathBuf::from("output").join("sqlresults"));
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

#[test]
fn test_fromFile_withPartialJson_shouldFillDefaults() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(
        dir.path(),
        "wikireplica.json",
        r#"{
            "replica": {
                "host": "db.local",
                "port_overrides": {"db.local/meta_p": 3307}
            },
            "retry": {"max_attempts": 5},
            "log_level": "debug"
        }"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.replica.host, "db.local");
    assert_eq!(config.replica.meta_database, "meta_p");
    assert_eq!(config.replica.explicit_port("db.local", "meta_p"), Some(3307));
    assert_eq!(config.replica.explicit_port("db.local", "frwiki_p"), None);
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.retry.backoff_ms, 1000);
    assert_eq!(config.log_level, LogLevel::Debug);
}

#[test]
fn test_loadOrDefault_withMissingFile_shouldReturnDefaults() {
    let dir = create_temp_dir().unwrap();
    let config = Config::load_or_default(dir.path().join("absent.json")).unwrap();
    assert_eq!(config.retry.max_attempts, 3);
}

#[test]
fn test_fromFile_withBrokenJson_shouldReturnParseError() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), "bad.json", "{ not json").unwrap();
    assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse { .. })));
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    config.retry.max_attempts = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.replica.host = "  ".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.replica.port_overrides.insert("h".to_string(), 0);
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_credentialsDir_withExplicitDir_shouldUseIt() {
    let mut config = Config::default();
    config.replica.credentials_dir = Some(PathBuf::from("/etc/replica"));
    assert_eq!(config.replica.credentials_dir(), PathBuf::from("/etc/replica"));
}
