use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::ConfigError;

/// Application configuration module
/// This module handles loading, validating and defaulting the settings used
/// to reach the replica databases and to persist the language mapping.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Replica connection settings
    #[serde(default)]
    pub replica: ReplicaConfig,

    /// Connect retry settings
    #[serde(default)]
    pub retry: RetryConfig,

    /// Directory holding the persisted mapping snapshot
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Where and how to connect
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReplicaConfig {
    /// Replica host name
    #[serde(default = "default_host")]
    pub host: String,

    /// Explicit port applied to every host, overriding the caller's port
    #[serde(default)]
    pub port: Option<u16>,

    /// Per-target ports, keyed by `host` or `host/database`
    #[serde(default)]
    pub port_overrides: BTreeMap<String, u16>,

    /// Directory of per-host credential files
    #[serde(default)]
    pub credentials_dir: Option<PathBuf>,

    /// Registry database holding the language table
    #[serde(default = "default_meta_database")]
    pub meta_database: String,

    /// Per-attempt connect timeout in seconds
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,

    /// Per-statement timeout in seconds
    #[serde(default)]
    pub query_timeout_secs: Option<u64>,
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: None,
            port_overrides: BTreeMap::new(),
            credentials_dir: None,
            meta_database: default_meta_database(),
            connect_timeout_secs: None,
            query_timeout_secs: None,
        }
    }
}

impl ReplicaConfig {
    /// Explicit port configured for `host`/`database`, most specific key first
    pub fn explicit_port(&self, host: &str, database: &str) -> Option<u16> {
        self.port_overrides
            .get(&format!("{}/{}", host, database))
            .or_else(|| self.port_overrides.get(host))
            .copied()
            .or(self.port)
    }

    /// Directory credential files are read from
    pub fn credentials_dir(&self) -> PathBuf {
        match &self.credentials_dir {
            Some(dir) => dir.clone(),
            None => default_credentials_dir(),
        }
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_secs.map(Duration::from_secs)
    }
}

/// Retry behaviour for transient connect failures
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt, in milliseconds
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Double the delay after each failed attempt
    #[serde(default = "default_true")]
    pub exponential: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            exponential: true,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Default MySQL port used when nothing overrides it
pub const DEFAULT_PORT: u16 = 3306;

fn default_host() -> String {
    "analytics.db.svc.wikimedia.cloud".to_string()
}

fn default_meta_database() -> String {
    "meta_p".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output").join("sqlresults")
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    1000 // doubled on each retry when exponential
}

fn default_true() -> bool {
    true
}

fn default_credentials_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wikireplica")
}

impl Config {
    /// Read a configuration file; every missing field takes its default
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Like `from_file`, but an absent file yields the default configuration
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.replica.host.trim().is_empty() {
            return Err(ConfigError::Invalid("replica.host must not be empty".to_string()));
        }
        if self.replica.meta_database.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "replica.meta_database must not be empty".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".to_string()));
        }
        if self.replica.port == Some(0) {
            return Err(ConfigError::Invalid("replica.port must not be 0".to_string()));
        }
        if let Some((key, _)) = self.replica.port_overrides.iter().find(|(_, port)| **port == 0) {
            return Err(ConfigError::Invalid(format!("port override for '{}' must not be 0", key)));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            replica: ReplicaConfig::default(),
            retry: RetryConfig::default(),
            output_dir: default_output_dir(),
            log_level: LogLevel::default(),
        }
    }
}
