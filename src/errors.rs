/*!
 * Error types for the wikireplica library.
 *
 * Each layer of the data-access core has its own error enum, defined with
 * the thiserror crate. `AppError` wraps all of them for callers that want a
 * single type at the application boundary.
 */

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading database credentials
#[derive(Error, Debug)]
pub enum CredentialError {
    /// The host's credential file does not exist
    #[error("Credential file not found: {}", path.display())]
    NotFound {
        /// Path that was probed
        path: PathBuf,
    },

    /// The file exists but lacks a required key
    #[error("Invalid credential file format in {}: missing {}", path.display(), missing.join(", "))]
    Malformed {
        /// Path of the offending file
        path: PathBuf,
        /// Keys that were absent after parsing every line
        missing: Vec<&'static str>,
    },

    /// The file exists but could not be read
    #[error("Failed to read credential file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while establishing a connection
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Credentials could not be loaded, so no attempt was made
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// A failure expected to resolve on retry; surfaced once the attempt budget is spent
    #[error("Transient connection error to {target} after {attempts} attempt(s): {message}")]
    Transient {
        /// `host/database:port`
        target: String,
        /// Server error number, when the server reported one
        code: Option<u16>,
        message: String,
        /// Number of attempts made, including the failing one
        attempts: u32,
    },

    /// A failure retrying cannot fix (bad credentials, unknown database)
    #[error("Fatal connection error to {target}: {message}")]
    Fatal {
        target: String,
        code: Option<u16>,
        message: String,
    },

    /// The caller's deadline expired before a connection could be made
    #[error("Deadline exceeded connecting to {target} after {attempts} attempt(s): {last_error}")]
    DeadlineExceeded {
        target: String,
        attempts: u32,
        last_error: String,
    },
}

impl ConnectionError {
    /// Whether this error came from the transient class
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Server error number attached to the failure, if any
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::Transient { code, .. } | Self::Fatal { code, .. } => *code,
            _ => None,
        }
    }
}

/// Errors raised while executing a statement
#[derive(Error, Debug)]
pub enum QueryError {
    /// `execute` was called on a handle that is not connected
    #[error("Database connection not established for {target}")]
    NotConnected { target: String },

    /// The statement was rejected by the server
    #[error("Query syntax error (code {code:?}): {message}")]
    Syntax { code: Option<u16>, message: String },

    /// The connection dropped while the statement was running
    #[error("Connection lost during query (code {code:?}): {message}")]
    Connection { code: Option<u16>, message: String },

    /// The statement did not finish within the caller's timeout
    #[error("Query timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Errors raised while loading the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
