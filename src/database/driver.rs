/*!
 * Wire-protocol seam for the connection manager.
 *
 * A `Driver` opens sessions and a `Session` runs statements. Both are
 * blocking. Failures are reported as `DriverError`, already classified so
 * the connection manager can decide between retrying and surfacing.
 */

use std::fmt;
use std::time::Duration;

use crate::credentials::Credential;

use super::value::{RawRow, SqlValue};

/// How a driver failure should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Expected to resolve on retry (lock wait, momentary network loss)
    Transient,
    /// Retrying cannot help (authentication, unknown database)
    Fatal,
    /// The statement itself was rejected
    Syntax,
    /// The session dropped mid-statement
    ConnectionLost,
    /// The caller's timeout elapsed first
    TimedOut,
}

/// A classified failure reported by a driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    pub kind: FailureKind,
    /// Server error number, when the server sent one
    pub code: Option<u16>,
    pub message: String,
}

impl DriverError {
    pub fn new(kind: FailureKind, code: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
        }
    }

    /// Build an error from a MySQL error number, classifying it for the given phase
    pub fn from_code(phase: Phase, code: u16, message: impl Into<String>) -> Self {
        Self::new(classify_error_code(phase, code), Some(code), message)
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "({}) {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for DriverError {}

/// Whether a failure happened while connecting or while running a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connect,
    Query,
}

/// Classify a MySQL/MariaDB server or client error number.
///
/// Unknown numbers are fatal while connecting and syntax-class while
/// querying, so nothing unknown is ever retried.
pub fn classify_error_code(phase: Phase, code: u16) -> FailureKind {
    match (phase, code) {
        // ER_CON_COUNT_ERROR, ER_LOCK_WAIT_TIMEOUT, ER_LOCK_DEADLOCK, ER_USER_LIMIT_REACHED
        (Phase::Connect, 1040 | 1205 | 1213 | 1226) => FailureKind::Transient,
        // CR_CONN_HOST_ERROR, CR_SERVER_GONE_ERROR, CR_SERVER_LOST, CR_SERVER_LOST_EXTENDED
        (Phase::Connect, 2003 | 2006 | 2013 | 2055) => FailureKind::Transient,
        (Phase::Connect, _) => FailureKind::Fatal,
        // CR_CONNECTION_ERROR and the lost/gone family
        (Phase::Query, 2002 | 2006 | 2013 | 2055) => FailureKind::ConnectionLost,
        // the session survives these
        (Phase::Query, 1205 | 1213) => FailureKind::Transient,
        (Phase::Query, _) => FailureKind::Syntax,
    }
}

/// Connection parameters for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub host: String,
    pub database: String,
    pub port: u16,
}

impl fmt::Display for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.host, self.database, self.port)
    }
}

/// Opens sessions against a database server
pub trait Driver: Send + Sync {
    /// Open a session; `timeout` bounds this single attempt
    fn open(
        &self,
        target: &ConnectTarget,
        credential: &Credential,
        timeout: Option<Duration>,
    ) -> Result<Box<dyn Session>, DriverError>;
}

/// A live session owned by exactly one `ConnectionHandle`
pub trait Session: Send {
    /// Run one statement and return its rows
    fn query(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        timeout: Option<Duration>,
    ) -> Result<Vec<RawRow>, DriverError>;

    /// Close the session; errors are informational only
    fn close(self: Box<Self>) -> Result<(), DriverError>;
}
