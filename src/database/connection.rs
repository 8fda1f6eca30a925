/*!
 * Replica connection management.
 *
 * `ConnectionManager` loads the host's credentials, opens a session with
 * bounded retry on transient failures and hands back a `ConnectionHandle`.
 * Every handle owns exactly one session; there is no pooling, and the
 * session is closed when the handle is closed or dropped.
 */

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::app_config::{Config, DEFAULT_PORT, ReplicaConfig, RetryConfig};
use crate::credentials::CredentialStore;
use crate::errors::{ConnectionError, QueryError};
use crate::language_utils::resolve_database_name;

use super::driver::{ConnectTarget, Driver, DriverError, FailureKind, Session};
use super::value::{QueryResult, SqlValue};

/// Attempt budget and delay schedule for transient connect failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub backoff: Duration,
    /// Double the delay after each further failure
    pub exponential: bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration, exponential: bool) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            exponential,
        }
    }

    /// Retry without sleeping between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, false)
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.backoff_ms),
            config.exponential,
        )
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if !self.exponential || attempt <= 1 {
            return self.backoff;
        }
        let factor = 1u32 << (attempt - 1).min(16);
        self.backoff.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Whether a handle currently owns a live session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Opens replica sessions with credential loading and bounded retry
pub struct ConnectionManager {
    driver: Arc<dyn Driver>,
    credentials: CredentialStore,
    retry: RetryPolicy,
    replica: ReplicaConfig,
}

impl ConnectionManager {
    pub fn new(
        driver: Arc<dyn Driver>,
        credentials: CredentialStore,
        retry: RetryPolicy,
        replica: ReplicaConfig,
    ) -> Self {
        Self {
            driver,
            credentials,
            retry,
            replica,
        }
    }

    /// Build a manager from the application configuration
    pub fn from_config(driver: Arc<dyn Driver>, config: &Config) -> Self {
        Self::new(
            driver,
            CredentialStore::new(config.replica.credentials_dir()),
            RetryPolicy::from_config(&config.retry),
            config.replica.clone(),
        )
    }

    pub fn replica(&self) -> &ReplicaConfig {
        &self.replica
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Configured port for the target if any, otherwise the caller's
    pub fn resolve_port(&self, host: &str, database: &str, port: u16) -> u16 {
        self.replica.explicit_port(host, database).unwrap_or(port)
    }

    /// Open a session, retrying transient failures up to the attempt budget
    pub fn connect(
        &self,
        host: &str,
        database: &str,
        port: u16,
    ) -> Result<ConnectionHandle, ConnectionError> {
        self.connect_with_deadline(host, database, port, None)
    }

    /// Open a session for a language code or wiki name on the configured host
    pub fn connect_wiki(&self, wiki: &str) -> Result<ConnectionHandle, ConnectionError> {
        let database = resolve_database_name(wiki);
        self.connect(&self.replica.host, &database, DEFAULT_PORT)
    }

    /// Like `connect`, but gives up once `deadline` would be passed
    pub fn connect_with_deadline(
        &self,
        host: &str,
        database: &str,
        port: u16,
        deadline: Option<Instant>,
    ) -> Result<ConnectionHandle, ConnectionError> {
        let target = ConnectTarget {
            host: host.to_string(),
            database: database.to_string(),
            port: self.resolve_port(host, database, port),
        };
        let credential = self.credentials.load(host)?;
        let max_attempts = self.retry.max_attempts;
        let mut attempt = 0;
        let mut last_error: Option<DriverError> = None;

        loop {
            attempt += 1;

            let timeout = match remaining(deadline) {
                Some(left) if left.is_zero() => {
                    return Err(deadline_exceeded(&target, attempt - 1, last_error.as_ref()));
                }
                Some(left) => Some(self.replica.connect_timeout().map_or(left, |t| t.min(left))),
                None => self.replica.connect_timeout(),
            };

            debug!("Connecting to {} - attempt {}/{}", target, attempt, max_attempts);

            let err = match self.driver.open(&target, &credential, timeout) {
                Ok(session) => {
                    info!("Connected to {}", target);
                    return Ok(ConnectionHandle::connected(
                        target,
                        session,
                        self.replica.query_timeout(),
                    ));
                }
                Err(err) => err,
            };

            match err.kind {
                FailureKind::Transient | FailureKind::ConnectionLost | FailureKind::TimedOut => {
                    if attempt >= max_attempts {
                        error!(
                            "Giving up on {} after {} attempt(s): {}",
                            target, attempt, err
                        );
                        return Err(ConnectionError::Transient {
                            target: target.to_string(),
                            code: err.code,
                            message: err.message,
                            attempts: attempt,
                        });
                    }

                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "Transient error connecting to {}: {} - attempt {}/{}, retrying in {:?}",
                        target, err, attempt, max_attempts, delay
                    );
                    if let Some(left) = remaining(deadline) {
                        if delay >= left {
                            return Err(deadline_exceeded(&target, attempt, Some(&err)));
                        }
                    }
                    last_error = Some(err);
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
                FailureKind::Fatal | FailureKind::Syntax => {
                    error!("Fatal error connecting to {}: {}", target, err);
                    return Err(ConnectionError::Fatal {
                        target: target.to_string(),
                        code: err.code,
                        message: err.message,
                    });
                }
            }
        }
    }

    /// Run `f` with a freshly opened handle, closing it on every exit path
    pub fn with_connection<T, E, F>(&self, host: &str, database: &str, port: u16, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut ConnectionHandle) -> Result<T, E>,
        E: From<ConnectionError>,
    {
        let mut handle = self.connect(host, database, port)?;
        let result = f(&mut handle);
        handle.close();
        result
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("credentials", &self.credentials)
            .field("retry", &self.retry)
            .field("replica", &self.replica)
            .finish_non_exhaustive()
    }
}

fn remaining(deadline: Option<Instant>) -> Option<Duration> {
    deadline.map(|d| d.saturating_duration_since(Instant::now()))
}

fn deadline_exceeded(
    target: &ConnectTarget,
    attempts: u32,
    last_error: Option<&DriverError>,
) -> ConnectionError {
    let last_error = last_error
        .map(ToString::to_string)
        .unwrap_or_else(|| "deadline reached before the first attempt".to_string());
    error!("Deadline exceeded connecting to {}: {}", target, last_error);
    ConnectionError::DeadlineExceeded {
        target: target.to_string(),
        attempts,
        last_error,
    }
}

/// Exclusive owner of one session to one database
pub struct ConnectionHandle {
    target: ConnectTarget,
    session: Option<Box<dyn Session>>,
    query_timeout: Option<Duration>,
}

impl ConnectionHandle {
    fn connected(target: ConnectTarget, session: Box<dyn Session>, query_timeout: Option<Duration>) -> Self {
        Self {
            target,
            session: Some(session),
            query_timeout,
        }
    }

    /// A handle that was never connected; every `execute` fails
    pub fn disconnected(host: &str, database: &str, port: u16) -> Self {
        Self {
            target: ConnectTarget {
                host: host.to_string(),
                database: database.to_string(),
                port,
            },
            session: None,
            query_timeout: None,
        }
    }

    pub fn host(&self) -> &str {
        &self.target.host
    }

    pub fn database(&self) -> &str {
        &self.target.database
    }

    pub fn port(&self) -> u16 {
        self.target.port
    }

    pub fn state(&self) -> ConnectionState {
        if self.session.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Run one statement with the handle's default timeout
    pub fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<QueryResult, QueryError> {
        self.execute_with_timeout(sql, params, self.query_timeout)
    }

    /// Run one statement. Failures are never retried here.
    ///
    /// Losing the connection (or timing out) leaves the handle
    /// `Disconnected`; later calls fail with `QueryError::NotConnected`.
    pub fn execute_with_timeout(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        timeout: Option<Duration>,
    ) -> Result<QueryResult, QueryError> {
        let Some(session) = self.session.as_mut() else {
            return Err(QueryError::NotConnected {
                target: self.target.to_string(),
            });
        };

        debug!("Executing on {}: {}", self.target, sql);

        match session.query(sql, params, timeout) {
            Ok(rows) => {
                let result = QueryResult::from_raw(rows);
                debug!("{} row(s) from {}", result.len(), self.target);
                Ok(result)
            }
            Err(err) => {
                warn!("Query on {} failed: {}", self.target, err);
                match err.kind {
                    FailureKind::Syntax | FailureKind::Fatal => Err(QueryError::Syntax {
                        code: err.code,
                        message: err.message,
                    }),
                    FailureKind::Transient => Err(QueryError::Connection {
                        code: err.code,
                        message: err.message,
                    }),
                    FailureKind::ConnectionLost => {
                        self.discard_session();
                        Err(QueryError::Connection {
                            code: err.code,
                            message: err.message,
                        })
                    }
                    FailureKind::TimedOut => {
                        self.discard_session();
                        Err(QueryError::Timeout(timeout.unwrap_or_default()))
                    }
                }
            }
        }
    }

    /// Close the session if one is open; safe to call repeatedly
    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            match session.close() {
                Ok(()) => debug!("Closed connection to {}", self.target),
                Err(err) => warn!("Error closing connection to {}: {}", self.target, err),
            }
        }
    }

    fn discard_session(&mut self) {
        if let Some(session) = self.session.take() {
            let _ = session.close();
        }
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("host", &self.target.host)
            .field("database", &self.target.database)
            .field("port", &self.target.port)
            .field("state", &self.state())
            .finish()
    }
}
