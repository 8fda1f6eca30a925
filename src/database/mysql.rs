/*!
 * MySQL/MariaDB driver backed by sqlx.
 *
 * sqlx is async; the driver owns a small tokio runtime and blocks on it so
 * the rest of the crate stays synchronous. Column values are decoded by
 * their declared type, with binary columns passed through as raw bytes for
 * the connection layer to normalise.
 */

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::debug;
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlDatabaseError, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Connection, Row, TypeInfo, ValueRef};
use tokio::runtime::Runtime;

use crate::credentials::Credential;

use super::driver::{ConnectTarget, Driver, DriverError, FailureKind, Phase, Session};
use super::value::{RawRow, SqlValue, normalize_value};

/// Driver for MySQL-protocol replicas.
///
/// Every call blocks the current thread on the driver's own runtime, so the
/// driver must be used from plain threads. Calls made from inside another
/// tokio runtime fail with a fatal error instead of blocking; async callers
/// should go through `tokio::task::spawn_blocking`. The driver must also be
/// dropped outside any runtime.
pub struct MySqlDriver {
    runtime: Arc<Runtime>,
}

impl MySqlDriver {
    /// Create a driver with its own runtime
    pub fn new() -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("wikireplica-io")
            .enable_all()
            .build()?;
        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }
}

impl Driver for MySqlDriver {
    fn open(
        &self,
        target: &ConnectTarget,
        credential: &Credential,
        timeout: Option<Duration>,
    ) -> Result<Box<dyn Session>, DriverError> {
        ensure_blocking_context()?;
        let options = MySqlConnectOptions::new()
            .host(&target.host)
            .port(target.port)
            .username(credential.user())
            .password(credential.password())
            .database(&target.database);

        let connection = self.runtime.block_on(async {
            let connect = MySqlConnection::connect_with(&options);
            match timeout {
                Some(limit) => match tokio::time::timeout(limit, connect).await {
                    Ok(result) => result.map_err(|e| map_sqlx_error(Phase::Connect, e)),
                    Err(_) => Err(DriverError::new(
                        FailureKind::TimedOut,
                        None,
                        format!("connect timed out after {:?}", limit),
                    )),
                },
                None => connect.await.map_err(|e| map_sqlx_error(Phase::Connect, e)),
            }
        })?;

        Ok(Box::new(MySqlSession {
            runtime: Arc::clone(&self.runtime),
            connection: Some(connection),
        }))
    }
}

struct MySqlSession {
    runtime: Arc<Runtime>,
    connection: Option<MySqlConnection>,
}

impl Session for MySqlSession {
    fn query(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        timeout: Option<Duration>,
    ) -> Result<Vec<RawRow>, DriverError> {
        ensure_blocking_context()?;
        let Some(connection) = self.connection.as_mut() else {
            return Err(DriverError::new(FailureKind::ConnectionLost, None, "session already closed"));
        };

        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_param(query, param);
        }

        let rows = self.runtime.block_on(async {
            let fetch = query.fetch_all(&mut *connection);
            match timeout {
                Some(limit) => match tokio::time::timeout(limit, fetch).await {
                    Ok(result) => result.map_err(|e| map_sqlx_error(Phase::Query, e)),
                    Err(_) => Err(DriverError::new(
                        FailureKind::TimedOut,
                        None,
                        format!("query timed out after {:?}", limit),
                    )),
                },
                None => fetch.await.map_err(|e| map_sqlx_error(Phase::Query, e)),
            }
        })?;

        Ok(rows.iter().map(decode_row).collect())
    }

    fn close(mut self: Box<Self>) -> Result<(), DriverError> {
        ensure_blocking_context()?;
        match self.connection.take() {
            Some(connection) => self
                .runtime
                .block_on(connection.close())
                .map_err(|e| map_sqlx_error(Phase::Query, e)),
            None => Ok(()),
        }
    }
}

// block_on panics when the calling thread already drives a runtime
fn ensure_blocking_context() -> Result<(), DriverError> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(DriverError::new(
            FailureKind::Fatal,
            None,
            "blocking database call made from inside an async runtime",
        ));
    }
    Ok(())
}

fn bind_param<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    param: &SqlValue,
) -> Query<'q, MySql, MySqlArguments> {
    match param {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::Int(i) => query.bind(*i),
        SqlValue::UInt(u) => query.bind(*u),
        SqlValue::Float(f) => query.bind(*f),
        SqlValue::Text(s) => query.bind(s.clone()),
        SqlValue::Bytes(bytes) => query.bind(bytes.clone()),
        nested @ (SqlValue::List(_) | SqlValue::Map(_)) => {
            query.bind(normalize_value(nested.clone()).to_string())
        }
    }
}

fn map_sqlx_error(phase: Phase, error: sqlx::Error) -> DriverError {
    match error {
        sqlx::Error::Database(db) => {
            let code = db.try_downcast_ref::<MySqlDatabaseError>().map(|e| e.number());
            match code {
                Some(code) => DriverError::from_code(phase, code, db.message()),
                None => DriverError::new(fallback_kind(phase), None, db.message()),
            }
        }
        sqlx::Error::Io(e) => DriverError::new(lost_kind(phase), None, e.to_string()),
        sqlx::Error::Protocol(message) => DriverError::new(lost_kind(phase), None, message),
        sqlx::Error::Tls(e) => DriverError::new(FailureKind::Fatal, None, e.to_string()),
        sqlx::Error::Configuration(e) => DriverError::new(FailureKind::Fatal, None, e.to_string()),
        other => DriverError::new(fallback_kind(phase), None, other.to_string()),
    }
}

fn lost_kind(phase: Phase) -> FailureKind {
    match phase {
        Phase::Connect => FailureKind::Transient,
        Phase::Query => FailureKind::ConnectionLost,
    }
}

fn fallback_kind(phase: Phase) -> FailureKind {
    match phase {
        Phase::Connect => FailureKind::Fatal,
        Phase::Query => FailureKind::Syntax,
    }
}

fn decode_row(row: &MySqlRow) -> RawRow {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let type_name = column.type_info().name().to_uppercase();
            (column.name().to_string(), decode_cell(row, idx, &type_name))
        })
        .collect()
}

fn decode_cell(row: &MySqlRow, idx: usize, type_name: &str) -> SqlValue {
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return SqlValue::Null,
        Ok(_) => {}
        Err(e) => {
            debug!("Column {} could not be read: {}", idx, e);
            return SqlValue::Null;
        }
    }

    let decoded = match type_name {
        "BOOLEAN" => row.try_get::<bool, _>(idx).map(SqlValue::Bool),
        name if name.contains("INT") && name.contains("UNSIGNED") => {
            row.try_get::<u64, _>(idx).map(SqlValue::UInt)
        }
        name if name.contains("INT") || name == "YEAR" => row.try_get::<i64, _>(idx).map(SqlValue::Int),
        "FLOAT" | "DOUBLE" => row.try_get::<f64, _>(idx).map(SqlValue::Float),
        "JSON" => row.try_get::<serde_json::Value, _>(idx).map(from_json),
        "DATETIME" | "TIMESTAMP" => row
            .try_get::<NaiveDateTime, _>(idx)
            .map(|v| SqlValue::Text(v.format("%Y-%m-%d %H:%M:%S").to_string())),
        "DATE" => row
            .try_get::<NaiveDate, _>(idx)
            .map(|v| SqlValue::Text(v.format("%Y-%m-%d").to_string())),
        "TIME" => row
            .try_get::<NaiveTime, _>(idx)
            .map(|v| SqlValue::Text(v.format("%H:%M:%S").to_string())),
        name if name.contains("BLOB") || name.contains("BINARY") || name == "BIT" => {
            row.try_get_unchecked::<Vec<u8>, _>(idx).map(SqlValue::Bytes)
        }
        _ => row.try_get::<String, _>(idx).map(SqlValue::Text),
    };

    decoded.unwrap_or_else(|_| fallback_bytes(row, idx))
}

// Anything left (DECIMAL, ENUM, SET, odd collations) arrives as length-encoded bytes
fn fallback_bytes(row: &MySqlRow, idx: usize) -> SqlValue {
    match row.try_get_unchecked::<Vec<u8>, _>(idx) {
        Ok(bytes) => SqlValue::Bytes(bytes),
        Err(e) => {
            debug!("Column {} could not be decoded: {}", idx, e);
            SqlValue::Null
        }
    }
}

fn from_json(value: serde_json::Value) -> SqlValue {
    match value {
        serde_json::Value::Null => SqlValue::Null,
        serde_json::Value::Bool(b) => SqlValue::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Int(i)
            } else if let Some(u) = n.as_u64() {
                SqlValue::UInt(u)
            } else {
                SqlValue::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => SqlValue::Text(s),
        serde_json::Value::Array(items) => SqlValue::List(items.into_iter().map(from_json).collect()),
        serde_json::Value::Object(map) => SqlValue::Map(
            map.into_iter()
                .map(|(k, v)| (SqlValue::Text(k), from_json(v)))
                .collect(),
        ),
    }
}
