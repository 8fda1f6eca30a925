/*!
 * Database module for replica access.
 *
 * This module provides:
 * - A blocking driver seam (`driver`) with a sqlx-backed MySQL driver (`mysql`)
 * - Connection management with credential loading and bounded retry (`connection`)
 * - Raw values and their normalisation into text-safe rows (`value`)
 */

pub mod connection;
pub mod driver;
pub mod mysql;
pub mod value;

// Re-export main types
pub use connection::{ConnectionHandle, ConnectionManager, ConnectionState, RetryPolicy};
pub use driver::{ConnectTarget, Driver, DriverError, FailureKind, Phase, Session, classify_error_code};
pub use mysql::MySqlDriver;
pub use value::{QueryResult, RawRow, Row, SqlValue, normalize_row, normalize_value};
