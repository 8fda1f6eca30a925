/*!
 * # wikireplica - Wikipedia replica database access
 *
 * A Rust library for connecting to the read-only Wikipedia database
 * replicas and mapping language codes to replica database names.
 *
 * ## Features
 *
 * - Per-host credential files in MySQL option-file format
 * - Connections with bounded retry and exponential backoff
 * - Configurable port overrides per host or per database
 * - Query results with undecodable bytes replaced, never rejected
 * - Language code to database name resolution, including irregular wikis
 * - A lazily populated, snapshot-backed language mapping
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `credentials`: Credential file loading and parsing
 * - `database`: Replica access:
 *   - `database::driver`: Driver seam and error classification
 *   - `database::mysql`: sqlx-backed MySQL driver
 *   - `database::connection`: Connection manager and handles
 *   - `database::value`: Row values and text normalisation
 * - `language_utils`: Database name resolution
 * - `mapping`: Language to database mapping and its cache
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod credentials;
pub mod database;
pub mod errors;
pub mod language_utils;
pub mod mapping;

// Re-export main types for easier usage
pub use app_config::Config;
pub use credentials::{Credential, CredentialStore};
pub use database::{ConnectionHandle, ConnectionManager, MySqlDriver, QueryResult, Row};
pub use language_utils::{language_from_site_url, resolve_database_name};
pub use mapping::{LanguageDatabaseMapping, MappingCache, ReplicaRegistry};
pub use errors::{AppError, ConfigError, ConnectionError, CredentialError, QueryError};
