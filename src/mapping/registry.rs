/*!
 * Registry access: the one query issued on a mapping cache miss.
 */

use std::fmt;
use std::sync::Arc;

use log::{debug, info};
use serde_json::Value;

use crate::app_config::DEFAULT_PORT;
use crate::database::{ConnectionManager, Row};
use crate::errors::AppError;
use crate::language_utils::language_from_site_url;

use super::LanguageDatabaseMapping;

/// Wikipedia editions listed in the registry's `wiki` table
pub const REGISTRY_QUERY: &str =
    "SELECT lang, dbname, url FROM wiki WHERE family = 'wikipedia' AND is_closed = 0";

/// One registry row; any column may be missing or empty
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryRow {
    pub lang: Option<String>,
    pub dbname: Option<String>,
    pub url: Option<String>,
}

impl RegistryRow {
    pub fn new(lang: &str, dbname: &str, url: Option<&str>) -> Self {
        Self {
            lang: Some(lang.to_string()),
            dbname: Some(dbname.to_string()),
            url: url.map(str::to_string),
        }
    }

    /// Read the `lang`, `dbname` and `url` columns of a normalised row
    pub fn from_row(row: &Row) -> Self {
        Self {
            lang: text_column(row, "lang"),
            dbname: text_column(row, "dbname"),
            url: text_column(row, "url"),
        }
    }

    /// Language code for this row: the `lang` column, else the URL's subdomain
    pub fn language(&self) -> Option<String> {
        match non_empty(&self.lang) {
            Some(lang) => Some(lang.to_string()),
            None => non_empty(&self.url).and_then(language_from_site_url),
        }
    }
}

fn text_column(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Build a mapping from registry rows.
///
/// Rows without a database name are skipped; rows without a language code
/// use the code derived from their site URL, and are skipped when none can
/// be derived.
pub fn mapping_from_rows(rows: &[RegistryRow]) -> LanguageDatabaseMapping {
    let mut mapping = LanguageDatabaseMapping::new();
    for row in rows {
        let Some(dbname) = non_empty(&row.dbname) else {
            debug!("Skipping registry row without dbname: {:?}", row);
            continue;
        };
        let Some(language) = row.language() else {
            debug!("Skipping registry row without usable language: {:?}", row);
            continue;
        };
        mapping.insert(language, dbname);
    }
    mapping
}

/// Source of registry rows for the mapping cache
pub trait RegistrySource: Send + Sync {
    fn fetch_rows(&self) -> Result<Vec<RegistryRow>, AppError>;
}

/// Registry rows read from the replica's meta database
pub struct ReplicaRegistry {
    manager: Arc<ConnectionManager>,
    host: String,
    database: String,
    port: u16,
}

impl ReplicaRegistry {
    pub fn new(manager: Arc<ConnectionManager>, host: impl Into<String>, database: impl Into<String>, port: u16) -> Self {
        Self {
            manager,
            host: host.into(),
            database: database.into(),
            port,
        }
    }

    /// Registry on the manager's configured host and meta database
    pub fn from_manager(manager: Arc<ConnectionManager>) -> Self {
        let host = manager.replica().host.clone();
        let database = manager.replica().meta_database.clone();
        Self::new(manager, host, database, DEFAULT_PORT)
    }
}

impl RegistrySource for ReplicaRegistry {
    fn fetch_rows(&self) -> Result<Vec<RegistryRow>, AppError> {
        info!("Retrieving database name mappings from {}", self.database);
        let result = self
            .manager
            .with_connection(&self.host, &self.database, self.port, |handle| {
                handle.execute(REGISTRY_QUERY, &[]).map_err(AppError::from)
            })?;
        Ok(result.iter().map(RegistryRow::from_row).collect())
    }
}

impl fmt::Debug for ReplicaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicaRegistry")
            .field("host", &self.host)
            .field("database", &self.database)
            .field("port", &self.port)
            .finish()
    }
}
