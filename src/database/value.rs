/*!
 * Raw driver values and their normalisation into caller-facing rows.
 *
 * Replica columns holding titles and user names are frequently binary
 * (`VARBINARY`/`BLOB`), so drivers hand back byte sequences. Before a row
 * leaves the connection layer every byte sequence is decoded to text with
 * lossy UTF-8 decoding, at any nesting depth.
 */

use std::collections::HashMap;

use serde_json::{Map, Number, Value};

/// A value as produced by a driver or bound as a statement parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<SqlValue>),
    /// Key order is preserved; keys may themselves be bytes
    Map(Vec<(SqlValue, SqlValue)>),
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for SqlValue {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// One raw row from a driver, columns in result-set order
pub type RawRow = Vec<(String, SqlValue)>;

/// One normalised row: column name to text-safe value
pub type Row = HashMap<String, Value>;

/// Rows returned by `ConnectionHandle::execute`, in server order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    rows: Vec<Row>,
}

impl QueryResult {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Normalise raw driver rows
    pub fn from_raw(rows: Vec<RawRow>) -> Self {
        Self {
            rows: rows.into_iter().map(normalize_row).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl IntoIterator for QueryResult {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Normalise a single raw row
pub fn normalize_row(row: RawRow) -> Row {
    row.into_iter()
        .map(|(column, value)| (column, normalize_value(value)))
        .collect()
}

/// Convert a raw value to JSON, decoding every byte sequence to text
pub fn normalize_value(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Bool(b),
        SqlValue::Int(i) => Value::Number(Number::from(i)),
        SqlValue::UInt(u) => Value::Number(Number::from(u)),
        SqlValue::Float(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        SqlValue::Text(s) => Value::String(s),
        SqlValue::Bytes(bytes) => Value::String(decode_lossy(bytes)),
        SqlValue::List(items) => Value::Array(items.into_iter().map(normalize_value).collect()),
        SqlValue::Map(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, value) in entries {
                map.insert(key_to_string(key), normalize_value(value));
            }
            Value::Object(map)
        }
    }
}

fn key_to_string(key: SqlValue) -> String {
    match normalize_value(key) {
        Value::String(s) => s,
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes as UTF-8, replacing invalid sequences with U+FFFD
pub fn decode_lossy(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}
