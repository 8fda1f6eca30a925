/*!
 * Language to database mapping.
 *
 * This module contains:
 * - `LanguageDatabaseMapping`: the language code to database name table
 * - `registry`: fetching the table from the registry database
 * - `snapshot`: persisting the table between runs
 * - `cache`: the process-wide, lazily populated `MappingCache`
 */

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::language_utils::{resolve_database_name, wiki_without_replica_suffix};

pub mod cache;
pub mod registry;
pub mod snapshot;

pub use cache::MappingCache;
pub use registry::{REGISTRY_QUERY, RegistryRow, RegistrySource, ReplicaRegistry, mapping_from_rows};
pub use snapshot::{SNAPSHOT_FILENAME, load_snapshot, save_snapshot, snapshot_path_in};

/// Language code of the English edition
pub const ENGLISH: &str = "en";

/// Codes whose historical database name differs from the code.
/// Entries use the bare wiki name (no `_p`), like the English default.
const OVERRIDE_CODES: &[&str] = &["gsw", "bat-smg", "be-tarask", "vro"];

/// Mapping from language code to database name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageDatabaseMapping {
    entries: BTreeMap<String, String>,
}

impl LanguageDatabaseMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mapping holding only the manufactured English entry
    pub fn english_only() -> Self {
        let mut mapping = Self::new();
        mapping.ensure_english();
        mapping
    }

    pub fn get(&self, language: &str) -> Option<&str> {
        self.entries.get(language).map(String::as_str)
    }

    pub fn contains(&self, language: &str) -> bool {
        self.entries.contains_key(language)
    }

    /// Insert or replace an entry, returning the previous database name
    pub fn insert(&mut self, language: impl Into<String>, database: impl Into<String>) -> Option<String> {
        self.entries.insert(language.into(), database.into())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Add the English entry if missing; returns whether one was added.
    ///
    /// The manufactured value is the bare `enwiki`, without the `_p` that
    /// registry rows carry. Existing English entries are left alone.
    pub fn ensure_english(&mut self) -> bool {
        if self.contains(ENGLISH) {
            return false;
        }
        self.entries.insert(ENGLISH.to_string(), english_default());
        true
    }

    /// Overlay the fixed special-case entries
    pub fn apply_overrides(&mut self) {
        for code in OVERRIDE_CODES {
            self.entries.insert(code.to_string(), override_name(code));
        }
    }
}

impl FromIterator<(String, String)> for LanguageDatabaseMapping {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a LanguageDatabaseMapping {
    type Item = (&'a String, &'a String);
    type IntoIter = std::collections::btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Value manufactured for English when nothing else supplies one
pub fn english_default() -> String {
    wiki_without_replica_suffix(&resolve_database_name(ENGLISH)).to_string()
}

/// Special-case database name for `language`, if it has one
pub fn override_for(language: &str) -> Option<String> {
    OVERRIDE_CODES
        .iter()
        .find(|code| **code == language)
        .map(|code| override_name(code))
}

fn override_name(code: &str) -> String {
    wiki_without_replica_suffix(&resolve_database_name(code)).to_string()
}
