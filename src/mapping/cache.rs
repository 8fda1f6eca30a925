/*!
 * Language mapping cache.
 *
 * The mapping is populated at most once per cache instance: from the
 * on-disk snapshot when one exists, otherwise from the registry. Later
 * lookups read the populated mapping without locking.
 */

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use super::registry::{RegistrySource, mapping_from_rows};
use super::snapshot::{load_snapshot, save_snapshot};
use super::{LanguageDatabaseMapping, override_for};
use crate::language_utils::resolve_database_name;

/// Where the populated mapping came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingOrigin {
    Snapshot,
    Registry,
    /// Registry unavailable; English-only fallback
    Degraded,
}

/// Lazily populated language to database mapping
pub struct MappingCache {
    source: Box<dyn RegistrySource>,
    snapshot_path: PathBuf,
    mapping: OnceCell<LanguageDatabaseMapping>,
    origin: RwLock<Option<MappingOrigin>>,

    /// Lookup hit counter
    hits: AtomicUsize,

    /// Lookup miss counter
    misses: AtomicUsize,
}

impl MappingCache {
    pub fn new<P: Into<PathBuf>>(source: Box<dyn RegistrySource>, snapshot_path: P) -> Self {
        Self {
            source,
            snapshot_path: snapshot_path.into(),
            mapping: OnceCell::new(),
            origin: RwLock::new(None),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Whether the mapping has been populated
    pub fn is_loaded(&self) -> bool {
        self.mapping.get().is_some()
    }

    /// Origin of the populated mapping, `None` before first use
    pub fn origin(&self) -> Option<MappingOrigin> {
        *self.origin.read()
    }

    /// The full mapping, populating it on first call.
    ///
    /// Never fails: an unavailable registry yields a mapping holding only
    /// the English default, and that result is not persisted.
    pub fn get(&self) -> &LanguageDatabaseMapping {
        self.mapping.get_or_init(|| self.populate())
    }

    /// Database name for a language code.
    ///
    /// The fixed special cases win over whatever the registry reported.
    pub fn name_for(&self, language: &str) -> Option<String> {
        let found = override_for(language).or_else(|| self.get().get(language).map(str::to_string));

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!("No database mapped for language '{}'", language);
        }
        found
    }

    /// Replica database to connect to for a language code.
    ///
    /// Mapped names are normalised to the `_p` replica form; codes the
    /// mapping does not know fall back to the resolver's default rule.
    pub fn database_for(&self, language: &str) -> String {
        match self.name_for(language) {
            Some(name) => resolve_database_name(&name),
            None => resolve_database_name(language),
        }
    }

    /// Drop the populated mapping and its snapshot; the next lookup refetches.
    ///
    /// Needs exclusive access: call it before the cache is shared, or
    /// through `Arc::get_mut` once every other reference is gone.
    pub fn invalidate(&mut self) -> anyhow::Result<()> {
        self.mapping.take();
        *self.origin.get_mut() = None;

        match std::fs::remove_file(&self.snapshot_path) {
            Ok(()) => {
                info!("Removed mapping snapshot {:?}", self.snapshot_path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("Failed to remove snapshot: {:?}", self.snapshot_path))),
        }
    }

    /// Lookup statistics: (hits, misses, hit rate)
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        (hits, misses, hit_rate)
    }

    fn populate(&self) -> LanguageDatabaseMapping {
        match load_snapshot(&self.snapshot_path) {
            Ok(Some(mut mapping)) if !mapping.is_empty() => {
                info!("Loaded {} language mappings from {:?}", mapping.len(), self.snapshot_path);
                mapping.apply_overrides();
                mapping.ensure_english();
                self.set_origin(MappingOrigin::Snapshot);
                return mapping;
            }
            Ok(Some(_)) => debug!("Mapping snapshot {:?} is empty, refetching", self.snapshot_path),
            Ok(None) => debug!("No mapping snapshot at {:?}", self.snapshot_path),
            Err(e) => warn!("Ignoring unreadable mapping snapshot: {:#}", e),
        }

        match self.source.fetch_rows() {
            Ok(rows) => {
                let mut mapping = mapping_from_rows(&rows);
                if mapping.is_empty() {
                    warn!("Registry returned no usable rows, mapping not saved");
                } else {
                    mapping.apply_overrides();
                    if let Err(e) = save_snapshot(&self.snapshot_path, &mapping) {
                        warn!("Failed to save mapping snapshot: {:#}", e);
                    }
                }
                mapping.ensure_english();
                info!("Fetched {} language mappings from registry", mapping.len());
                self.set_origin(MappingOrigin::Registry);
                mapping
            }
            Err(e) => {
                warn!("Failed to fetch language mappings, using English only: {}", e);
                self.set_origin(MappingOrigin::Degraded);
                LanguageDatabaseMapping::english_only()
            }
        }
    }

    fn set_origin(&self, origin: MappingOrigin) {
        *self.origin.write() = Some(origin);
    }
}

impl fmt::Debug for MappingCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingCache")
            .field("snapshot_path", &self.snapshot_path)
            .field("loaded", &self.is_loaded())
            .field("origin", &self.origin())
            .finish()
    }
}
