/*!
 * On-disk snapshot of the language mapping.
 */

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use tempfile::NamedTempFile;

use super::LanguageDatabaseMapping;

/// File name of the snapshot inside the output directory
pub const SNAPSHOT_FILENAME: &str = "db_mapping.json";

pub fn snapshot_path_in<P: AsRef<Path>>(output_dir: P) -> PathBuf {
    output_dir.as_ref().join(SNAPSHOT_FILENAME)
}

/// Write the mapping as a flat JSON object, replacing any previous snapshot.
/// The file is written to a temporary sibling first and renamed into place.
pub fn save_snapshot<P: AsRef<Path>>(path: P, mapping: &LanguageDatabaseMapping) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create snapshot directory: {:?}", dir))?;

    let json = serde_json::to_string_pretty(mapping).context("Failed to serialize mapping")?;

    let mut file = NamedTempFile::new_in(&dir)
        .with_context(|| format!("Failed to create temporary file in {:?}", dir))?;
    file.write_all(json.as_bytes())
        .with_context(|| format!("Failed to write snapshot for {:?}", path))?;
    file.persist(path)
        .with_context(|| format!("Failed to replace snapshot: {:?}", path))?;

    debug!("Saved {} mapping entries to {:?}", mapping.len(), path);
    Ok(())
}

/// Read a snapshot; `Ok(None)` when the file does not exist
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Option<LanguageDatabaseMapping>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {:?}", path))?;
    let mapping = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot: {:?}", path))?;
    Ok(Some(mapping))
}
