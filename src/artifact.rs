use crate::models::{ConflictRecord, Entry};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Serialize a stage artifact as JSON, writing to `<path>.tmp` and renaming
/// so an interrupted stage never leaves output that looks newer than its
/// inputs.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    let tmp = path.with_extension("tmp");
    let file =
        File::create(&tmp).with_context(|| format!("failed to create {}", tmp.display()))?;
    serde_json::to_writer(BufWriter::new(file), value)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to rename artifact to {}", path.display()))?;
    Ok(())
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file =
        File::open(path).with_context(|| format!("failed to open artifact: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse artifact: {}", path.display()))
}

pub fn save_entries(path: &Path, entries: &[Entry]) -> Result<()> {
    save_json(path, &entries)
}

pub fn load_entries(path: &Path) -> Result<Vec<Entry>> {
    load_json(path)
}

pub fn save_conflicts(path: &Path, conflicts: &[ConflictRecord]) -> Result<()> {
    save_json(path, &conflicts)
}

pub fn load_conflicts(path: &Path) -> Result<Vec<ConflictRecord>> {
    load_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Lang, Pos, ProvenanceTag};
    use tempfile::TempDir;

    #[test]
    fn entries_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("work").join("entries.json");
        let entries = vec![Entry::new("hundo", Lang::Io, Pos::Noun, ProvenanceTag::IoWiktionary)];

        save_entries(&path, &entries).unwrap();
        let back = load_entries(&path).unwrap();
        assert_eq!(entries, back);
    }

    #[test]
    fn no_tmp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entries.json");
        save_entries(&path, &[]).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn load_missing_file_errors() {
        assert!(load_entries(Path::new("/nonexistent/entries.json")).is_err());
    }
}
