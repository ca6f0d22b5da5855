//! Filesystem helpers shared by both stores: a JSON directory scanner that
//! treats corrupt files as absent, atomic record writes, and empty-directory
//! cleanup.

use crate::record::Record;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::Path;

pub struct ScanOutcome {
    pub records: Vec<Record>,
    /// Files that existed but could not be read or parsed as a JSON object.
    pub skipped: usize,
}

/// Read every `*.json` file in `dir` as a JSON object. Unreadable or
/// unparsable files are counted and warn-logged, never surfaced: callers see
/// them as absent. A missing directory yields an empty outcome.
pub fn scan_json_dir(dir: &Path) -> ScanOutcome {
    let mut records = Vec::new();
    let mut skipped = 0usize;

    let Ok(entries) = fs::read_dir(dir) else {
        return ScanOutcome { records, skipped };
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let parsed = fs::read(&path)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok());
        match parsed {
            Some(Value::Object(map)) => records.push(map),
            _ => {
                tracing::warn!(path = %path.display(), "skipping unparsable record file");
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        metrics::counter!("snapvault_scan_skipped_total", skipped as u64);
    }

    ScanOutcome { records, skipped }
}

/// Read one record file. None if the file is absent or unparsable.
pub fn read_json_object(path: &Path) -> Option<Record> {
    let bytes = fs::read(path).ok()?;
    match serde_json::from_slice::<Value>(&bytes).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Write compact JSON via a temp file and rename, so concurrent readers
/// never observe a partially written record.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec(value)?;
    fs::write(&tmp_path, &bytes)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Idempotent file removal: a missing file is not an error.
pub fn remove_file_if_present(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

pub fn remove_dir_if_empty(dir: &Path) {
    if let Ok(mut entries) = fs::read_dir(dir) {
        if entries.next().is_none() {
            let _ = fs::remove_dir(dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn scan_skips_corrupt_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("good.json"), b"{\"id\":\"good\"}").unwrap();
        fs::write(dir.path().join("bad.json"), b"{ not json").unwrap();
        fs::write(dir.path().join("list.json"), b"[1,2]").unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let outcome = scan_json_dir(dir.path());
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.skipped, 2);
    }

    #[test]
    fn scan_of_missing_dir_is_empty() {
        let dir = tempdir().unwrap();
        let outcome = scan_json_dir(&dir.path().join("nope"));
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.skipped, 0);
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rec.json");
        write_json_atomic(&path, &json!({"id": "rec"})).unwrap();

        assert_eq!(read_json_object(&path).unwrap()["id"], json!("rec"));
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }
}
