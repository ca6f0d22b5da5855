// Copyright (c) 2025 Snapvault Contributors. Licensed under AGPLv3.
//! Per-workflow snapshot store.
//!
//! Each snapshot is one compact JSON file under
//! `<data_dir>/snapshots/<encoded workflow key>/<id>.json`. An in-memory
//! metadata cache (payload stripped, timestamp ascending) avoids redundant
//! disk reads for list/prune/delete; only `get_full` touches disk after
//! warm-up. A cache entry is two-state: absent means unloaded (the next
//! read rescans the directory), present means it mirrors disk exactly.
//!
//! The store is not internally synchronized. Callers wrap it in a mutex
//! (see `AppState`), which serializes mutations and closes the
//! read-modify-write races a shared cache would otherwise have.

use crate::errors::StoreError;
use crate::fsio;
use crate::paths;
use crate::record::{
    self, id_of, is_locked, source_of, strip_payload, Record, PAYLOAD_FIELD,
};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Which prune candidates to consider, besides being unlocked and
/// unprotected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFilter {
    /// Every unlocked, unprotected record.
    All,
    /// Only records tagged `source == "node"` (node-triggered captures).
    Node,
    /// Only records where `source` is absent or not `"node"`.
    Regular,
}

impl SourceFilter {
    pub fn from_request(source: Option<&str>) -> Self {
        match source {
            Some("node") => SourceFilter::Node,
            Some("regular") => SourceFilter::Regular,
            _ => SourceFilter::All,
        }
    }

    fn matches(self, record: &Record) -> bool {
        match self {
            SourceFilter::All => true,
            SourceFilter::Node => source_of(record) == Some("node"),
            SourceFilter::Regular => source_of(record) != Some("node"),
        }
    }
}

pub struct SnapshotStore {
    root: PathBuf,
    /// workflow key -> payload-stripped records, timestamp ascending.
    /// Key presence means the entry is warm.
    cache: HashMap<String, Vec<Record>>,
}

impl SnapshotStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            root: data_dir.join("snapshots"),
            cache: HashMap::new(),
        }
    }

    fn workflow_dir(&self, workflow_key: &str) -> PathBuf {
        self.root.join(paths::encode_key(workflow_key))
    }

    fn record_path(&self, workflow_key: &str, id: &str) -> PathBuf {
        self.workflow_dir(workflow_key).join(format!("{id}.json"))
    }

    /// Warm the cache for `workflow_key` if cold.
    fn ensure_cached(&mut self, workflow_key: &str) -> &[Record] {
        if !self.cache.contains_key(workflow_key) {
            let outcome = fsio::scan_json_dir(&self.workflow_dir(workflow_key));
            let mut entries = outcome.records;
            for entry in &mut entries {
                entry.remove(PAYLOAD_FIELD);
            }
            record::sort_by_timestamp(&mut entries);
            self.cache.insert(workflow_key.to_string(), entries);
        }
        self.cache
            .get(workflow_key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Write one snapshot record to disk, overwriting any existing file.
    ///
    /// A warm cache is patched in place; a cold cache stays cold, so the
    /// next read picks the new file up from disk.
    pub fn put(&mut self, record: &Record) -> Result<(), StoreError> {
        let id = id_of(record).ok_or(StoreError::MissingField("id"))?;
        let workflow_key = record
            .get("workflowKey")
            .and_then(serde_json::Value::as_str)
            .ok_or(StoreError::MissingField("workflowKey"))?;
        paths::validate_id(id)?;

        let dir = self.workflow_dir(workflow_key);
        fs::create_dir_all(&dir)?;
        fsio::write_json_atomic(&dir.join(format!("{id}.json")), record)?;
        metrics::counter!("snapvault_snapshots_saved_total", 1);

        if let Some(cached) = self.cache.get_mut(workflow_key) {
            cached.retain(|e| id_of(e) != Some(id));
            cached.push(strip_payload(record));
            record::sort_by_timestamp(cached);
        }
        Ok(())
    }

    /// All snapshot metadata for a workflow (no payload), timestamp
    /// ascending. Returns a defensive copy of the cached list.
    pub fn list_metadata(&mut self, workflow_key: &str) -> Vec<Record> {
        self.ensure_cached(workflow_key).to_vec()
    }

    /// Read a single full record (with payload) from disk, bypassing the
    /// cache. None if the file is absent or unparsable.
    pub fn get_full(
        &self,
        workflow_key: &str,
        id: &str,
    ) -> Result<Option<Record>, StoreError> {
        paths::validate_id(id)?;
        Ok(fsio::read_json_object(&self.record_path(workflow_key, id)))
    }

    /// Merge `fields` into an existing record (null removes a key) and
    /// mirror the merge onto the cached metadata entry, which never holds
    /// the payload field.
    pub fn update_meta(
        &mut self,
        workflow_key: &str,
        id: &str,
        fields: &Record,
    ) -> Result<(), StoreError> {
        paths::validate_id(id)?;
        let path = self.record_path(workflow_key, id);
        let Some(mut full) = fsio::read_json_object(&path) else {
            return Err(StoreError::NotFound);
        };
        record::merge_fields(&mut full, fields);
        fsio::write_json_atomic(&path, &full)?;

        if let Some(cached) = self.cache.get_mut(workflow_key) {
            for entry in cached.iter_mut() {
                if id_of(entry) == Some(id) {
                    for (k, v) in fields {
                        if k == PAYLOAD_FIELD {
                            continue;
                        }
                        if v.is_null() {
                            entry.remove(k);
                        } else {
                            entry.insert(k.clone(), v.clone());
                        }
                    }
                    break;
                }
            }
        }
        Ok(())
    }

    /// Remove one snapshot. Idempotent: deleting a nonexistent record is a
    /// no-op. Evicts the cache entry and the directory when the collection
    /// empties.
    pub fn delete(&mut self, workflow_key: &str, id: &str) -> Result<(), StoreError> {
        paths::validate_id(id)?;
        let dir = self.workflow_dir(workflow_key);
        if fsio::remove_file_if_present(&dir.join(format!("{id}.json")))? {
            metrics::counter!("snapvault_snapshots_deleted_total", 1);
        }

        if let Some(cached) = self.cache.get_mut(workflow_key) {
            cached.retain(|e| id_of(e) != Some(id));
            if cached.is_empty() {
                self.cache.remove(workflow_key);
            }
        }
        fsio::remove_dir_if_empty(&dir);
        Ok(())
    }

    /// Delete every unlocked snapshot for a workflow. Locked records and
    /// their cache entries survive; returns how many were preserved.
    pub fn delete_all(&mut self, workflow_key: &str) -> Result<usize, StoreError> {
        let entries = self.ensure_cached(workflow_key).to_vec();
        let dir = self.workflow_dir(workflow_key);
        let mut locked = Vec::new();
        for rec in entries {
            if is_locked(&rec) {
                locked.push(rec);
                continue;
            }
            let Some(id) = id_of(&rec) else { continue };
            paths::validate_id(id)?;
            if fsio::remove_file_if_present(&dir.join(format!("{id}.json")))? {
                metrics::counter!("snapvault_snapshots_deleted_total", 1);
            }
        }

        let locked_count = locked.len();
        if locked.is_empty() {
            self.cache.remove(workflow_key);
        } else {
            self.cache.insert(workflow_key.to_string(), locked);
        }
        fsio::remove_dir_if_empty(&dir);
        Ok(locked_count)
    }

    /// Scan every collection directory, warm its cache, and report
    /// `(workflow key, valid record count)` sorted by key. Collections with
    /// no valid records are omitted.
    pub fn list_workflows(&mut self) -> Vec<(String, usize)> {
        let mut results = Vec::new();
        let Ok(entries) = fs::read_dir(&self.root) else {
            return results;
        };
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(key) = name.to_str().and_then(paths::decode_key) else {
                continue;
            };
            let count = self.ensure_cached(&key).len();
            if count > 0 {
                results.push((key, count));
            }
        }
        results.sort_by(|a, b| a.0.cmp(&b.0));
        results
    }

    /// Delete the oldest prune candidates beyond `max_snapshots`.
    ///
    /// Candidates are unlocked records not in `protected_ids`, narrowed by
    /// `source`. Returns the number of files actually removed this call: a
    /// candidate whose file is already gone is skipped, not counted.
    pub fn prune(
        &mut self,
        workflow_key: &str,
        max_snapshots: usize,
        source: SourceFilter,
        protected_ids: &HashSet<String>,
    ) -> Result<usize, StoreError> {
        let entries = self.ensure_cached(workflow_key).to_vec();
        let candidates: Vec<&Record> = entries
            .iter()
            .filter(|rec| {
                !is_locked(rec)
                    && id_of(rec).map_or(true, |id| !protected_ids.contains(id))
                    && source.matches(rec)
            })
            .collect();
        if candidates.len() <= max_snapshots {
            return Ok(0);
        }

        let excess = candidates.len() - max_snapshots;
        let dir = self.workflow_dir(workflow_key);
        let mut deleted = 0usize;
        let mut deleted_ids: HashSet<String> = HashSet::new();
        for rec in candidates.into_iter().take(excess) {
            let Some(id) = id_of(rec) else { continue };
            paths::validate_id(id)?;
            if fsio::remove_file_if_present(&dir.join(format!("{id}.json")))? {
                deleted += 1;
                deleted_ids.insert(id.to_string());
            }
        }
        metrics::counter!("snapvault_snapshots_pruned_total", deleted as u64);

        if !deleted_ids.is_empty() {
            if let Some(cached) = self.cache.get_mut(workflow_key) {
                cached.retain(|e| id_of(e).map_or(true, |id| !deleted_ids.contains(id)));
                if cached.is_empty() {
                    self.cache.remove(workflow_key);
                }
            }
        }
        fsio::remove_dir_if_empty(&dir);
        Ok(deleted)
    }
}
