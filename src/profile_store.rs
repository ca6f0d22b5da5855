// Copyright (c) 2025 Snapvault Contributors. Licensed under AGPLv3.
//! Flat store for prune/retention profiles, one JSON file per id under
//! `<data_dir>/profiles/`. Profiles are small and always loaded whole, so
//! there is no payload/metadata split and a single whole-collection cache:
//! any mutation invalidates it and the next `list_all` rescans the
//! directory.

use crate::errors::StoreError;
use crate::fsio;
use crate::paths;
use crate::record::{self, Record};
use std::fs;
use std::path::{Path, PathBuf};

pub struct ProfileStore {
    root: PathBuf,
    /// None = unloaded; Some = full listing, timestamp ascending.
    cache: Option<Vec<Record>>,
}

impl ProfileStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            root: data_dir.join("profiles"),
            cache: None,
        }
    }

    fn profile_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    /// Full overwrite by id. Invalidates the cache rather than patching it.
    pub fn put(&mut self, profile: &Record) -> Result<(), StoreError> {
        let id = record::id_of(profile).ok_or(StoreError::MissingField("id"))?;
        paths::validate_id(id)?;
        fs::create_dir_all(&self.root)?;
        fsio::write_json_atomic(&self.profile_path(id), profile)?;
        self.cache = None;
        Ok(())
    }

    /// All profiles, timestamp ascending, lazily rebuilt from a full scan.
    pub fn list_all(&mut self) -> Vec<Record> {
        if self.cache.is_none() {
            let mut entries = fsio::scan_json_dir(&self.root).records;
            record::sort_by_timestamp(&mut entries);
            self.cache = Some(entries);
        }
        self.cache.clone().unwrap_or_default()
    }

    /// Direct disk read, bypassing the cache. None if absent or unparsable.
    pub fn get(&self, id: &str) -> Result<Option<Record>, StoreError> {
        paths::validate_id(id)?;
        Ok(fsio::read_json_object(&self.profile_path(id)))
    }

    /// Idempotent removal. Invalidates the cache.
    pub fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        paths::validate_id(id)?;
        fsio::remove_file_if_present(&self.profile_path(id))?;
        self.cache = None;
        Ok(())
    }

    /// Null-removes-key merge, same semantics as the snapshot store's
    /// `update_meta`. NotFound if the profile does not exist.
    pub fn update(&mut self, id: &str, fields: &Record) -> Result<(), StoreError> {
        paths::validate_id(id)?;
        let path = self.profile_path(id);
        let Some(mut profile) = fsio::read_json_object(&path) else {
            return Err(StoreError::NotFound);
        };
        record::merge_fields(&mut profile, fields);
        fsio::write_json_atomic(&path, &profile)?;
        self.cache = None;
        Ok(())
    }
}
