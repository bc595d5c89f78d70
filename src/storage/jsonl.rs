//! JSONL-based storage implementation with in-memory caching.
//!
//! Each collection is one `<collection>.jsonl` file. Appends go straight to the
//! file; updates and deletes rewrite it from the cache. All mutations hold the
//! cache write lock for the whole file operation so concurrent jobs cannot
//! interleave a rewrite with an append.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockWriteGuard};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use super::traits::{Filter, HasId, Storage};
use crate::error::{Result, VibeError};

type Cache = HashMap<String, Vec<Value>>;

/// JSONL-based storage with in-memory caching.
pub struct JsonlStorage {
    base_path: PathBuf,
    cache: RwLock<Cache>,
}

impl std::fmt::Debug for JsonlStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlStorage")
            .field("base_path", &self.base_path)
            .finish_non_exhaustive()
    }
}

fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(|v| v.as_str())
}

impl JsonlStorage {
    /// Create a new JsonlStorage at the given path.
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Directory holding the collection files.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", collection))
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<'_, Cache>> {
        self.cache.write().map_err(|e| VibeError::Storage(e.to_string()))
    }

    fn load_collection(&self, collection: &str) -> Result<Vec<Value>> {
        let path = self.collection_path(collection);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                records.push(serde_json::from_str(&line)?);
            }
        }
        log::debug!("Loaded {} record(s) from {}", records.len(), path.display());
        Ok(records)
    }

    /// Return the cached collection, loading it from disk on first use.
    fn collection_mut<'a>(&self, cache: &'a mut Cache, collection: &str) -> Result<&'a mut Vec<Value>> {
        if !cache.contains_key(collection) {
            let records = self.load_collection(collection)?;
            cache.insert(collection.to_string(), records);
        }
        cache
            .get_mut(collection)
            .ok_or_else(|| VibeError::Storage(format!("Collection not loaded: {}", collection)))
    }

    fn read_collection<T: DeserializeOwned>(&self, collection: &str, filters: &[Filter]) -> Result<Vec<T>> {
        {
            let cache = self.cache.read().map_err(|e| VibeError::Storage(e.to_string()))?;
            if let Some(records) = cache.get(collection) {
                return records
                    .iter()
                    .filter(|r| filters.iter().all(|f| f.matches(r)))
                    .map(|r| serde_json::from_value(r.clone()).map_err(VibeError::from))
                    .collect();
            }
        }

        let mut cache = self.write_lock()?;
        let records = self.collection_mut(&mut cache, collection)?;
        records
            .iter()
            .filter(|r| filters.iter().all(|f| f.matches(r)))
            .map(|r| serde_json::from_value(r.clone()).map_err(VibeError::from))
            .collect()
    }

    fn append_to_file(&self, collection: &str, record: &Value) -> Result<()> {
        let path = self.collection_path(collection);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        Ok(())
    }

    fn rewrite_file(&self, collection: &str, records: &[Value]) -> Result<()> {
        let path = self.collection_path(collection);
        let tmp = path.with_extension("jsonl.tmp");
        {
            let mut file = File::create(&tmp)?;
            for record in records {
                writeln!(file, "{}", serde_json::to_string(record)?)?;
            }
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl Storage for JsonlStorage {
    fn create<T: Serialize + HasId>(&self, record: &T) -> Result<()> {
        let collection = T::collection();
        let value = serde_json::to_value(record)?;

        let mut cache = self.write_lock()?;
        let records = self.collection_mut(&mut cache, collection)?;
        if records.iter().any(|r| record_id(r) == Some(record.id())) {
            return Err(VibeError::Storage(format!(
                "Duplicate id in {}: {}",
                collection,
                record.id()
            )));
        }

        // Append to file first (source of truth)
        self.append_to_file(collection, &value)?;
        records.push(value);
        Ok(())
    }

    fn get<T: DeserializeOwned + HasId>(&self, id: &str) -> Result<Option<T>> {
        let found: Vec<T> = self.read_collection(T::collection(), &[Filter::eq("id", id)])?;
        Ok(found.into_iter().next())
    }

    fn update<T: Serialize + HasId>(&self, record: &T) -> Result<()> {
        let collection = T::collection();
        let value = serde_json::to_value(record)?;

        let mut cache = self.write_lock()?;
        let records = self.collection_mut(&mut cache, collection)?;
        let slot = records
            .iter_mut()
            .find(|r| record_id(r) == Some(record.id()))
            .ok_or_else(|| VibeError::NotFound(format!("{} in {}", record.id(), collection)))?;
        *slot = value;

        self.rewrite_file(collection, records)
    }

    fn upsert<T: Serialize + HasId>(&self, record: &T) -> Result<()> {
        let collection = T::collection();
        let value = serde_json::to_value(record)?;

        let mut cache = self.write_lock()?;
        let records = self.collection_mut(&mut cache, collection)?;
        let existing = records.iter().position(|r| record_id(r) == Some(record.id()));
        match existing {
            Some(idx) => {
                records[idx] = value;
                self.rewrite_file(collection, records)
            }
            None => {
                self.append_to_file(collection, &value)?;
                records.push(value);
                Ok(())
            }
        }
    }

    fn delete<T: HasId>(&self, id: &str) -> Result<()> {
        let collection = T::collection();

        let mut cache = self.write_lock()?;
        let records = self.collection_mut(&mut cache, collection)?;
        let original_len = records.len();
        records.retain(|r| record_id(r) != Some(id));

        if records.len() == original_len {
            return Err(VibeError::NotFound(format!("{} in {}", id, collection)));
        }

        self.rewrite_file(collection, records)
    }

    fn query<T: DeserializeOwned + HasId>(&self, filters: &[Filter]) -> Result<Vec<T>> {
        self.read_collection(T::collection(), filters)
    }
}
