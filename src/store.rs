//! Record persistence behind a replace-by-key row-store contract.
//!
//! The core depends only on `get` / `upsert` / `scan`; how a store lays
//! rows out is its own business. `CsvStore` keeps the flat delimited text
//! format with a header row (whole-collection read, in-place replace by
//! primary key, full rewrite); `MemoryStore` backs tests. A missing file is
//! a valid empty state, never an error; real I/O failures surface as
//! `StorageUnavailable` and abort the in-flight operation.

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::error::FleetError;
use crate::models::{BicycleRecord, RentalRecord, RepairRecord, UserRecord};

/// A persistable row with a primary key.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn key(&self) -> &str;
}

impl Record for UserRecord {
    fn key(&self) -> &str {
        &self.user_id
    }
}

impl Record for BicycleRecord {
    fn key(&self) -> &str {
        &self.bicycle_id
    }
}

impl Record for RentalRecord {
    fn key(&self) -> &str {
        &self.rental_id
    }
}

impl Record for RepairRecord {
    fn key(&self) -> &str {
        &self.report_id
    }
}

/// The replace-by-key row-store contract consumed by the core.
pub trait RecordStore<R: Record>: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<R>, FleetError>;

    /// Replaces the row with the same key, or appends. Single-record
    /// replace-in-place semantics; no multi-record transactionality.
    fn upsert(&self, record: R) -> Result<(), FleetError>;

    fn scan(&self, predicate: &dyn Fn(&R) -> bool) -> Result<Vec<R>, FleetError>;
}

/// In-memory store preserving insertion order. The default for tests and
/// ephemeral deployments.
pub struct MemoryStore<R> {
    rows: RwLock<Vec<R>>,
}

impl<R: Record> MemoryStore<R> {
    pub fn new() -> Self {
        MemoryStore {
            rows: RwLock::new(Vec::new()),
        }
    }
}

impl<R: Record> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> RecordStore<R> for MemoryStore<R> {
    fn get(&self, key: &str) -> Result<Option<R>, FleetError> {
        Ok(self.rows.read().iter().find(|r| r.key() == key).cloned())
    }

    fn upsert(&self, record: R) -> Result<(), FleetError> {
        let mut rows = self.rows.write();
        match rows.iter_mut().find(|r| r.key() == record.key()) {
            Some(existing) => *existing = record,
            None => rows.push(record),
        }
        Ok(())
    }

    fn scan(&self, predicate: &dyn Fn(&R) -> bool) -> Result<Vec<R>, FleetError> {
        Ok(self.rows.read().iter().filter(|r| predicate(r)).cloned().collect())
    }
}

/// Flat-file store: one CSV file per collection, header row, camelCase
/// column names. Updates read the whole collection, replace by key, and
/// rewrite the file; a guard mutex serializes writers within the process.
pub struct CsvStore<R> {
    path: PathBuf,
    guard: Mutex<()>,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Record> CsvStore<R> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvStore {
            path: path.into(),
            guard: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<R>, FleetError> {
        if !self.path.exists() {
            // No file yet: valid empty state, not an error.
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)
            .map_err(|e| FleetError::StorageUnavailable(e.to_string()))?;
        let mut rows = Vec::new();
        for result in reader.deserialize() {
            match result {
                Ok(row) => rows.push(row),
                Err(e) => {
                    // Tolerate a malformed row rather than losing the file.
                    log::warn!("skipping malformed row in {}: {}", self.path.display(), e);
                }
            }
        }
        Ok(rows)
    }

    fn write_all(&self, rows: &[R]) -> Result<(), FleetError> {
        let mut writer = csv::Writer::from_path(&self.path)
            .map_err(|e| FleetError::StorageUnavailable(e.to_string()))?;
        for row in rows {
            writer
                .serialize(row)
                .map_err(|e| FleetError::StorageUnavailable(e.to_string()))?;
        }
        writer
            .flush()
            .map_err(|e| FleetError::StorageUnavailable(e.to_string()))
    }
}

impl<R: Record> RecordStore<R> for CsvStore<R> {
    fn get(&self, key: &str) -> Result<Option<R>, FleetError> {
        let _guard = self.guard.lock();
        Ok(self.load()?.into_iter().find(|r| r.key() == key))
    }

    fn upsert(&self, record: R) -> Result<(), FleetError> {
        let _guard = self.guard.lock();
        let mut rows = self.load()?;
        match rows.iter_mut().find(|r| r.key() == record.key()) {
            Some(existing) => *existing = record,
            None => rows.push(record),
        }
        self.write_all(&rows)
    }

    fn scan(&self, predicate: &dyn Fn(&R) -> bool) -> Result<Vec<R>, FleetError> {
        let _guard = self.guard.lock();
        Ok(self.load()?.into_iter().filter(|r| predicate(r)).collect())
    }
}
