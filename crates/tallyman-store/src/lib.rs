//! Tallyman Storage Layer
//!
//! Implements the PredictionStore trait as one JSON file per document.
//!
//! # Layout
//!
//! ```text
//! {dir}/{doc_id}.json                  prediction
//! {dir}/{doc_id}.reconciliation.json   latest correlation result
//! ```
//!
//! Writes go to a uniquely named temporary file in the same directory and are
//! renamed into place, so readers never observe a partially written record
//! and concurrent writers of the same document resolve to last-write-wins.
//! Correlation results live in their own file, so recording one never
//! rewrites the prediction it was compared against.
//!
//! # Examples
//!
//! ```no_run
//! use tallyman_store::FilePredictionStore;
//!
//! let store = FilePredictionStore::new("/pred_cache");
//! // Store is now ready for prediction records
//! ```

#![warn(missing_docs)]

use chrono::{DateTime, Utc};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tallyman_domain::traits::PredictionStore;
use tallyman_domain::{DocumentId, PredictionRecord, Reconciliation};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Extension of record files
const RECORD_EXT: &str = "json";

/// Suffix of correlation result files
const RECONCILIATION_SUFFIX: &str = "reconciliation.json";

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem error
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A record file exists but does not hold a valid record
    #[error("Invalid record in {path}: {source}")]
    InvalidData {
        /// Offending file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// A record could not be serialized
    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Retention age out of range
    #[error("Invalid retention age: {0:?}")]
    InvalidAge(Duration),
}

/// File-backed implementation of PredictionStore
///
/// # Thread Safety
///
/// The store holds no in-memory state beyond its directory, so a single
/// instance can be shared across tasks behind an `Arc`.
#[derive(Debug, Clone)]
pub struct FilePredictionStore {
    dir: PathBuf,
}

impl FilePredictionStore {
    /// Create a store rooted at `dir`
    ///
    /// The directory is created on the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the records
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `doc_id`
    pub fn record_path(&self, doc_id: DocumentId) -> PathBuf {
        self.dir.join(format!("{}.{}", doc_id, RECORD_EXT))
    }

    /// Path of the latest correlation result for `doc_id`
    pub fn reconciliation_path(&self, doc_id: DocumentId) -> PathBuf {
        self.dir.join(format!("{}.{}", doc_id, RECONCILIATION_SUFFIX))
    }

    /// Record the outcome of a correlation
    ///
    /// Only the correlation file is written. [`load`](PredictionStore::load)
    /// attaches it to the prediction it was computed against and ignores it
    /// once a newer prediction replaces that one.
    pub fn store_reconciliation(
        &self,
        doc_id: DocumentId,
        reconciliation: &Reconciliation,
    ) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(reconciliation)?;
        self.write_atomic(doc_id, &self.reconciliation_path(doc_id), &bytes)?;
        debug!(doc_id = %doc_id, "Stored reconciliation");
        Ok(())
    }

    /// Delete records extracted more than `max_age` ago
    ///
    /// Returns the number of records removed.
    pub fn prune_older_than(&self, max_age: Duration) -> Result<usize, StoreError> {
        let age = chrono::Duration::from_std(max_age).map_err(|_| StoreError::InvalidAge(max_age))?;
        let cutoff = Utc::now()
            .checked_sub_signed(age)
            .ok_or(StoreError::InvalidAge(max_age))?;
        self.prune_before(cutoff)
    }

    /// Delete records whose `extracted_at` is before `cutoff`
    ///
    /// Unreadable records are skipped with a warning rather than deleted.
    pub fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(self.io_error(&self.dir, e)),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry.map_err(|e| self.io_error(&self.dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            let Some(doc_id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<u64>().ok())
                .map(DocumentId::new)
            else {
                continue;
            };

            let record = match read_record(&path) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable record");
                    continue;
                }
            };

            if record.extracted_at < cutoff && self.remove_if_stale(doc_id, cutoff)? {
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, cutoff = %cutoff, "Pruned prediction records");
        }
        Ok(removed)
    }

    /// Remove the record for `doc_id` if it is still older than `cutoff`
    ///
    /// The record is first renamed aside and checked again, so a prediction
    /// written after the caller's check survives. A record that turns out to
    /// be fresh is linked back into place unless an even newer one has
    /// already taken it.
    fn remove_if_stale(&self, doc_id: DocumentId, cutoff: DateTime<Utc>) -> Result<bool, StoreError> {
        let path = self.record_path(doc_id);
        let tombstone = self
            .dir
            .join(format!(".{}.{}.prune", doc_id, Uuid::now_v7()));

        match fs::rename(&path, &tombstone) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(self.io_error(&path, e)),
        }

        let stale = matches!(
            read_record(&tombstone),
            Ok(Some(ref record)) if record.extracted_at < cutoff
        );

        if !stale {
            match fs::hard_link(&tombstone, &path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => {
                    let _ = fs::rename(&tombstone, &path);
                    return Err(self.io_error(&path, e));
                }
            }
        }

        fs::remove_file(&tombstone).map_err(|e| self.io_error(&tombstone, e))?;
        if stale {
            let reconciliation = self.reconciliation_path(doc_id);
            match fs::remove_file(&reconciliation) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(self.io_error(&reconciliation, e)),
            }
        }
        Ok(stale)
    }

    fn write_atomic(&self, doc_id: DocumentId, target: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| self.io_error(&self.dir, e))?;

        let tmp = self.dir.join(format!(".{}.{}.tmp", doc_id, Uuid::now_v7()));
        let written = fs::File::create(&tmp).and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(self.io_error(&tmp, e));
        }

        if let Err(e) = fs::rename(&tmp, target) {
            let _ = fs::remove_file(&tmp);
            return Err(self.io_error(target, e));
        }
        Ok(())
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl PredictionStore for FilePredictionStore {
    type Error = StoreError;

    fn store(&self, record: &PredictionRecord) -> Result<(), Self::Error> {
        let prediction = PredictionRecord {
            reconciliation: None,
            ..record.clone()
        };
        let bytes = serde_json::to_vec_pretty(&prediction)?;
        let target = self.record_path(record.doc_id);
        self.write_atomic(record.doc_id, &target, &bytes)?;
        debug!(doc_id = %record.doc_id, path = %target.display(), "Stored prediction record");

        if let Some(reconciliation) = &record.reconciliation {
            self.store_reconciliation(record.doc_id, reconciliation)?;
        }
        Ok(())
    }

    fn load(&self, doc_id: DocumentId) -> Result<Option<PredictionRecord>, Self::Error> {
        let Some(mut record) = read_record(&self.record_path(doc_id))? else {
            return Ok(None);
        };

        let path = self.reconciliation_path(doc_id);
        match read_json::<Reconciliation>(&path) {
            Ok(Some(reconciliation)) if reconciliation.describes(&record) => {
                record.reconciliation = Some(reconciliation);
            }
            Ok(_) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Ignoring unreadable reconciliation"),
        }
        Ok(Some(record))
    }
}

fn read_record(path: &Path) -> Result<Option<PredictionRecord>, StoreError> {
    read_json(path)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::InvalidData {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tallyman_domain::Prediction;
    use tempfile::TempDir;

    fn record_at(doc_id: u64, secs: i64, amount: &str) -> PredictionRecord {
        PredictionRecord::new(
            DocumentId::new(doc_id),
            &Prediction {
                amount: Some(amount.to_string()),
                purchase_date: None,
            },
            None,
            None,
            Utc.timestamp_opt(secs, 0).unwrap(),
        )
    }

    #[test]
    fn test_remove_if_stale_keeps_record_rewritten_after_check() {
        let dir = TempDir::new().unwrap();
        let store = FilePredictionStore::new(dir.path());
        let cutoff = Utc.timestamp_opt(1_000, 0).unwrap();

        // Seen as old by the directory scan, then replaced before removal
        store.store(&record_at(7, 10, "1.00")).unwrap();
        store.store(&record_at(7, 5_000, "2.00")).unwrap();

        assert!(!store.remove_if_stale(DocumentId::new(7), cutoff).unwrap());
        let kept = store.load(DocumentId::new(7)).unwrap().unwrap();
        assert_eq!(kept.amount_pred, "2.00");
    }

    #[test]
    fn test_remove_if_stale_removes_old_record_and_reconciliation() {
        let dir = TempDir::new().unwrap();
        let store = FilePredictionStore::new(dir.path());
        let record = record_at(8, 10, "1.00");
        store.store(&record).unwrap();
        store
            .store_reconciliation(
                record.doc_id,
                &Reconciliation::compare(&record, None, None, Utc::now()),
            )
            .unwrap();

        let cutoff = Utc.timestamp_opt(1_000, 0).unwrap();
        assert!(store.remove_if_stale(record.doc_id, cutoff).unwrap());
        assert!(store.load(record.doc_id).unwrap().is_none());
        assert!(!store.reconciliation_path(record.doc_id).exists());

        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_remove_if_stale_missing_record() {
        let dir = TempDir::new().unwrap();
        let store = FilePredictionStore::new(dir.path());
        let cutoff = Utc.timestamp_opt(1_000, 0).unwrap();
        assert!(!store.remove_if_stale(DocumentId::new(9), cutoff).unwrap());
    }
}
