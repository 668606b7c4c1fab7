//! SnapshotFile: JSON-array persistence of performance history.
//!
//! Writes go to a sibling `*.tmp` file which is synced and then renamed over
//! the previous snapshot, so a crash mid-write leaves the old file intact.
//! Each write carries the request counter it was taken at; a write older
//! than one already on disk is skipped.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;
use tunegrid_core::{PerformanceRecord, PersistedRecord};

use crate::error::{StoreError, StoreResult};

/// What a call to [`SnapshotFile::write`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The snapshot was replaced with this many records.
    Written(usize),
    /// A newer snapshot was already on disk.
    Stale,
}

/// A snapshot location plus the sequence number of the last write.
#[derive(Debug)]
pub struct SnapshotFile {
    path: PathBuf,
    /// Held for the whole write so concurrent writers serialize.
    last_sequence: Mutex<Option<u64>>,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_sequence: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot. `Ok(None)` means there is no snapshot yet.
    ///
    /// Records without a `timeout` field take `default_timeout_secs`; the
    /// second element of the result counts them.
    pub fn read(
        &self,
        default_timeout_secs: u32,
    ) -> StoreResult<Option<(Vec<PerformanceRecord>, usize)>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let persisted: Vec<PersistedRecord> =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Deserialize(e.to_string()))?;

        let defaulted = persisted.iter().filter(|r| r.timeout.is_none()).count();
        let records = persisted
            .into_iter()
            .map(|r| r.into_record(default_timeout_secs))
            .collect();
        Ok(Some((records, defaulted)))
    }

    /// Atomically replace the snapshot with `records` (oldest first).
    pub fn write(&self, records: &[PerformanceRecord], sequence: u64) -> StoreResult<WriteOutcome> {
        let mut last = self
            .last_sequence
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(previous) = *last
            && sequence < previous
        {
            debug!(sequence, previous, "skipping stale snapshot write");
            return Ok(WriteOutcome::Stale);
        }

        let persisted: Vec<PersistedRecord> =
            records.iter().cloned().map(PersistedRecord::from).collect();
        let body = serde_json::to_vec_pretty(&persisted)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;

        let tmp = self.temp_path()?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let write_err = |source| StoreError::Write {
            path: tmp.clone(),
            source,
        };
        let mut file = File::create(&tmp).map_err(write_err)?;
        file.write_all(&body).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);

        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;

        *last = Some(sequence);
        debug!(path = ?self.path, records = records.len(), sequence, "snapshot written");
        Ok(WriteOutcome::Written(records.len()))
    }

    fn temp_path(&self) -> StoreResult<PathBuf> {
        let name = self
            .path
            .file_name()
            .ok_or_else(|| StoreError::InvalidPath(self.path.clone()))?;
        let mut tmp_name = name.to_os_string();
        tmp_name.push(".tmp");
        Ok(self.path.with_file_name(tmp_name))
    }
}
