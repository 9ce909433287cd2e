//! Serial-section collection and its on-disk snapshot
//!
//! Aggregating exclusive time over a large trace database is the expensive
//! step, so the sorted collection is cached per (database, dataset) pair.
//! The snapshot is keyed by the database's content checksum rather than its
//! path or mtime.
//!
//! # Snapshot layout
//!
//! Two consecutive MessagePack values, both written in named (map) form:
//!
//! ```text
//! SnapshotHeader { format_version, dataset, checksum, record_count }
//! Vec<SerialSectionRecord>
//! ```
//!
//! The header is decoded first so a stale snapshot is rejected without
//! decoding its records.

use crate::checksum::file_checksum;
use crate::error::{Result, SerialsumError};
use crate::record::{report_order, PrimitiveKind, SerialSectionRecord};
use crate::source::RecordSource;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Version of the snapshot layout written by this build
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

const SNAPSHOT_EXTENSION: &str = "msgpack";

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotHeader {
    format_version: u32,
    dataset: String,
    checksum: String,
    record_count: u64,
}

/// All serial sections of one dataset, sorted by exclusive time descending
#[derive(Debug, Clone, PartialEq)]
pub struct SerialSectionCollection {
    /// Database the collection is reported against (not persisted)
    database: PathBuf,
    dataset: String,
    /// Content checksum of `database`, computed lazily
    checksum: Option<String>,
    records: Vec<SerialSectionRecord>,
}

impl SerialSectionCollection {
    /// Build a collection from the record source
    ///
    /// Locks and hardware critical sections are merged and sorted by
    /// exclusive time descending. Equal times are ordered by primitive
    /// address, then label id.
    pub fn build(source: &dyn RecordSource, database: &Path, dataset: &str) -> Result<Self> {
        let mut records = Vec::new();
        for kind in PrimitiveKind::ALL {
            records.extend(source.serial_sections(dataset, kind)?);
        }
        records.sort_by(report_order);

        tracing::info!(
            database = %database.display(),
            dataset,
            records = records.len(),
            "built serial-section collection"
        );

        Ok(Self {
            database: database.to_path_buf(),
            dataset: dataset.to_string(),
            checksum: None,
            records,
        })
    }

    /// Restore the collection from a valid snapshot, or build it
    ///
    /// A snapshot for another dataset, another database content, or another
    /// format version is discarded and rebuilt. A snapshot that cannot be
    /// decoded is reported as [`SerialsumError::CacheCorrupt`].
    pub fn restore_or_build(
        source: &dyn RecordSource,
        database: &Path,
        dataset: &str,
        cache_dir: &Path,
    ) -> Result<Self> {
        let checksum = file_checksum(database).map_err(|e| {
            SerialsumError::DataSource(format!("cannot read {}: {}", database.display(), e))
        })?;
        let path = snapshot_path(cache_dir, database, dataset);

        match read_snapshot(&path, dataset, &checksum) {
            Ok(Some(mut collection)) => {
                collection.database = database.to_path_buf();
                tracing::info!(
                    snapshot = %path.display(),
                    records = collection.records.len(),
                    "restored serial-section collection"
                );
                return Ok(collection);
            }
            Ok(None) => {
                tracing::debug!(snapshot = %path.display(), "no snapshot");
            }
            Err(err) if err.is_recoverable() => {
                tracing::warn!(snapshot = %path.display(), "discarding stale snapshot: {}", err);
                remove_if_present(&path)?;
            }
            Err(err) => return Err(err),
        }

        let mut collection = Self::build(source, database, dataset)?;
        collection.checksum = Some(checksum);
        Ok(collection)
    }

    /// Write the snapshot for this collection, replacing any previous one
    ///
    /// The snapshot is written to a temporary file and renamed into place.
    pub fn persist(&mut self, cache_dir: &Path) -> Result<PathBuf> {
        let checksum = match &self.checksum {
            Some(checksum) => checksum.clone(),
            None => {
                let checksum = file_checksum(&self.database)?;
                self.checksum = Some(checksum.clone());
                checksum
            }
        };

        fs::create_dir_all(cache_dir)?;
        let path = snapshot_path(cache_dir, &self.database, &self.dataset);
        let tmp = path.with_extension(format!("{}.tmp", SNAPSHOT_EXTENSION));

        let header = SnapshotHeader {
            format_version: SNAPSHOT_FORMAT_VERSION,
            dataset: self.dataset.clone(),
            checksum,
            record_count: self.records.len() as u64,
        };

        let written = write_snapshot(&tmp, &header, &self.records)
            .and_then(|()| fs::rename(&tmp, &path).map_err(SerialsumError::from));
        if let Err(err) = written {
            if let Err(cleanup) = remove_if_present(&tmp) {
                tracing::warn!(tmp = %tmp.display(), "failed to remove partial snapshot: {}", cleanup);
            }
            return Err(err);
        }

        tracing::debug!(snapshot = %path.display(), records = self.records.len(), "persisted snapshot");
        Ok(path)
    }

    /// Database this collection reports against
    pub fn database(&self) -> &Path {
        &self.database
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Content checksum, if it has been computed
    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    /// Records in report order
    pub fn records(&self) -> &[SerialSectionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Snapshot file for a (database, dataset) pair
///
/// The name is the database file name without directory or extension,
/// a dash, and the dataset name.
pub fn snapshot_path(cache_dir: &Path, database: &Path, dataset: &str) -> PathBuf {
    let base = database
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trace".to_string());
    let dataset: String = dataset
        .chars()
        .map(|c| if std::path::is_separator(c) { '_' } else { c })
        .collect();
    cache_dir.join(format!("{}-{}.{}", base, dataset, SNAPSHOT_EXTENSION))
}

fn corrupt(path: &Path, reason: impl Into<String>) -> SerialsumError {
    SerialsumError::CacheCorrupt {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn write_snapshot(tmp: &Path, header: &SnapshotHeader, records: &[SerialSectionRecord]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(tmp)?);
    rmp_serde::encode::write_named(&mut writer, header).map_err(|e| SerialsumError::Snapshot(e.to_string()))?;
    rmp_serde::encode::write_named(&mut writer, records).map_err(|e| SerialsumError::Snapshot(e.to_string()))?;
    writer.flush()?;
    Ok(())
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Read and validate a snapshot
///
/// Returns `Ok(None)` when no snapshot exists.
fn read_snapshot(path: &Path, dataset: &str, checksum: &str) -> Result<Option<SerialSectionCollection>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut reader = BufReader::new(file);

    let header: SnapshotHeader =
        rmp_serde::from_read(&mut reader).map_err(|e| corrupt(path, format!("bad header: {}", e)))?;

    if header.format_version != SNAPSHOT_FORMAT_VERSION {
        return Err(SerialsumError::SnapshotVersion {
            expected: SNAPSHOT_FORMAT_VERSION,
            found: header.format_version,
        });
    }
    if header.dataset != dataset {
        return Err(SerialsumError::InvalidDataset {
            expected: dataset.to_string(),
            found: header.dataset,
        });
    }
    if header.checksum != checksum {
        return Err(SerialsumError::ChecksumMismatch {
            expected: checksum.to_string(),
            found: header.checksum,
        });
    }

    let records: Vec<SerialSectionRecord> =
        rmp_serde::from_read(&mut reader).map_err(|e| corrupt(path, format!("bad records: {}", e)))?;

    if !reader.fill_buf()?.is_empty() {
        return Err(corrupt(path, "trailing data after records"));
    }
    if records.len() as u64 != header.record_count {
        return Err(corrupt(
            path,
            format!("header lists {} records, found {}", header.record_count, records.len()),
        ));
    }
    if records.windows(2).any(|w| w[0].total_time() < w[1].total_time()) {
        return Err(corrupt(path, "records are not sorted by exclusive time"));
    }
    for record in &records {
        record.validate().map_err(|e| corrupt(path, e.to_string()))?;
    }

    Ok(Some(SerialSectionCollection {
        database: PathBuf::new(),
        dataset: header.dataset,
        checksum: Some(header.checksum),
        records,
    }))
}
