//! Error taxonomy for serial-section analysis
//!
//! Only snapshot staleness (checksum, dataset name, format version) is
//! recoverable: the cache falls back to a fresh build. Everything else is
//! fatal and propagates to the command line.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while building, caching or reporting serial sections
#[derive(Error, Debug)]
pub enum SerialsumError {
    #[error("trace database error: {0}")]
    DataSource(String),

    #[error("corrupt snapshot {}: {reason}", path.display())]
    CacheCorrupt { path: PathBuf, reason: String },

    #[error("snapshot checksum mismatch: expected {expected}, found {found}")]
    ChecksumMismatch { expected: String, found: String },

    #[error("snapshot dataset mismatch: expected {expected}, found {found}")]
    InvalidDataset { expected: String, found: String },

    #[error("snapshot format version mismatch: expected {expected}, found {found}")]
    SnapshotVersion { expected: u32, found: u32 },

    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    #[error("address resolver: {0}")]
    Resolver(String),

    #[error("failed to write snapshot: {0}")]
    Snapshot(String),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SerialsumError {
    /// True for conditions the cache handles by rebuilding from the database
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SerialsumError::ChecksumMismatch { .. }
                | SerialsumError::InvalidDataset { .. }
                | SerialsumError::SnapshotVersion { .. }
        )
    }
}

impl From<rusqlite::Error> for SerialsumError {
    fn from(err: rusqlite::Error) -> Self {
        SerialsumError::DataSource(err.to_string())
    }
}

/// Result type for serialsum operations
pub type Result<T> = std::result::Result<T, SerialsumError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staleness_is_recoverable() {
        let err = SerialsumError::ChecksumMismatch {
            expected: "aa".to_string(),
            found: "bb".to_string(),
        };
        assert!(err.is_recoverable());

        let err = SerialsumError::InvalidDataset {
            expected: "run1".to_string(),
            found: "run2".to_string(),
        };
        assert!(err.is_recoverable());

        let err = SerialsumError::SnapshotVersion {
            expected: 1,
            found: 0,
        };
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_corruption_is_fatal() {
        let err = SerialsumError::CacheCorrupt {
            path: PathBuf::from("cache/db-run1.msgpack"),
            reason: "truncated".to_string(),
        };
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("cache/db-run1.msgpack"));
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_degenerate_input_is_fatal() {
        let err = SerialsumError::DegenerateInput("max_work is zero".to_string());
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "degenerate input: max_work is zero");
    }

    #[test]
    fn test_json_error_is_fatal() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: SerialsumError = json_err.into();
        assert!(matches!(err, SerialsumError::Json(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_sqlite_error_maps_to_data_source() {
        let err: SerialsumError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, SerialsumError::DataSource(_)));
    }
}
