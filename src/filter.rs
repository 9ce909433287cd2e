//! Serial-section filtering for --filter-* options
//!
//! Supports:
//! - Label name: --filter-label proc_table
//! - Thread spread: --filter-tid-count 1 (held by more than one thread)
//! - CPU spread: --filter-cpu-count 3 (held on more than three CPUs)
//!
//! Filters compose by AND.

use crate::record::SerialSectionRecord;
use serde::{Deserialize, Serialize};

/// Predicate selecting which serial sections are reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SerialFilter {
    /// Keep sections whose label name matches exactly
    Label(String),
    /// Keep sections held by more than N distinct threads
    TidCount(usize),
    /// Keep sections held on more than N distinct CPUs
    CpuCount(usize),
}

impl SerialFilter {
    /// Check if a serial section passes this filter
    pub fn matches(&self, record: &SerialSectionRecord) -> bool {
        match self {
            SerialFilter::Label(label) => record.name == *label,
            SerialFilter::TidCount(count) => record.thread_count() > *count,
            SerialFilter::CpuCount(count) => record.cpu_count() > *count,
        }
    }
}

/// Select the records that pass every filter, preserving order
///
/// Records are returned by reference; with no filters every record is
/// returned unchanged.
pub fn apply_filters<'a>(
    records: &'a [SerialSectionRecord],
    filters: &[SerialFilter],
) -> Vec<&'a SerialSectionRecord> {
    if filters.is_empty() {
        return records.iter().collect();
    }

    records
        .iter()
        .filter(|record| filters.iter().all(|f| f.matches(record)))
        .collect()
}
