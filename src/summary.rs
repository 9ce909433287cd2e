//! Work summary used to normalize exclusive times

use crate::error::{Result, SerialsumError};
use serde::{Deserialize, Serialize};

/// Minimum and maximum total work (serial + parallel) across threads
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSummary")]
pub struct SummaryContext {
    max_work: f64,
    min_work: f64,
}

#[derive(Deserialize)]
struct RawSummary {
    max_work: f64,
    min_work: f64,
}

impl TryFrom<RawSummary> for SummaryContext {
    type Error = SerialsumError;

    fn try_from(raw: RawSummary) -> Result<Self> {
        Self::new(raw.max_work, raw.min_work)
    }
}

impl SummaryContext {
    /// Create a summary, rejecting values that would make percentages undefined
    pub fn new(max_work: f64, min_work: f64) -> Result<Self> {
        if !max_work.is_finite() || !min_work.is_finite() {
            return Err(SerialsumError::DegenerateInput(format!(
                "non-finite work summary (max {}, min {})",
                max_work, min_work
            )));
        }
        if min_work <= 0.0 || max_work <= 0.0 {
            return Err(SerialsumError::DegenerateInput(format!(
                "work summary must be positive (max {}, min {})",
                max_work, min_work
            )));
        }
        if min_work > max_work {
            return Err(SerialsumError::DegenerateInput(format!(
                "minimum work {} exceeds maximum work {}",
                min_work, max_work
            )));
        }
        Ok(Self { max_work, min_work })
    }

    /// Longest total work of any thread
    pub fn max_work(&self) -> f64 {
        self.max_work
    }

    /// Shortest total work of any thread
    pub fn min_work(&self) -> f64 {
        self.min_work
    }

    /// Ratio of the least-loaded to the most-loaded thread
    pub fn balance(&self) -> f64 {
        self.min_work / self.max_work
    }
}
