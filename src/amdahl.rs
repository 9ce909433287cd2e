//! Amdahl speedup bounds from the dominant serial section
//!
//! The longest exclusive hold of any single serial section is treated as
//! the serial fraction of the longest-running thread:
//!
//! ```text
//! s        = max_hold_time / max_work
//! max(n)   = 1 / (s + (1 - s) / n)
//! min(n)   = (min_work / max_work) * max(n)
//! ```
//!
//! The lower bound scales the optimistic one by the load imbalance between
//! the least and most loaded threads.

use crate::error::{Result, SerialsumError};
use crate::summary::SummaryContext;
use serde::{Deserialize, Serialize};

/// Highest core count in the projection table
pub const MAX_CORES: u32 = 48;

/// Speedup bounds at one core count
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedupBound {
    pub cores: u32,
    pub min_speedup: f64,
    pub max_speedup: f64,
}

/// Speedup projection for 1..=MAX_CORES cores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmdahlProjection {
    /// Fraction of the longest thread's work spent in the dominant section
    pub serial_fraction: f64,
    /// Asymptotic upper bound, `1 / serial_fraction` (infinite when nothing is serial)
    pub max_amdahl: f64,
    /// Asymptotic bound scaled by load imbalance
    pub min_amdahl: f64,
    pub bounds: Vec<SpeedupBound>,
}

/// Amdahl's law: speedup on `cores` cores with parallel fraction `parallel`
pub fn amdahl_scale(parallel: f64, cores: u32) -> Result<f64> {
    if cores == 0 {
        return Err(SerialsumError::DegenerateInput("core count must be positive".to_string()));
    }
    let denominator = (1.0 - parallel) + parallel / f64::from(cores);
    if denominator <= 0.0 || !denominator.is_finite() {
        return Err(SerialsumError::DegenerateInput(format!(
            "Amdahl denominator {} for parallel fraction {} on {} cores",
            denominator, parallel, cores
        )));
    }
    Ok(1.0 / denominator)
}

/// Project speedup bounds from the longest exclusive hold time
pub fn project(max_hold_time: f64, summary: &SummaryContext) -> Result<AmdahlProjection> {
    if !max_hold_time.is_finite() || max_hold_time < 0.0 {
        return Err(SerialsumError::DegenerateInput(format!(
            "invalid maximum hold time {}",
            max_hold_time
        )));
    }

    let serial_fraction = max_hold_time / summary.max_work();
    let balance = summary.balance();

    let max_amdahl = if serial_fraction > 0.0 {
        1.0 / serial_fraction
    } else {
        f64::INFINITY
    };

    let mut bounds = Vec::with_capacity(MAX_CORES as usize);
    bounds.push(SpeedupBound {
        cores: 1,
        min_speedup: 1.0,
        max_speedup: 1.0,
    });
    for cores in 2..=MAX_CORES {
        let max_speedup = amdahl_scale(1.0 - serial_fraction, cores)?;
        bounds.push(SpeedupBound {
            cores,
            min_speedup: balance * max_speedup,
            max_speedup,
        });
    }

    Ok(AmdahlProjection {
        serial_fraction,
        max_amdahl,
        min_amdahl: balance * max_amdahl,
        bounds,
    })
}
