//! Report columns
//!
//! Each column renders one cell of a serial-section row. Percentages are
//! normalized against different totals: `cpus` against the section's own
//! exclusive time, `tids` against the longest per-thread work. The
//! asymmetry matches the historical report format and is kept as is.

use crate::dwarf::AddressResolver;
use crate::error::{Result, SerialsumError};
use crate::record::SerialSectionRecord;
use crate::summary::SummaryContext;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column selectable with --print
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Dominant program counter (resolved to file:line with --exefile)
    Pc,
    /// Exclusive hold time
    Length,
    /// Exclusive hold time as a percentage of the longest thread's work
    Percent,
    /// Per-CPU share of the section's exclusive time
    Cpus,
    /// Per-thread exclusive time as a percentage of the longest thread's work
    Tids,
}

impl ColumnKind {
    /// Columns printed when none are requested
    pub const DEFAULT: [ColumnKind; 3] = [ColumnKind::Pc, ColumnKind::Length, ColumnKind::Percent];

    /// Header label
    pub fn name(&self) -> &'static str {
        match self {
            ColumnKind::Pc => "pc",
            ColumnKind::Length => "length",
            ColumnKind::Percent => "percent",
            ColumnKind::Cpus => "cpus",
            ColumnKind::Tids => "tids",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Render one cell of a serial-section row
pub fn render_column(
    record: &SerialSectionRecord,
    kind: ColumnKind,
    summary: &SummaryContext,
    resolver: Option<&dyn AddressResolver>,
) -> Result<String> {
    match kind {
        ColumnKind::Pc => Ok(render_pc(record, resolver)),
        ColumnKind::Length => Ok(record.total_time().to_string()),
        ColumnKind::Percent => {
            let percent = percent_of(record.total_time(), summary.max_work(), "maximum work")?;
            Ok(format!("{:.2}", percent))
        }
        ColumnKind::Cpus => {
            let total = record.total_time();
            let cells = record
                .per_cpu_time
                .iter()
                .map(|(cpu, &time)| {
                    percent_of(time, total, "section exclusive time")
                        .map(|percent| format!("{}:{:.2}%", cpu, percent))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(cells.join(" "))
        }
        ColumnKind::Tids => {
            let cells = record
                .per_thread_time
                .iter()
                .map(|(tid, &time)| {
                    percent_of(time, summary.max_work(), "maximum work")
                        .map(|percent| format!("{}:{:.2}%", tid, percent))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(cells.join(" "))
        }
    }
}

fn percent_of(value: f64, denominator: f64, what: &str) -> Result<f64> {
    if denominator <= 0.0 || !denominator.is_finite() {
        return Err(SerialsumError::DegenerateInput(format!(
            "cannot compute percentage of {} {}",
            what, denominator
        )));
    }
    Ok(value * 100.0 / denominator)
}

fn render_pc(record: &SerialSectionRecord, resolver: Option<&dyn AddressResolver>) -> String {
    let Some(pc) = record.dominant_pc() else {
        return "-".to_string();
    };
    let address = format!("{:016x}", pc);

    match resolver {
        Some(resolver) => {
            let (location, function) = match resolver.resolve(pc) {
                Some(loc) => (
                    format!("{}:{}", loc.file, loc.line),
                    loc.function.unwrap_or_else(|| "??".to_string()),
                ),
                None => ("??:0".to_string(), "??".to_string()),
            };
            format!("  {}  {:<64}  {}", address, location, function)
        }
        None => address,
    }
}
