//! Serial-section report
//!
//! A report is assembled completely in memory before anything is printed,
//! so a failure never leaves a partial table on stdout.

use crate::amdahl::{self, AmdahlProjection};
use crate::cli::OutputFormat;
use crate::collection::SerialSectionCollection;
use crate::columns::{render_column, ColumnKind};
use crate::dwarf::AddressResolver;
use crate::error::Result;
use crate::filter::{apply_filters, SerialFilter};
use crate::record::PrimitiveKind;
use crate::summary::SummaryContext;
use serde::Serialize;
use std::fmt::Write;
use std::path::PathBuf;

/// Immutable configuration for one report run
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    /// Trace database
    pub database: PathBuf,
    /// Dataset within the database
    pub dataset: String,
    /// Filters, all of which must pass
    pub filters: Vec<SerialFilter>,
    /// Columns printed after name, id and lock
    pub columns: Vec<ColumnKind>,
    /// Executable for pc resolution
    pub exefile: Option<PathBuf>,
    /// Snapshot directory
    pub cache_dir: PathBuf,
    pub format: OutputFormat,
}

impl ReportConfig {
    /// Default configuration for a (database, dataset) pair
    pub fn new(database: impl Into<PathBuf>, dataset: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            dataset: dataset.into(),
            filters: Vec::new(),
            columns: ColumnKind::DEFAULT.to_vec(),
            exefile: None,
            cache_dir: PathBuf::from("."),
            format: OutputFormat::Text,
        }
    }

    pub fn with_filters(mut self, filters: Vec<SerialFilter>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_columns(mut self, columns: Vec<ColumnKind>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_exefile(mut self, exefile: impl Into<PathBuf>) -> Self {
        self.exefile = Some(exefile.into());
        self
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

/// One reported serial section
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub name: String,
    pub label_id: u64,
    pub primitive: u64,
    pub kind: PrimitiveKind,
    pub exclusive_time: f64,
    /// Rendered cells, one per configured column
    pub cells: Vec<String>,
}

/// Ranked serial sections plus the speedup projection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub dataset: String,
    pub columns: Vec<ColumnKind>,
    pub rows: Vec<ReportRow>,
    /// Longest exclusive time among reported sections
    pub max_hold_time: f64,
    pub projection: AmdahlProjection,
}

impl Report {
    /// Filter the collection, render the configured columns and project speedup
    pub fn build(
        collection: &SerialSectionCollection,
        config: &ReportConfig,
        summary: &SummaryContext,
        resolver: Option<&dyn AddressResolver>,
    ) -> Result<Self> {
        let selected = apply_filters(collection.records(), &config.filters);
        tracing::debug!(
            total = collection.len(),
            selected = selected.len(),
            "applied {} filters",
            config.filters.len()
        );

        let mut rows = Vec::with_capacity(selected.len());
        let mut max_hold_time: f64 = 0.0;
        for record in selected {
            max_hold_time = max_hold_time.max(record.total_time());
            let cells = config
                .columns
                .iter()
                .map(|&column| render_column(record, column, summary, resolver))
                .collect::<Result<Vec<_>>>()?;
            rows.push(ReportRow {
                name: record.name.clone(),
                label_id: record.label_id,
                primitive: record.primitive,
                kind: record.kind,
                exclusive_time: record.total_time(),
                cells,
            });
        }

        let projection = amdahl::project(max_hold_time, summary)?;

        Ok(Self {
            dataset: collection.dataset().to_string(),
            columns: config.columns.clone(),
            rows,
            max_hold_time,
            projection,
        })
    }

    /// Render in the requested format
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Text => Ok(self.render_text()),
            OutputFormat::Json => self.render_json(),
        }
    }

    /// Fixed-column text table followed by the speedup table
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        let mut header = format!("{:<40}  {:>16}  {:>16}", "name", "id", "lock");
        let mut border = format!("{:<40}  {:>16}  {:>16}", "----", "--", "----");
        for column in &self.columns {
            let _ = write!(header, "  {:>16}", column.name());
            let _ = write!(border, "  {:>16}", "----");
        }
        let _ = writeln!(out, "{}", header);
        let _ = writeln!(out, "{}", border);

        for row in &self.rows {
            let _ = write!(out, "{:<40}  {:>16}  {:>16x}", row.name, row.label_id, row.primitive);
            for cell in &row.cells {
                let _ = write!(out, "  {:>16}", cell);
            }
            out.push('\n');
        }

        let _ = writeln!(out, "max amdahl {:.2}", self.projection.max_amdahl);
        let _ = writeln!(out, "min amdahl {:.2}", self.projection.min_amdahl);
        let _ = writeln!(out, "#core\tmin\tmax");
        for bound in &self.projection.bounds {
            let _ = writeln!(
                out,
                "{}\t{:.6}\t{:.6}",
                bound.cores, bound.min_speedup, bound.max_speedup
            );
        }

        out
    }

    /// Pretty-printed JSON
    pub fn render_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}
