//! CLI argument parsing for serialsum

use crate::columns::ColumnKind;
use crate::filter::SerialFilter;
use crate::report::ReportConfig;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output format for the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Fixed-column text table (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "serialsum")]
#[command(version)]
#[command(
    about = "Rank serial sections by exclusive time and project Amdahl speedup bounds",
    long_about = None
)]
pub struct Cli {
    /// mtrace SQLite database
    #[arg(value_name = "DB")]
    pub database: PathBuf,

    /// Dataset name within the database
    #[arg(value_name = "NAME")]
    pub dataset: String,

    /// Only report serial sections in this label
    #[arg(long = "filter-label", value_name = "LABEL")]
    pub filter_label: Vec<String>,

    /// Only report serial sections held by more than N threads
    #[arg(long = "filter-tid-count", value_name = "N")]
    pub filter_tid_count: Vec<usize>,

    /// Only report serial sections held on more than N CPUs
    #[arg(long = "filter-cpu-count", value_name = "N")]
    pub filter_cpu_count: Vec<usize>,

    /// Column to print (repeatable, default: pc length percent)
    #[arg(long = "print", value_enum, value_name = "COL")]
    pub print: Vec<ColumnKind>,

    /// Executable used to translate pc addresses to file:line
    #[arg(long = "exefile", value_name = "EXE")]
    pub exefile: Option<PathBuf>,

    /// Directory holding serial-section snapshots
    #[arg(long = "cache-dir", value_name = "DIR", default_value = ".")]
    pub cache_dir: PathBuf,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug tracing to stderr
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Freeze the parsed arguments into a report configuration
    pub fn into_config(self) -> ReportConfig {
        let filters = self
            .filter_label
            .into_iter()
            .map(SerialFilter::Label)
            .chain(self.filter_tid_count.into_iter().map(SerialFilter::TidCount))
            .chain(self.filter_cpu_count.into_iter().map(SerialFilter::CpuCount))
            .collect();

        let mut config = ReportConfig::new(self.database, self.dataset)
            .with_filters(filters)
            .with_cache_dir(self.cache_dir)
            .with_format(self.format);
        if !self.print.is_empty() {
            config = config.with_columns(self.print);
        }
        if let Some(exefile) = self.exefile {
            config = config.with_exefile(exefile);
        }
        config
    }
}
