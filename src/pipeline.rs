//! One serialsum run: restore or build the collection, report, persist

use crate::collection::SerialSectionCollection;
use crate::dwarf::{AddressResolver, DwarfResolver};
use crate::error::Result;
use crate::report::{Report, ReportConfig};
use crate::source::RecordSource;

/// Produce the report for `config` and refresh the snapshot
///
/// The snapshot is written after the report is built, so nothing is
/// persisted when reporting fails.
pub fn run(source: &dyn RecordSource, config: &ReportConfig) -> Result<Report> {
    let resolver = config.exefile.as_deref().map(DwarfResolver::load).transpose()?;
    let summary = source.summary(&config.dataset)?;
    tracing::debug!(
        max_work = summary.max_work(),
        min_work = summary.min_work(),
        "loaded work summary"
    );

    let mut collection = SerialSectionCollection::restore_or_build(
        source,
        &config.database,
        &config.dataset,
        &config.cache_dir,
    )?;

    let report = Report::build(
        &collection,
        config,
        &summary,
        resolver.as_ref().map(|r| r as &dyn AddressResolver),
    )?;

    collection.persist(&config.cache_dir)?;
    Ok(report)
}
