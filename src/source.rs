//! Serial-section record sources
//!
//! `RecordSource` is the seam between the analysis and the trace database.
//! `SqliteRecordSource` reads an mtrace SQLite export with the layout in
//! [`SCHEMA`]. Addresses are stored as SQLite integers and reinterpreted as
//! unsigned.

use crate::error::{Result, SerialsumError};
use crate::record::{PrimitiveKind, SerialSectionRecord};
use crate::summary::SummaryContext;
use rusqlite::{params, Connection, OpenFlags};
use std::collections::HashMap;
use std::path::Path;

/// Tables read by [`SqliteRecordSource`]
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS serial_sections (
    id           INTEGER PRIMARY KEY,
    dataset      TEXT    NOT NULL,
    kind         TEXT    NOT NULL,
    label_name   TEXT    NOT NULL,
    label_id     INTEGER NOT NULL,
    primitive    INTEGER NOT NULL,
    acquisitions INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS serial_section_times (
    section_id INTEGER NOT NULL REFERENCES serial_sections(id),
    axis       TEXT    NOT NULL,
    key        INTEGER NOT NULL,
    time       REAL    NOT NULL
);
CREATE TABLE IF NOT EXISTS thread_work (
    dataset TEXT    NOT NULL,
    tid     INTEGER NOT NULL,
    work    REAL    NOT NULL
);
";

/// Provider of raw serial-section records and the work summary
pub trait RecordSource {
    /// All records of one primitive kind in a dataset, with breakdowns populated
    fn serial_sections(&self, dataset: &str, kind: PrimitiveKind) -> Result<Vec<SerialSectionRecord>>;

    /// Min/max per-thread work of a dataset
    fn summary(&self, dataset: &str) -> Result<SummaryContext>;
}

/// Record source backed by an mtrace SQLite database
pub struct SqliteRecordSource {
    conn: Connection,
}

impl SqliteRecordSource {
    /// Open a trace database read-only
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(|e| {
            SerialsumError::DataSource(format!("cannot open {}: {}", path.display(), e))
        })?;
        Ok(Self { conn })
    }

    /// Wrap an existing connection
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

fn unsigned(value: i64) -> u64 {
    value as u64
}

impl RecordSource for SqliteRecordSource {
    fn serial_sections(&self, dataset: &str, kind: PrimitiveKind) -> Result<Vec<SerialSectionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, label_name, label_id, primitive, acquisitions
             FROM serial_sections
             WHERE dataset = ?1 AND kind = ?2
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![dataset, kind.as_str()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut records = Vec::new();
        let mut index = HashMap::new();
        for row in rows {
            let (id, name, label_id, primitive, acquisitions) = row?;
            let mut record = SerialSectionRecord::new(name, unsigned(label_id), unsigned(primitive), kind);
            record.exclusive.acquisitions = u64::try_from(acquisitions).map_err(|_| {
                SerialsumError::DataSource(format!(
                    "serial section {} has negative acquisition count {}",
                    id, acquisitions
                ))
            })?;
            index.insert(id, records.len());
            records.push(record);
        }

        let mut stmt = self.conn.prepare(
            "SELECT t.section_id, t.axis, t.key, t.time
             FROM serial_section_times t
             JOIN serial_sections s ON s.id = t.section_id
             WHERE s.dataset = ?1 AND s.kind = ?2",
        )?;
        let times = stmt.query_map(params![dataset, kind.as_str()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?;

        for row in times {
            let (section_id, axis, key, time) = row?;
            let Some(&slot) = index.get(&section_id) else {
                continue;
            };
            let record = &mut records[slot];
            match axis.as_str() {
                "tid" => *record.per_thread_time.entry(unsigned(key)).or_insert(0.0) += time,
                "cpu" => {
                    let cpu = u32::try_from(key).map_err(|_| {
                        SerialsumError::DataSource(format!(
                            "serial section {} has invalid cpu id {}",
                            section_id, key
                        ))
                    })?;
                    *record.per_cpu_time.entry(cpu).or_insert(0.0) += time;
                }
                "pc" => *record.per_pc_time.entry(unsigned(key)).or_insert(0.0) += time,
                other => {
                    return Err(SerialsumError::DataSource(format!(
                        "serial section {} has unknown time axis '{}'",
                        section_id, other
                    )))
                }
            }
        }

        for record in &mut records {
            record.exclusive.total_time = record.per_thread_time.values().sum();
            record.validate()?;
        }

        tracing::debug!(dataset, kind = %kind, count = records.len(), "loaded serial sections");
        Ok(records)
    }

    fn summary(&self, dataset: &str) -> Result<SummaryContext> {
        let (max_work, min_work): (Option<f64>, Option<f64>) = self.conn.query_row(
            "SELECT MAX(work), MIN(work) FROM thread_work WHERE dataset = ?1",
            params![dataset],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        match (max_work, min_work) {
            (Some(max_work), Some(min_work)) => SummaryContext::new(max_work, min_work),
            _ => Err(SerialsumError::DataSource(format!(
                "no thread work recorded for dataset '{}'",
                dataset
            ))),
        }
    }
}
