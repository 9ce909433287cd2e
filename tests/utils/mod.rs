// Shared fixtures for integration tests
//
// CountingSource counts record-source queries so tests can tell a snapshot
// restore from a rebuild. The SQLite helpers write small mtrace databases.
#![allow(dead_code)]

use rusqlite::{params, Connection};
use serialsum::record::{PrimitiveKind, SerialSectionRecord};
use serialsum::source::{RecordSource, SCHEMA};
use serialsum::summary::SummaryContext;
use serialsum::Result;
use std::cell::Cell;
use std::path::Path;

/// In-memory record source that counts serial_sections() calls
pub struct CountingSource {
    records: Vec<SerialSectionRecord>,
    max_work: f64,
    min_work: f64,
    queries: Cell<usize>,
}

impl CountingSource {
    pub fn new(records: Vec<SerialSectionRecord>, max_work: f64, min_work: f64) -> Self {
        Self {
            records,
            max_work,
            min_work,
            queries: Cell::new(0),
        }
    }

    /// Number of serial_sections() calls so far (two per build)
    pub fn queries(&self) -> usize {
        self.queries.get()
    }
}

impl RecordSource for CountingSource {
    fn serial_sections(&self, _dataset: &str, kind: PrimitiveKind) -> Result<Vec<SerialSectionRecord>> {
        self.queries.set(self.queries.get() + 1);
        Ok(self.records.iter().filter(|r| r.kind == kind).cloned().collect())
    }

    fn summary(&self, _dataset: &str) -> Result<SummaryContext> {
        SummaryContext::new(self.max_work, self.min_work)
    }
}

/// Record with a single hold
pub fn section(name: &str, primitive: u64, kind: PrimitiveKind, time: f64) -> SerialSectionRecord {
    let mut r = SerialSectionRecord::new(name, 1, primitive, kind);
    r.record_hold(1, 0, 0x40_0000 + primitive, time);
    r
}

/// The A=80 / B=20 records used throughout the tests
pub fn two_sections() -> Vec<SerialSectionRecord> {
    vec![
        section("B", 0xb000, PrimitiveKind::HardwareCriticalSection, 20.0),
        section("A", 0xa000, PrimitiveKind::Lock, 80.0),
    ]
}

/// Create an mtrace database with the serialsum schema
pub fn create_trace_db(path: &Path) -> Connection {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    conn
}

/// Insert one serial section with its holds as (tid, cpu, pc, time)
#[allow(clippy::too_many_arguments)]
pub fn insert_section(
    conn: &Connection,
    id: i64,
    dataset: &str,
    kind: &str,
    name: &str,
    label_id: i64,
    primitive: i64,
    holds: &[(i64, i64, i64, f64)],
) {
    conn.execute(
        "INSERT INTO serial_sections VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![id, dataset, kind, name, label_id, primitive, holds.len() as i64],
    )
    .unwrap();
    for &(tid, cpu, pc, time) in holds {
        for (axis, key) in [("tid", tid), ("cpu", cpu), ("pc", pc)] {
            conn.execute(
                "INSERT INTO serial_section_times VALUES (?1, ?2, ?3, ?4)",
                params![id, axis, key, time],
            )
            .unwrap();
        }
    }
}

pub fn insert_work(conn: &Connection, dataset: &str, tid: i64, work: f64) {
    conn.execute(
        "INSERT INTO thread_work VALUES (?1, ?2, ?3)",
        params![dataset, tid, work],
    )
    .unwrap();
}

/// Database with lock A (80) and critical section B (20), max work 200, min work 100
pub fn example_db(path: &Path) {
    let conn = create_trace_db(path);
    insert_section(
        &conn,
        1,
        "run1",
        "lock",
        "A",
        1,
        0xa000,
        &[(1, 0, 0x100, 60.0), (2, 1, 0x100, 20.0)],
    );
    insert_section(&conn, 2, "run1", "harcrit", "B", 2, 0xb000, &[(2, 1, 0x200, 20.0)]);
    insert_work(&conn, "run1", 1, 200.0);
    insert_work(&conn, "run1", 2, 100.0);
}
