//! Serial-section records
//!
//! A record aggregates the exclusive hold time of one lock or hardware
//! critical section. The same total is broken down three ways: by thread,
//! by CPU and by acquiring program counter.

use crate::error::{Result, SerialsumError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Relative tolerance when checking that a breakdown sums to the total
const SUM_TOLERANCE: f64 = 1e-6;

/// Kind of serialization primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    /// Spinlock or mutex
    Lock,
    /// Hardware critical section (interrupts disabled, etc)
    HardwareCriticalSection,
}

impl PrimitiveKind {
    /// Both kinds, in the order they are merged into a collection
    pub const ALL: [PrimitiveKind; 2] = [PrimitiveKind::Lock, PrimitiveKind::HardwareCriticalSection];

    /// Tag stored in the trace database
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::Lock => "lock",
            PrimitiveKind::HardwareCriticalSection => "harcrit",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exclusive hold statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExclusiveStats {
    /// Accumulated exclusive hold time (monotonic time units)
    pub total_time: f64,
    /// Number of acquisitions
    pub acquisitions: u64,
}

/// Aggregated exclusive-time statistics for one serialization primitive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialSectionRecord {
    /// Name of the enclosing label
    pub name: String,
    /// Label instance
    pub label_id: u64,
    /// Raw address of the lock or critical section
    pub primitive: u64,
    pub kind: PrimitiveKind,
    pub exclusive: ExclusiveStats,
    /// Exclusive time by owning thread id
    pub per_thread_time: BTreeMap<u64, f64>,
    /// Exclusive time by CPU id
    pub per_cpu_time: BTreeMap<u32, f64>,
    /// Exclusive time by acquiring program counter
    pub per_pc_time: BTreeMap<u64, f64>,
}

impl SerialSectionRecord {
    /// Create an empty record for a primitive
    pub fn new(name: impl Into<String>, label_id: u64, primitive: u64, kind: PrimitiveKind) -> Self {
        Self {
            name: name.into(),
            label_id,
            primitive,
            kind,
            exclusive: ExclusiveStats::default(),
            per_thread_time: BTreeMap::new(),
            per_cpu_time: BTreeMap::new(),
            per_pc_time: BTreeMap::new(),
        }
    }

    /// Record one exclusive hold
    ///
    /// Updates the total and all three breakdowns together so they stay
    /// partitions of the same time.
    pub fn record_hold(&mut self, tid: u64, cpu: u32, pc: u64, time: f64) {
        self.exclusive.total_time += time;
        self.exclusive.acquisitions += 1;
        *self.per_thread_time.entry(tid).or_insert(0.0) += time;
        *self.per_cpu_time.entry(cpu).or_insert(0.0) += time;
        *self.per_pc_time.entry(pc).or_insert(0.0) += time;
    }

    /// Accumulated exclusive hold time
    pub fn total_time(&self) -> f64 {
        self.exclusive.total_time
    }

    /// Number of distinct threads that held the primitive
    pub fn thread_count(&self) -> usize {
        self.per_thread_time.len()
    }

    /// Number of distinct CPUs the primitive was held on
    pub fn cpu_count(&self) -> usize {
        self.per_cpu_time.len()
    }

    /// Program counter with the most exclusive time
    ///
    /// Ties go to the lowest address.
    pub fn dominant_pc(&self) -> Option<u64> {
        let mut best: Option<(u64, f64)> = None;
        for (&pc, &time) in &self.per_pc_time {
            match best {
                Some((_, best_time)) if time <= best_time => {}
                _ => best = Some((pc, time)),
            }
        }
        best.map(|(pc, _)| pc)
    }

    /// Check the record's internal invariants
    pub fn validate(&self) -> Result<()> {
        let total = self.exclusive.total_time;
        if !total.is_finite() || total < 0.0 {
            return Err(SerialsumError::DataSource(format!(
                "serial section {:#x} has invalid exclusive time {}",
                self.primitive, total
            )));
        }

        if self.exclusive.acquisitions > 0
            && (self.per_thread_time.is_empty()
                || self.per_cpu_time.is_empty()
                || self.per_pc_time.is_empty())
        {
            return Err(SerialsumError::DataSource(format!(
                "serial section {:#x} has {} acquisitions but an empty breakdown",
                self.primitive, self.exclusive.acquisitions
            )));
        }

        let breakdowns = [
            ("thread", self.per_thread_time.values().sum::<f64>()),
            ("cpu", self.per_cpu_time.values().sum::<f64>()),
            ("pc", self.per_pc_time.values().sum::<f64>()),
        ];
        for (axis, sum) in breakdowns {
            if (sum - total).abs() > SUM_TOLERANCE * total.max(1.0) {
                return Err(SerialsumError::DataSource(format!(
                    "serial section {:#x}: {} breakdown sums to {} but total is {}",
                    self.primitive, axis, sum, total
                )));
            }
        }

        Ok(())
    }
}

/// Report order: exclusive time descending, then primitive, label and kind ascending
pub fn report_order(a: &SerialSectionRecord, b: &SerialSectionRecord) -> Ordering {
    b.exclusive
        .total_time
        .total_cmp(&a.exclusive.total_time)
        .then_with(|| a.primitive.cmp(&b.primitive))
        .then_with(|| a.label_id.cmp(&b.label_id))
        .then_with(|| a.kind.cmp(&b.kind))
}
