/// Report pipeline benchmarks
///
/// Measures filtering, column rendering and snapshot restore over a
/// synthetic collection of serial sections.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serialsum::collection::SerialSectionCollection;
use serialsum::columns::{render_column, ColumnKind};
use serialsum::filter::{apply_filters, SerialFilter};
use serialsum::record::{PrimitiveKind, SerialSectionRecord};
use serialsum::source::RecordSource;
use serialsum::summary::SummaryContext;
use std::path::Path;
use std::time::Duration;

struct SyntheticSource {
    sections: usize,
}

impl RecordSource for SyntheticSource {
    fn serial_sections(&self, _dataset: &str, kind: PrimitiveKind) -> serialsum::Result<Vec<SerialSectionRecord>> {
        Ok(synthetic_records(self.sections, kind))
    }

    fn summary(&self, _dataset: &str) -> serialsum::Result<SummaryContext> {
        SummaryContext::new(1.0e9, 5.0e8)
    }
}

fn synthetic_records(count: usize, kind: PrimitiveKind) -> Vec<SerialSectionRecord> {
    let labels = ["proc_table", "runqueue", "vm_area", "inode_cache"];
    (0..count)
        .map(|i| {
            let mut r = SerialSectionRecord::new(labels[i % labels.len()], i as u64, 0x1000 + i as u64 * 64, kind);
            for hold in 0..32u64 {
                r.record_hold(hold % 8, (hold % 4) as u32, 0x40_0000 + (hold % 3) * 8, (i as u64 * 7 + hold) as f64);
            }
            r
        })
        .collect()
}

fn bench_filters(c: &mut Criterion) {
    let records = synthetic_records(10_000, PrimitiveKind::Lock);
    let filters = [
        SerialFilter::Label("runqueue".to_string()),
        SerialFilter::TidCount(4),
        SerialFilter::CpuCount(2),
    ];

    let mut group = c.benchmark_group("apply_filters");
    group.measurement_time(Duration::from_secs(5));
    group.throughput(Throughput::Elements(records.len() as u64));

    group.bench_function("no_filters", |b| {
        b.iter(|| black_box(apply_filters(black_box(&records), &[])));
    });
    group.bench_function("three_filters", |b| {
        b.iter(|| black_box(apply_filters(black_box(&records), &filters)));
    });

    group.finish();
}

fn bench_columns(c: &mut Criterion) {
    let records = synthetic_records(1_000, PrimitiveKind::Lock);
    let summary = SummaryContext::new(1.0e9, 5.0e8).unwrap();

    let mut group = c.benchmark_group("render_column");
    group.measurement_time(Duration::from_secs(5));
    group.throughput(Throughput::Elements(records.len() as u64));

    for column in [ColumnKind::Pc, ColumnKind::Percent, ColumnKind::Cpus, ColumnKind::Tids] {
        group.bench_with_input(BenchmarkId::from_parameter(column), &column, |b, &column| {
            b.iter(|| {
                for record in &records {
                    black_box(render_column(record, column, &summary, None).unwrap());
                }
            });
        });
    }

    group.finish();
}

fn bench_snapshot_restore(c: &mut Criterion) {
    let dir = tempfile::TempDir::new().unwrap();
    let db = dir.path().join("mtrace.db");
    std::fs::write(&db, vec![0u8; 1 << 20]).unwrap();

    let mut group = c.benchmark_group("snapshot");
    group.measurement_time(Duration::from_secs(5));

    for sections in [100usize, 1_000, 10_000] {
        let source = SyntheticSource { sections };
        let cache = dir.path().join(format!("cache-{}", sections));
        let mut collection = SerialSectionCollection::build(&source, &db, "run1").unwrap();
        collection.persist(&cache).unwrap();

        group.bench_with_input(BenchmarkId::new("restore", sections), &sections, |b, _| {
            b.iter(|| {
                black_box(SerialSectionCollection::restore_or_build(&source, Path::new(&db), "run1", &cache).unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_filters, bench_columns, bench_snapshot_restore);
criterion_main!(benches);
