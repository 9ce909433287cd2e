#![no_main]

use libfuzzer_sys::fuzz_target;
use serialsum::collection::{snapshot_path, SerialSectionCollection};
use serialsum::record::{PrimitiveKind, SerialSectionRecord};
use serialsum::source::RecordSource;
use serialsum::summary::SummaryContext;

struct EmptySource;

impl RecordSource for EmptySource {
    fn serial_sections(&self, _dataset: &str, _kind: PrimitiveKind) -> serialsum::Result<Vec<SerialSectionRecord>> {
        Ok(Vec::new())
    }

    fn summary(&self, _dataset: &str) -> serialsum::Result<SummaryContext> {
        SummaryContext::new(1.0, 1.0)
    }
}

fuzz_target!(|data: &[u8]| {
    // Arbitrary snapshot bytes must yield a collection or an error, never a panic
    let dir = tempfile::TempDir::new().unwrap();
    let db = dir.path().join("mtrace.db");
    std::fs::write(&db, b"fuzz").unwrap();
    std::fs::write(snapshot_path(dir.path(), &db, "run1"), data).unwrap();

    let _ = SerialSectionCollection::restore_or_build(&EmptySource, &db, "run1", dir.path());
});
