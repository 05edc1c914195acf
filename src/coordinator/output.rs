use std::io::{self, Write};
use std::path::Path;

use tracing::warn;

use crate::common::io::{files_identical, write_full};
use crate::store::MergeStore;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OutputStats {
    pub records: u64,
    /// Content bytes written, terminators included.
    pub bytes: u64,
    /// Records with no separator. Intake rejects those, so this stays 0
    /// unless records were inserted directly.
    pub skipped: u64,
}

/// Drain the store in ascending index order, writing each record's content
/// (the bytes after its first separator) and flushing at the end.
pub fn write_output(store: &mut MergeStore, out: &mut impl Write) -> io::Result<OutputStats> {
    let mut stats = OutputStats::default();

    for record in store.drain() {
        let Some(content) = record.content() else {
            warn!(index = record.index(), "record has no separator, skipping");
            stats.skipped += 1;
            continue;
        };
        write_full(out, content)?;
        stats.records += 1;
        stats.bytes += content.len() as u64;
    }

    out.flush()?;
    Ok(stats)
}

/// Check a reconstruction against the original file.
pub fn verify_output(original: &Path, output: &Path) -> io::Result<bool> {
    files_identical(original, output)
}
