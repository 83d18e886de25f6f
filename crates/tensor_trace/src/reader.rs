//! Offline access to a finished trace file.

use std::{fs::File, path::Path};

use memmap2::Mmap;

use crate::{
    error::{RecordError, TraceError},
    record::{AccessRecord, RECORD_SIZE},
    summary::TraceSummary,
};

/// Read-only view of a trace file.
///
/// The record count comes from the summary sidecar when one exists and matches the file's
/// path and length. Without it every whole record in the file is considered written,
/// including the zero-filled tail.
pub struct TraceReader {
    map: Mmap,
    records: usize,
    summary: Option<TraceSummary>,
}

impl TraceReader {
    pub fn open(path: &Path) -> Result<Self, TraceError> {
        let file = File::open(path).map_err(|e| TraceError::io("open", path, e))?;
        // SAFETY: the trace is only read; a concurrent writer could change bytes under us,
        // which decoding tolerates by returning `RecordError`.
        let map = unsafe { Mmap::map(&file) }.map_err(|source| TraceError::MemoryMapping { path: path.to_path_buf(), source })?;

        let summary = TraceSummary::load_sidecar(path)?.filter(|summary| {
            let matches = summary.describes(path, map.len() as u64);
            if !matches {
                tracing::warn!(
                    target: "tensor_trace",
                    path = %path.display(),
                    summary_path = %summary.trace_path.display(),
                    summary_capacity = summary.capacity_bytes,
                    file_len = map.len(),
                    "ignoring summary sidecar that does not describe this trace"
                );
            }
            matches
        });
        let whole_records = map.len() / RECORD_SIZE;
        let records = match &summary {
            Some(summary) => usize::try_from(summary.bytes_written).map_or(whole_records, |bytes| (bytes / RECORD_SIZE).min(whole_records)),
            None => whole_records,
        };
        Ok(Self { map, records, summary })
    }

    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records
    }

    #[must_use]
    pub fn summary(&self) -> Option<&TraceSummary> {
        self.summary.as_ref()
    }

    /// `None` past the last record.
    pub fn record(&self, index: usize) -> Option<Result<AccessRecord, RecordError>> {
        if index >= self.records {
            return None;
        }
        let start = index * RECORD_SIZE;
        Some(AccessRecord::decode(&self.map[start..start + RECORD_SIZE]))
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<AccessRecord, RecordError>> + '_ {
        self.map[..self.records * RECORD_SIZE].chunks_exact(RECORD_SIZE).map(AccessRecord::decode)
    }

    /// Records up to the first all-zero slot, for files without a summary.
    pub fn iter_written(&self) -> impl Iterator<Item = Result<AccessRecord, RecordError>> + '_ {
        self.map[..self.records * RECORD_SIZE]
            .chunks_exact(RECORD_SIZE)
            .take_while(|raw| !AccessRecord::is_zeroed(raw))
            .map(AccessRecord::decode)
    }
}

impl std::fmt::Debug for TraceReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceReader").field("len", &self.map.len()).field("records", &self.records).finish_non_exhaustive()
    }
}
