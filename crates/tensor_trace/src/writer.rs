//! Append engine over a pre-sized, writable memory-mapped trace file.
//!
//! Flushes reserve their byte range with a single compare-and-swap on the shared
//! cursor, bounded by capacity, then copy into the reserved range. Reserved ranges
//! never overlap, so concurrent copies need no further locking.

use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
};

use chrono::{DateTime, Utc};
use memmap2::{MmapOptions, MmapRaw};

use crate::{
    batch::BatchBuffer,
    error::{FlushError, TraceError},
    record::{RECORD_LAYOUT_VERSION, RECORD_SIZE},
    summary::TraceSummary,
};

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

pub struct LogWriter {
    path: PathBuf,
    map: MmapRaw,
    _file: File,
    capacity: usize,
    cursor: AtomicUsize,
    records_written: AtomicU64,
    dropped_records: AtomicU64,
    dropped_batches: AtomicU64,
    started_at: DateTime<Utc>,
}

impl LogWriter {
    /// Create or truncate `path`, size it to exactly `capacity_bytes` and map it writable.
    ///
    /// A summary sidecar left by an earlier trace at `path` is removed first, so it can never
    /// describe the new contents.
    pub fn create(path: &Path, capacity_bytes: u64) -> Result<Self, TraceError> {
        if capacity_bytes == 0 {
            return Err(TraceError::ZeroCapacity);
        }
        let capacity = usize::try_from(capacity_bytes).map_err(|_| TraceError::CapacityTooLarge(capacity_bytes))?;

        TraceSummary::remove_sidecar(path)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| TraceError::io("create", path, e))?;
        file.set_len(capacity_bytes).map_err(|e| TraceError::io("resize", path, e))?;

        let map = MmapOptions::new()
            .len(capacity)
            .map_raw(&file)
            .map_err(|source| TraceError::MemoryMapping { path: path.to_path_buf(), source })?;

        tracing::info!(
            target: "tensor_trace",
            path = %path.display(),
            capacity_gb = capacity_bytes as f64 / BYTES_PER_GIB,
            record_size = RECORD_SIZE,
            "trace log initialised"
        );

        Ok(Self {
            path: path.to_path_buf(),
            map,
            _file: file,
            capacity,
            cursor: AtomicUsize::new(0),
            records_written: AtomicU64::new(0),
            dropped_records: AtomicU64::new(0),
            dropped_batches: AtomicU64::new(0),
            started_at: Utc::now(),
        })
    }

    /// Copy every record in `batch` to the log, or none of them.
    ///
    /// Returns the byte offset the batch was written at. An empty batch is a no-op at the current offset.
    pub fn flush(&self, batch: &BatchBuffer) -> Result<usize, FlushError> {
        self.write_records(batch.as_bytes())
    }

    /// Append pre-encoded records. `bytes` must hold a whole number of records.
    pub fn write_records(&self, bytes: &[u8]) -> Result<usize, FlushError> {
        let needed = bytes.len();
        if needed % RECORD_SIZE != 0 {
            return Err(FlushError::Misaligned(needed));
        }
        if needed == 0 {
            return Ok(self.write_offset());
        }
        let records = (needed / RECORD_SIZE) as u64;

        let reserved = self.cursor.fetch_update(Ordering::AcqRel, Ordering::Acquire, |cursor| {
            cursor.checked_add(needed).filter(|end| *end <= self.capacity)
        });

        let start = match reserved {
            Ok(start) => start,
            Err(cursor) => {
                let remaining = self.capacity - cursor;
                self.dropped_records.fetch_add(records, Ordering::Relaxed);
                if self.dropped_batches.fetch_add(1, Ordering::Relaxed) == 0 {
                    tracing::warn!(
                        target: "tensor_trace",
                        needed,
                        remaining,
                        "trace log full; dropping batch and every later batch that does not fit"
                    );
                } else {
                    tracing::trace!(target: "tensor_trace", needed, remaining, "dropped batch");
                }
                return Err(FlushError::WouldOverflow { needed, remaining });
            }
        };

        // SAFETY: `start..start + needed` lies within the mapping (checked against capacity,
        // which equals the mapped length) and was reserved exclusively for this call by the
        // compare-and-swap above, so no other thread reads or writes it concurrently.
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), self.map.as_mut_ptr().add(start), needed);
        }
        self.records_written.fetch_add(records, Ordering::Relaxed);
        tracing::trace!(target: "tensor_trace", offset = start, records, "flushed batch");
        Ok(start)
    }

    /// Bytes reserved so far. Every reserved byte is written once its flush returns.
    #[must_use]
    pub fn write_offset(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn records_written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn dropped_records(&self) -> u64 {
        self.dropped_records.load(Ordering::Relaxed)
    }

    /// Flush `residual`, sync the mapping to disk, unmap and close the file.
    ///
    /// A failed sync is logged; the returned summary still reflects what was written.
    pub fn shutdown(self, residual: Option<&BatchBuffer>) -> TraceSummary {
        if let Some(batch) = residual {
            // Overflow is already counted and logged by the flush itself.
            let _ = self.flush(batch);
        }

        if let Err(error) = self.map.flush() {
            tracing::error!(target: "tensor_trace", ?error, path = %self.path.display(), "failed to sync trace log");
        }

        let summary = TraceSummary {
            trace_path: self.path.clone(),
            started_at: self.started_at,
            finished_at: Utc::now(),
            records_written: self.records_written(),
            bytes_written: self.write_offset() as u64,
            dropped_records: self.dropped_records(),
            dropped_batches: self.dropped_batches.load(Ordering::Relaxed),
            capacity_bytes: self.capacity as u64,
            record_size: RECORD_SIZE,
            layout_version: RECORD_LAYOUT_VERSION,
        };

        tracing::info!(
            target: "tensor_trace",
            path = %summary.trace_path.display(),
            records = summary.records_written,
            megabytes = summary.megabytes_written(),
            dropped_records = summary.dropped_records,
            dropped_batches = summary.dropped_batches,
            "trace log closed"
        );
        summary
    }
}

impl std::fmt::Debug for LogWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogWriter")
            .field("path", &self.path)
            .field("capacity", &self.capacity)
            .field("write_offset", &self.write_offset())
            .field("records_written", &self.records_written())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;
    use crate::record::AccessRecord;

    fn temp_log(stem: &str) -> PathBuf {
        let unique = SystemTime::now().duration_since(UNIX_EPOCH).expect("time went backwards").as_nanos();
        std::env::temp_dir().join(format!("tensor_trace_writer_{stem}_{unique}.bin"))
    }

    fn encoded(count: usize) -> Vec<u8> {
        let mut record = AccessRecord::EMPTY;
        (0..count)
            .flat_map(|token| {
                record.token_id = token as u32;
                record.encode()
            })
            .collect()
    }

    #[test]
    fn partial_records_are_rejected() {
        let path = temp_log("misaligned");
        let writer = LogWriter::create(&path, 4 * RECORD_SIZE as u64).expect("create");

        assert_eq!(writer.write_records(&[0u8; RECORD_SIZE + 1]), Err(FlushError::Misaligned(RECORD_SIZE + 1)));
        assert_eq!(writer.write_offset(), 0);
        assert_eq!(writer.dropped_records(), 0);

        drop(writer);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn overflow_reports_remaining_space_and_keeps_the_cursor() {
        let path = temp_log("overflow");
        let writer = LogWriter::create(&path, 3 * RECORD_SIZE as u64).expect("create");

        assert_eq!(writer.write_records(&encoded(2)), Ok(0));
        assert_eq!(
            writer.write_records(&encoded(2)),
            Err(FlushError::WouldOverflow { needed: 2 * RECORD_SIZE, remaining: RECORD_SIZE })
        );
        assert_eq!(writer.write_offset(), 2 * RECORD_SIZE);
        assert_eq!(writer.dropped_records(), 2);

        assert_eq!(writer.write_records(&encoded(1)), Ok(2 * RECORD_SIZE));
        assert_eq!(writer.write_records(&[]), Ok(3 * RECORD_SIZE));

        let summary = writer.shutdown(None);
        assert_eq!(summary.records_written, 3);
        assert_eq!(summary.dropped_batches, 1);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn create_removes_a_stale_summary() {
        let path = temp_log("stale_summary");
        let sidecar = TraceSummary::sidecar_path(&path);
        std::fs::write(&sidecar, b"{}").expect("sidecar writable");

        let writer = LogWriter::create(&path, RECORD_SIZE as u64).expect("create");
        assert!(!sidecar.exists());

        drop(writer);
        let _ = std::fs::remove_file(&path);
    }
}
