//! Shutdown report of a trace session, optionally persisted beside the trace.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TraceError;

const SUMMARY_SUFFIX: &str = ".summary.json";

/// Totals reported when a log writer shuts down.
///
/// `bytes_written` is the true length of the trace; the file itself stays at `capacity_bytes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSummary {
    pub trace_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub records_written: u64,
    pub bytes_written: u64,
    pub dropped_records: u64,
    pub dropped_batches: u64,
    pub capacity_bytes: u64,
    pub record_size: usize,
    pub layout_version: u32,
}

impl TraceSummary {
    /// `<trace>.summary.json` next to the trace file.
    #[must_use]
    pub fn sidecar_path(trace_path: &Path) -> PathBuf {
        let mut name = trace_path.as_os_str().to_owned();
        name.push(SUMMARY_SUFFIX);
        PathBuf::from(name)
    }

    pub fn write_sidecar(&self) -> Result<PathBuf, TraceError> {
        let path = Self::sidecar_path(&self.trace_path);
        let file = File::create(&path).map_err(|e| TraceError::io("create", &path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush().map_err(|e| TraceError::io("write", &path, e))?;
        Ok(path)
    }

    /// Load the sidecar for `trace_path`, `Ok(None)` when there is none.
    pub fn load_sidecar(trace_path: &Path) -> Result<Option<Self>, TraceError> {
        let path = Self::sidecar_path(trace_path);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TraceError::io("open", &path, e)),
        };
        Ok(Some(serde_json::from_reader(BufReader::new(file))?))
    }

    /// Delete the sidecar for `trace_path`; a missing sidecar is not an error.
    pub fn remove_sidecar(trace_path: &Path) -> Result<(), TraceError> {
        let path = Self::sidecar_path(trace_path);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TraceError::io("remove", &path, e)),
        }
    }

    /// Whether this summary was written for the trace at `trace_path` of `file_len` bytes.
    #[must_use]
    pub fn describes(&self, trace_path: &Path, file_len: u64) -> bool {
        self.trace_path == trace_path && self.capacity_bytes == file_len && self.bytes_written <= file_len
    }

    #[must_use]
    pub fn megabytes_written(&self) -> f64 {
        self.bytes_written as f64 / (1024.0 * 1024.0)
    }
}
