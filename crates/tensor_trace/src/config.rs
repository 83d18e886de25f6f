//! Trace session configuration sourced from the process environment.

use std::path::PathBuf;

use tensor_trace_env::{
    BATCH_RECORDS, CAPACITY, ENABLE, EnvVarError, JOURNAL_PATH, OFFSET_CAPACITY, REGISTRY_CAPACITY, TRACE_PATH, TypedEnvVar,
    WRITE_SUMMARY,
};

use crate::{batch::DEFAULT_BATCH_RECORDS, offsets::DEFAULT_OFFSET_CAPACITY, registry::DEFAULT_REGISTRY_CAPACITY};

pub const DEFAULT_CAPACITY_BYTES: u64 = 2 * 1024 * 1024 * 1024;
pub const DEFAULT_TRACE_FILE: &str = "tensor_trace.bin";

#[derive(Debug, thiserror::Error)]
pub enum TraceConfigError {
    /// A variable was set but its value did not parse.
    #[error("invalid value '{value}' for {name}: {reason}")]
    Invalid { name: &'static str, value: String, reason: String },
    #[error("failed to access tracing environment: {source}")]
    EnvVar {
        #[from]
        source: EnvVarError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceConfig {
    /// Master switch; a disabled session never creates files and every call is a no-op.
    pub enabled: bool,
    pub log_path: PathBuf,
    pub capacity_bytes: u64,
    /// Records each thread stages before flushing to the log.
    pub batch_records: usize,
    /// Buffer lifecycle journal destination; no journal when unset.
    pub journal_path: Option<PathBuf>,
    /// Entries a [`crate::layout::LayoutBuilder`] made by `from_config` accepts.
    pub registry_capacity: usize,
    pub offset_capacity: usize,
    /// Persist `<log_path>.summary.json` at shutdown.
    pub write_summary: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_path: std::env::temp_dir().join(DEFAULT_TRACE_FILE),
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
            batch_records: DEFAULT_BATCH_RECORDS,
            journal_path: None,
            registry_capacity: DEFAULT_REGISTRY_CAPACITY,
            offset_capacity: DEFAULT_OFFSET_CAPACITY,
            write_summary: true,
        }
    }
}

impl TraceConfig {
    /// Start from the defaults and apply every `TENSOR_TRACE_*` variable that is set.
    pub fn from_env() -> Result<Self, TraceConfigError> {
        let defaults = Self::default();
        Ok(Self {
            enabled: read_or(&ENABLE, defaults.enabled)?,
            log_path: read_or(&TRACE_PATH, defaults.log_path)?,
            capacity_bytes: read_or(&CAPACITY, defaults.capacity_bytes)?,
            batch_records: read_or(&BATCH_RECORDS, defaults.batch_records)?,
            journal_path: read(&JOURNAL_PATH)?,
            registry_capacity: read_or(&REGISTRY_CAPACITY, defaults.registry_capacity)?,
            offset_capacity: read_or(&OFFSET_CAPACITY, defaults.offset_capacity)?,
            write_summary: read_or(&WRITE_SUMMARY, defaults.write_summary)?,
        })
    }

    /// Configuration for a session that records nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }

    #[must_use]
    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity_bytes: u64) -> Self {
        self.capacity_bytes = capacity_bytes;
        self
    }

    #[must_use]
    pub fn with_batch_records(mut self, batch_records: usize) -> Self {
        self.batch_records = batch_records;
        self
    }

    #[must_use]
    pub fn with_journal_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.journal_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_write_summary(mut self, write_summary: bool) -> Self {
        self.write_summary = write_summary;
        self
    }
}

fn read<T>(var: &TypedEnvVar<T>) -> Result<Option<T>, TraceConfigError> {
    match var.get() {
        Ok(value) => Ok(value),
        Err(EnvVarError::Parse { value, source, .. }) => {
            Err(TraceConfigError::Invalid { name: var.key(), value, reason: source.to_string() })
        }
        Err(err) => Err(err.into()),
    }
}

fn read_or<T>(var: &TypedEnvVar<T>, default: T) -> Result<T, TraceConfigError> {
    Ok(read(var)?.unwrap_or(default))
}
