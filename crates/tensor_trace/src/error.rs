use std::path::PathBuf;

use thiserror::Error;

/// Setup and teardown failures of a trace session.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("trace session already initialised")]
    AlreadyInitialised,
    #[error("trace capacity must be greater than zero")]
    ZeroCapacity,
    #[error("trace capacity of {0} bytes does not fit in the address space")]
    CapacityTooLarge(u64),
    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to map {path}: {source}")]
    MemoryMapping {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("a model layout is already installed in this session")]
    LayoutAlreadyInstalled,
    #[error("failed to serialise trace summary: {0}")]
    Summary(#[from] serde_json::Error),
}

impl TraceError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { action, path: path.into(), source }
    }
}

/// Rejected batch flush. The batch is dropped, never partially written.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlushError {
    #[error("log region full: batch needs {needed} bytes but only {remaining} remain")]
    WouldOverflow { needed: usize, remaining: usize },
    #[error("batch length {0} is not a whole number of records")]
    Misaligned(usize),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tensor registry full ({capacity} entries); '{name}' was not registered")]
    Full { capacity: usize, name: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OffsetIndexError {
    #[error("disk offset index full ({capacity} entries); '{name}' was not registered")]
    Full { capacity: usize, name: String },
}

/// Failure decoding a serialized access record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("record needs {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("unknown phase tag {0}")]
    InvalidPhase(u8),
    #[error("unknown memory source tag {0}")]
    InvalidMemorySource(u8),
    #[error("source count {0} exceeds the record's slot count")]
    TooManySources(u8),
    #[error("tensor name is not valid UTF-8")]
    InvalidName,
}
