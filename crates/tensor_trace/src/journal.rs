//! Buffer lifecycle journal: one JSON object per line, flushed after every event.

use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{Deserialize, Serialize};

use crate::error::TraceError;

/// Declared purpose of a backing buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferUsage {
    /// Model weights mapped from the model file.
    Weights,
    KvCache,
    Compute,
    #[default]
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferAlloc {
    pub id: u64,
    pub address: u64,
    pub size_bytes: u64,
    pub name: String,
    pub backend: String,
    pub usage: BufferUsage,
    /// Omitted when the buffer is not tied to a layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JournalEvent {
    Alloc {
        timestamp_ns: u64,
        #[serde(flatten)]
        buffer: BufferAlloc,
    },
    Dealloc {
        timestamp_ns: u64,
        id: u64,
    },
}

pub struct BufferJournal {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl BufferJournal {
    /// Open `path` for appending, creating it when missing.
    pub fn open(path: &Path) -> Result<Self, TraceError> {
        let file = OpenOptions::new().create(true).append(true).open(path).map_err(|e| TraceError::io("open", path, e))?;
        Ok(Self { path: path.to_path_buf(), writer: Mutex::new(BufWriter::new(file)) })
    }

    pub fn log_alloc(&self, timestamp_ns: u64, buffer: BufferAlloc) {
        self.write(&JournalEvent::Alloc { timestamp_ns, buffer });
    }

    pub fn log_dealloc(&self, timestamp_ns: u64, id: u64) {
        self.write(&JournalEvent::Dealloc { timestamp_ns, id });
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, event: &JournalEvent) {
        let serialised = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(error) => {
                tracing::error!(target: "tensor_trace", ?error, "failed to serialise buffer event");
                return;
            }
        };
        let Ok(mut writer) = self.writer.lock() else {
            tracing::error!(target: "tensor_trace", "buffer journal lock poisoned");
            return;
        };
        if let Err(error) = writeln!(writer, "{serialised}").and_then(|()| writer.flush()) {
            tracing::error!(target: "tensor_trace", ?error, path = %self.path.display(), "failed to write buffer event");
        }
    }
}

impl std::fmt::Debug for BufferJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferJournal").field("path", &self.path).finish_non_exhaustive()
    }
}

