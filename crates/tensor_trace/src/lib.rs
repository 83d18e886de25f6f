//! Low-overhead recording of tensor accesses during model inference.
//!
//! Each compute operation becomes one fixed-width [`record::AccessRecord`], staged in a
//! per-thread [`batch::BatchBuffer`] and flushed into a pre-sized memory-mapped log by
//! [`writer::LogWriter`]. Buffer allocations go to a separate JSON-lines journal.

pub mod batch;
pub mod clock;
pub mod config;
pub mod error;
pub mod journal;
pub mod layer;
pub mod layout;
pub mod logger;
pub mod offsets;
pub mod prelude;
pub mod reader;
pub mod record;
pub mod registry;
pub mod session;
pub mod summary;
pub mod writer;

pub use config::{TraceConfig, TraceConfigError};
pub use error::{FlushError, OffsetIndexError, RecordError, RegistryError, TraceError};
pub use layout::{LayoutBuilder, ModelLayout};
pub use record::{AccessRecord, Phase, RECORD_SIZE};
pub use session::{ThreadRecorder, TraceSession};

#[cfg(test)]
mod tests;
