//! Convenience re-exports for runtimes embedding the tracer.

pub use crate::batch::BatchBuffer;
pub use crate::clock::{TraceClock, thread_id};
pub use crate::config::{TraceConfig, TraceConfigError};
pub use crate::error::{FlushError, OffsetIndexError, RecordError, RegistryError, TraceError};
pub use crate::journal::{BufferAlloc, BufferJournal, BufferUsage, JournalEvent};
pub use crate::layer::{LAYER_NONE, known_layer, layer_id_from_name};
pub use crate::layout::{LayoutBuilder, ModelLayout};
pub use crate::logger::{BufferInfo, RecordContext, TracedTensor, assemble_record};
pub use crate::reader::TraceReader;
pub use crate::record::{
    AccessRecord, FixedName, MAX_SOURCES, MemorySource, Phase, RECORD_LAYOUT_VERSION, RECORD_SIZE, REGISTRY_INDEX_NONE, SourceSlot,
};
pub use crate::registry::{RegistryEntry, TensorRegistry};
pub use crate::session::{ThreadRecorder, TraceSession};
pub use crate::summary::TraceSummary;
pub use crate::writer::LogWriter;

pub use tensor_trace_env::{EnvVarError, EnvVarGuard, Environment, TraceEnvVar};
