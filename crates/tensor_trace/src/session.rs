//! Trace session handle and per-thread recorders.
//!
//! A [`TraceSession`] owns everything a trace needs: the log writer, the buffer
//! journal, the installed model layout and the current execution context. Worker
//! threads borrow it through a [`ThreadRecorder`] each; because [`TraceSession::shutdown`]
//! takes `&mut self`, every recorder has flushed its residual batch before the log closes.
//!
//! ```no_run
//! use tensor_trace::prelude::*;
//!
//! let mut session = TraceSession::new(TraceConfig::default());
//! session.init(std::path::Path::new("/tmp/trace.bin"), 64 * 1024 * 1024)?;
//! std::thread::scope(|scope| {
//!     scope.spawn(|| {
//!         let mut recorder = session.recorder();
//!         recorder.append(&AccessRecord::EMPTY);
//!     });
//! });
//! let summary = session.shutdown();
//! # Ok::<(), TraceError>(())
//! ```

use std::{
    path::Path,
    sync::{
        OnceLock,
        atomic::{AtomicU8, AtomicU32, Ordering},
    },
};

use crate::{
    batch::BatchBuffer,
    clock::{TraceClock, thread_id},
    config::{TraceConfig, TraceConfigError},
    error::TraceError,
    journal::{BufferAlloc, BufferJournal, BufferUsage},
    layer::known_layer,
    layout::{LayoutBuilder, ModelLayout},
    logger::{RecordContext, TracedTensor, assemble_record},
    record::{AccessRecord, Phase},
    summary::TraceSummary,
    writer::LogWriter,
};

#[derive(Debug)]
pub struct TraceSession {
    config: TraceConfig,
    clock: TraceClock,
    writer: Option<LogWriter>,
    journal: Option<BufferJournal>,
    layout: OnceLock<ModelLayout>,
    phase: AtomicU8,
    token: AtomicU32,
}

impl TraceSession {
    /// An uninitialised session; nothing is recorded until [`Self::init`] succeeds.
    #[must_use]
    pub fn new(config: TraceConfig) -> Self {
        Self {
            config,
            clock: TraceClock::start(),
            writer: None,
            journal: None,
            layout: OnceLock::new(),
            phase: AtomicU8::new(Phase::Prompt as u8),
            token: AtomicU32::new(0),
        }
    }

    pub fn from_env() -> Result<Self, TraceConfigError> {
        Ok(Self::new(TraceConfig::from_env()?))
    }

    #[must_use]
    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// Create the trace file at `path`, sized to `capacity_bytes`, and start the clock.
    ///
    /// Failures are logged and returned; the session then stays uninitialised and every
    /// recording call remains a no-op. A disabled session accepts the call and records nothing.
    pub fn init(&mut self, path: &Path, capacity_bytes: u64) -> Result<(), TraceError> {
        if !self.config.enabled {
            tracing::debug!(target: "tensor_trace", "tracing disabled; init ignored");
            return Ok(());
        }
        if self.writer.is_some() {
            tracing::error!(target: "tensor_trace", path = %path.display(), "trace session already initialised");
            return Err(TraceError::AlreadyInitialised);
        }

        let writer = LogWriter::create(path, capacity_bytes).inspect_err(|error| {
            tracing::error!(target: "tensor_trace", %error, "failed to initialise trace log; tracing stays disabled");
        })?;
        self.clock = TraceClock::start();
        self.writer = Some(writer);

        if self.journal.is_none()
            && let Some(journal_path) = self.config.journal_path.clone()
        {
            // Journal failures never fail the trace itself.
            let _ = self.open_journal(&journal_path);
        }
        Ok(())
    }

    /// [`Self::init`] with the configured path and capacity.
    pub fn init_from_config(&mut self) -> Result<(), TraceError> {
        let path = self.config.log_path.clone();
        self.init(&path, self.config.capacity_bytes)
    }

    /// Open the buffer lifecycle journal at `path`, replacing any open journal.
    pub fn open_journal(&mut self, path: &Path) -> Result<(), TraceError> {
        if !self.config.enabled {
            return Ok(());
        }
        let journal = BufferJournal::open(path).inspect_err(|error| {
            tracing::error!(target: "tensor_trace", %error, "failed to open buffer journal; buffer events will be skipped");
        })?;
        tracing::info!(target: "tensor_trace", path = %path.display(), "buffer journal opened");
        self.journal = Some(journal);
        Ok(())
    }

    /// Empty layout builder sized from this session's configuration.
    #[must_use]
    pub fn layout_builder(&self) -> LayoutBuilder {
        LayoutBuilder::from_config(&self.config)
    }

    /// Publish the load-time layout. It can be installed once per session and is read without locking afterwards.
    pub fn install_layout(&self, layout: ModelLayout) -> Result<(), TraceError> {
        self.layout.set(layout).map_err(|_| {
            tracing::error!(target: "tensor_trace", "model layout already installed; ignoring the new one");
            TraceError::LayoutAlreadyInstalled
        })
    }

    #[must_use]
    pub fn layout(&self) -> Option<&ModelLayout> {
        self.layout.get()
    }

    pub fn set_phase(&self, phase: Phase) {
        self.phase.store(phase as u8, Ordering::Relaxed);
    }

    pub fn set_token(&self, token_id: u32) {
        self.token.store(token_id, Ordering::Relaxed);
    }

    /// Mark the start of a token: later records carry `token_id` and `phase`.
    pub fn begin_token(&self, token_id: u32, phase: Phase) {
        self.set_token(token_id);
        self.set_phase(phase);
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        Phase::try_from(self.phase.load(Ordering::Relaxed)).unwrap_or_default()
    }

    #[must_use]
    pub fn token(&self) -> u32 {
        self.token.load(Ordering::Relaxed)
    }

    /// Stamp for a record produced now on the calling thread.
    #[must_use]
    pub fn record_context(&self) -> RecordContext {
        RecordContext { timestamp_ns: self.clock.now_ns(), token_id: self.token(), phase: self.phase(), thread_id: thread_id() }
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.config.enabled && self.writer.is_some()
    }

    /// Bytes written to the log so far, `None` while uninitialised.
    #[must_use]
    pub fn write_offset(&self) -> Option<usize> {
        self.writer.as_ref().map(LogWriter::write_offset)
    }

    /// Record a buffer allocation in the journal. No-op without an open journal.
    #[allow(clippy::too_many_arguments)]
    pub fn log_buffer_alloc(&self, id: u64, address: u64, size_bytes: u64, name: &str, backend: &str, usage: BufferUsage, layer_id: u16) {
        let Some(journal) = self.active_journal() else {
            return;
        };
        journal.log_alloc(
            self.clock.now_ns(),
            BufferAlloc {
                id,
                address,
                size_bytes,
                name: name.to_owned(),
                backend: backend.to_owned(),
                usage,
                layer_id: known_layer(layer_id),
            },
        );
    }

    pub fn log_buffer_dealloc(&self, id: u64) {
        if let Some(journal) = self.active_journal() {
            journal.log_dealloc(self.clock.now_ns(), id);
        }
    }

    /// Per-thread recording handle. Each worker thread should own exactly one.
    #[must_use]
    pub fn recorder(&self) -> ThreadRecorder<'_> {
        let batch_records = if self.is_recording() { self.config.batch_records } else { 1 };
        ThreadRecorder { session: self, batch: BatchBuffer::new(batch_records) }
    }

    /// Sync and close the trace log and the journal. Returns `None` when nothing was open.
    ///
    /// The installed layout survives, so the session can be initialised again for a new trace.
    pub fn shutdown(&mut self) -> Option<TraceSummary> {
        self.journal = None;
        let writer = self.writer.take()?;
        let summary = writer.shutdown(None);

        if self.config.write_summary {
            match summary.write_sidecar() {
                Ok(path) => tracing::debug!(target: "tensor_trace", path = %path.display(), "trace summary written"),
                Err(error) => tracing::error!(target: "tensor_trace", %error, "failed to write trace summary"),
            }
        }
        Some(summary)
    }

    fn active_journal(&self) -> Option<&BufferJournal> {
        if self.config.enabled { self.journal.as_ref() } else { None }
    }
}

impl Drop for TraceSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Thread-owned batch of records in front of the shared log.
///
/// Dropping the recorder flushes whatever is still staged.
#[derive(Debug)]
pub struct ThreadRecorder<'s> {
    session: &'s TraceSession,
    batch: BatchBuffer,
}

impl ThreadRecorder<'_> {
    /// Stage `record`, flushing the batch as soon as it is full.
    ///
    /// A flush that does not fit in the log drops the whole batch; the batch is reset either way.
    pub fn append(&mut self, record: &AccessRecord) {
        let Some(writer) = self.session.writer.as_ref() else {
            return;
        };
        if self.batch.push(record) {
            // Overflow is counted and logged by the writer.
            let _ = writer.flush(&self.batch);
            self.batch.clear();
        }
    }

    /// Record one compute operation. Only the worker with `thread_index == 0` records,
    /// so an operation split across workers yields one record.
    pub fn log_operation<T: TracedTensor + ?Sized>(&mut self, dst: &T, thread_index: usize) {
        if thread_index != 0 || !self.session.is_recording() {
            return;
        }
        let record = assemble_record(dst, self.session.layout(), &self.session.record_context());
        self.append(&record);
    }

    /// Records staged but not yet flushed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    /// Flush staged records now. Equivalent to dropping the recorder.
    pub fn finish(mut self) {
        self.flush_residual();
    }

    fn flush_residual(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        if let Some(writer) = self.session.writer.as_ref() {
            let _ = writer.flush(&self.batch);
        }
        self.batch.clear();
    }
}

impl Drop for ThreadRecorder<'_> {
    fn drop(&mut self) {
        self.flush_residual();
    }
}
