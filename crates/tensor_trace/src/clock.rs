//! Trace-relative timestamps and small per-thread identifiers.

use std::{
    sync::atomic::{AtomicU16, Ordering},
    time::Instant,
};

/// Monotonic clock anchored at the start of a trace.
#[derive(Debug, Clone, Copy)]
pub struct TraceClock {
    origin: Instant,
}

impl TraceClock {
    /// Start a clock whose zero is "now".
    #[must_use]
    pub fn start() -> Self {
        Self { origin: Instant::now() }
    }

    /// Nanoseconds elapsed since the clock was started. Saturates after ~584 years.
    #[inline]
    #[must_use]
    pub fn now_ns(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

impl Default for TraceClock {
    fn default() -> Self {
        Self::start()
    }
}

static NEXT_THREAD_ID: AtomicU16 = AtomicU16::new(0);

thread_local! {
    static THREAD_ID: u16 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
}

/// Stable small identifier of the calling thread, assigned on first use.
///
/// Identifiers are process-wide and wrap after 65536 distinct threads.
#[inline]
#[must_use]
pub fn thread_id() -> u16 {
    THREAD_ID.with(|id| *id)
}
