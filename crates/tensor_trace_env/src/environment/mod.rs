//! Process environment abstractions shared by the tracing crates.

pub mod guard;
pub mod trace;
pub mod value;

use std::sync::{Mutex, MutexGuard, OnceLock};

use trace::TraceEnvVar;

/// Namespaced environment variable identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnvVar {
    /// Variables that configure the trace recording engine.
    Trace(TraceEnvVar),
}

impl From<TraceEnvVar> for EnvVar {
    fn from(value: TraceEnvVar) -> Self {
        Self::Trace(value)
    }
}

impl EnvVar {
    /// Canonical process-environment key.
    pub const fn key(self) -> &'static str {
        match self {
            EnvVar::Trace(inner) => inner.key(),
        }
    }
}

/// Process environment facade that serialises every mutation behind one mutex.
pub struct Environment;

impl Environment {
    /// Acquire the global environment mutex.
    ///
    /// A poisoned mutex is recovered rather than propagated; the guarded value is `()`.
    pub fn lock() -> MutexGuard<'static, ()> {
        static ENV_MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_MUTEX.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read the variable as UTF-8, if present.
    pub fn get(var: impl Into<EnvVar>) -> Option<String> {
        std::env::var(var.into().key()).ok()
    }

    /// Set the variable, taking the environment lock for the duration of the call.
    pub fn set(var: impl Into<EnvVar>, value: &str) {
        let var = var.into();
        let mut guard = Self::lock();
        Self::set_locked(var, value, &mut guard);
    }

    /// Remove the variable, taking the environment lock for the duration of the call.
    pub fn remove(var: impl Into<EnvVar>) {
        let var = var.into();
        let mut guard = Self::lock();
        Self::remove_locked(var, &mut guard);
    }

    pub(crate) fn set_locked(var: EnvVar, value: &str, _guard: &mut MutexGuard<'static, ()>) {
        // SAFETY: the guard proves the caller holds the environment mutex, so no
        // other mutation through this facade can run concurrently.
        unsafe { std::env::set_var(var.key(), value) };
    }

    pub(crate) fn remove_locked(var: EnvVar, _guard: &mut MutexGuard<'static, ()>) {
        // SAFETY: see `set_locked`.
        unsafe { std::env::remove_var(var.key()) };
    }
}
