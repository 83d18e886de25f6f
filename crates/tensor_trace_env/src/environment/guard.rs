//! Scoped snapshots of trace environment variables.

use super::{EnvVar, Environment, trace::TraceEnvVar};

/// Saved values of one or more variables, written back in reverse order on drop.
///
/// Nested guards over the same variable unwind correctly because each one restores
/// exactly what it saw when it was taken.
#[must_use = "the previous values are restored as soon as the guard is dropped"]
pub struct EnvVarGuard {
    saved: Vec<(EnvVar, Option<String>)>,
}

impl EnvVarGuard {
    /// Set `var` to a raw string, bypassing any typed formatting.
    pub fn set(var: impl Into<EnvVar>, value: &str) -> Self {
        let var = var.into();
        let mut lock = Environment::lock();
        let saved = vec![(var, Environment::get(var))];
        Environment::set_locked(var, value, &mut lock);
        Self { saved }
    }

    pub fn unset(var: impl Into<EnvVar>) -> Self {
        Self::unset_all([var.into()])
    }

    /// Remove every variable in `vars` under a single hold of the environment lock.
    pub fn unset_all<I>(vars: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<EnvVar>,
    {
        let mut lock = Environment::lock();
        let saved = vars
            .into_iter()
            .map(|var| {
                let var = var.into();
                let previous = Environment::get(var);
                Environment::remove_locked(var, &mut lock);
                (var, previous)
            })
            .collect();
        Self { saved }
    }

    /// Clear the whole `TENSOR_TRACE_*` namespace, leaving the engine on its defaults.
    pub fn clear_trace() -> Self {
        Self::unset_all(TraceEnvVar::ALL)
    }

    /// Variables covered by this guard, in the order they were captured.
    pub fn vars(&self) -> impl Iterator<Item = EnvVar> + '_ {
        self.saved.iter().map(|(var, _)| *var)
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        let mut lock = Environment::lock();
        for (var, previous) in self.saved.drain(..).rev() {
            match previous {
                Some(previous) => Environment::set_locked(var, &previous, &mut lock),
                None => Environment::remove_locked(var, &mut lock),
            }
        }
    }
}
