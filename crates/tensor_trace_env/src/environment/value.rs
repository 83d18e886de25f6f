//! Typed environment variable descriptors.
//!
//! A [`TypedEnvVar`] pairs an [`EnvVar`] key with parse and format callbacks so
//! configuration code reads `Option<T>` instead of raw strings, and tests can
//! scope typed values with [`TypedEnvVar::set_guard`].
//!
//! ```
//! use tensor_trace_env::BATCH_RECORDS;
//!
//! let guard = BATCH_RECORDS.set_guard(256).expect("format batch size");
//! assert_eq!(*guard, 256);
//! assert_eq!(BATCH_RECORDS.get().expect("parse batch size"), Some(256));
//! ```

use std::{marker::PhantomData, ops::Deref};

use super::{EnvVar, Environment, guard::EnvVarGuard};

/// Failure while reading or writing a typed environment variable.
#[derive(Debug, thiserror::Error)]
pub enum EnvVarError {
    /// The raw value could not be parsed into the descriptor's type.
    #[error("failed to parse environment variable {name} from '{value}': {source}")]
    Parse {
        name: &'static str,
        value: String,
        source: EnvVarParseError,
    },
    /// The typed value could not be rendered for storage.
    #[error("failed to format environment variable {name}: {source}")]
    Format { name: &'static str, source: EnvVarFormatError },
}

/// Error returned by a descriptor's parse callback.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct EnvVarParseError {
    message: String,
}

impl EnvVarParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Error returned by a descriptor's format callback.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct EnvVarFormatError {
    message: String,
}

impl EnvVarFormatError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

pub type ParseFn<T> = fn(&str) -> Result<T, EnvVarParseError>;
pub type FormatFn<T> = fn(&T) -> Result<String, EnvVarFormatError>;

/// Descriptor for a strongly-typed environment variable.
#[derive(Clone, Copy)]
pub struct TypedEnvVar<T> {
    var: EnvVar,
    parse: ParseFn<T>,
    format: FormatFn<T>,
    _marker: PhantomData<T>,
}

impl<T> TypedEnvVar<T> {
    pub const fn new(var: EnvVar, parse: ParseFn<T>, format: FormatFn<T>) -> Self {
        Self { var, parse, format, _marker: PhantomData }
    }

    #[must_use]
    pub const fn key(&self) -> &'static str {
        self.var.key()
    }

    #[must_use]
    pub const fn var(&self) -> EnvVar {
        self.var
    }

    /// Read and parse the variable. `Ok(None)` when unset.
    pub fn get(&self) -> Result<Option<T>, EnvVarError> {
        let Some(raw) = Environment::get(self.var) else {
            return Ok(None);
        };
        (self.parse)(raw.trim()).map(Some).map_err(|source| EnvVarError::Parse { name: self.key(), value: raw, source })
    }

    /// Read the variable, falling back to `default` when it is unset.
    pub fn get_or(&self, default: T) -> Result<T, EnvVarError> {
        Ok(self.get()?.unwrap_or(default))
    }

    pub fn set(&self, value: T) -> Result<(), EnvVarError> {
        let formatted = self.render(&value)?;
        Environment::set(self.var, &formatted);
        Ok(())
    }

    pub fn unset(&self) {
        Environment::remove(self.var);
    }

    /// Set the variable until the returned guard is dropped, then restore the previous state.
    pub fn set_guard(&self, value: T) -> Result<TypedEnvVarGuard<T>, EnvVarError> {
        let formatted = self.render(&value)?;
        let restore = EnvVarGuard::set(self.var, &formatted);
        Ok(TypedEnvVarGuard { _restore: restore, value })
    }

    /// Remove the variable until the returned guard is dropped.
    #[must_use]
    pub fn unset_guard(&self) -> EnvVarGuard {
        EnvVarGuard::unset(self.var)
    }

    fn render(&self, value: &T) -> Result<String, EnvVarError> {
        (self.format)(value).map_err(|source| EnvVarError::Format { name: self.key(), source })
    }
}

/// Scoped typed value; dereferences to the value that was set.
pub struct TypedEnvVarGuard<T> {
    _restore: EnvVarGuard,
    value: T,
}

impl<T> TypedEnvVarGuard<T> {
    pub fn value(&self) -> &T {
        &self.value
    }
}

impl<T> Deref for TypedEnvVarGuard<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}
