//! Process environment helpers for tensor tracing.

pub mod environment;

pub use environment::{
    EnvVar, Environment,
    guard::EnvVarGuard,
    trace::{
        BATCH_RECORDS, CAPACITY, ENABLE, JOURNAL_PATH, LOG_LEVEL, OFFSET_CAPACITY, REGISTRY_CAPACITY, TRACE_PATH, TraceEnvVar,
        WRITE_SUMMARY, parse_byte_size,
    },
    value::{EnvVarError, EnvVarFormatError, EnvVarParseError, TypedEnvVar, TypedEnvVarGuard},
};
