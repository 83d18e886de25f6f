//! Environment variables understood by the trace recording engine.

use std::path::PathBuf;

use tracing::Level;

use super::EnvVar;
use super::value::{EnvVarFormatError, EnvVarParseError, TypedEnvVar};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TraceEnvVar {
    /// Master switch for access tracing.
    Enable,
    /// Destination of the binary access trace.
    TracePath,
    /// Size the trace file is pre-allocated to.
    Capacity,
    /// Records staged per thread before a flush.
    BatchRecords,
    /// Destination of the buffer lifecycle journal.
    JournalPath,
    RegistryCapacity,
    OffsetCapacity,
    /// Minimum level for diagnostics.
    LogLevel,
    /// Whether shutdown persists a JSON summary next to the trace.
    WriteSummary,
}

impl TraceEnvVar {
    pub const ALL: [TraceEnvVar; 9] = [
        TraceEnvVar::Enable,
        TraceEnvVar::TracePath,
        TraceEnvVar::Capacity,
        TraceEnvVar::BatchRecords,
        TraceEnvVar::JournalPath,
        TraceEnvVar::RegistryCapacity,
        TraceEnvVar::OffsetCapacity,
        TraceEnvVar::LogLevel,
        TraceEnvVar::WriteSummary,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            TraceEnvVar::Enable => "TENSOR_TRACE_ENABLE",
            TraceEnvVar::TracePath => "TENSOR_TRACE_PATH",
            TraceEnvVar::Capacity => "TENSOR_TRACE_CAPACITY",
            TraceEnvVar::BatchRecords => "TENSOR_TRACE_BATCH_RECORDS",
            TraceEnvVar::JournalPath => "TENSOR_TRACE_JOURNAL_PATH",
            TraceEnvVar::RegistryCapacity => "TENSOR_TRACE_REGISTRY_CAPACITY",
            TraceEnvVar::OffsetCapacity => "TENSOR_TRACE_OFFSET_CAPACITY",
            TraceEnvVar::LogLevel => "TENSOR_TRACE_LOG_LEVEL",
            TraceEnvVar::WriteSummary => "TENSOR_TRACE_WRITE_SUMMARY",
        }
    }

    pub const fn into_env(self) -> EnvVar {
        EnvVar::Trace(self)
    }
}

pub const ENABLE: TypedEnvVar<bool> = TypedEnvVar::new(TraceEnvVar::Enable.into_env(), parse_bool, format_display);

pub const TRACE_PATH: TypedEnvVar<PathBuf> = TypedEnvVar::new(TraceEnvVar::TracePath.into_env(), parse_path, format_path);

/// Accepts plain byte counts or binary-suffixed sizes such as `512M` or `2GiB`.
pub const CAPACITY: TypedEnvVar<u64> = TypedEnvVar::new(TraceEnvVar::Capacity.into_env(), parse_byte_size, format_display);

pub const BATCH_RECORDS: TypedEnvVar<usize> = TypedEnvVar::new(TraceEnvVar::BatchRecords.into_env(), parse_positive, format_display);

pub const JOURNAL_PATH: TypedEnvVar<PathBuf> = TypedEnvVar::new(TraceEnvVar::JournalPath.into_env(), parse_path, format_path);

pub const REGISTRY_CAPACITY: TypedEnvVar<usize> =
    TypedEnvVar::new(TraceEnvVar::RegistryCapacity.into_env(), parse_positive, format_display);

pub const OFFSET_CAPACITY: TypedEnvVar<usize> = TypedEnvVar::new(TraceEnvVar::OffsetCapacity.into_env(), parse_positive, format_display);

pub const LOG_LEVEL: TypedEnvVar<Level> = TypedEnvVar::new(TraceEnvVar::LogLevel.into_env(), parse_level, format_display);

pub const WRITE_SUMMARY: TypedEnvVar<bool> = TypedEnvVar::new(TraceEnvVar::WriteSummary.into_env(), parse_bool, format_display);

fn parse_bool(value: &str) -> Result<bool, EnvVarParseError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(EnvVarParseError::new("value is not a recognised boolean")),
    }
}

fn parse_path(value: &str) -> Result<PathBuf, EnvVarParseError> {
    if value.is_empty() {
        return Err(EnvVarParseError::new("path must not be empty"));
    }
    Ok(PathBuf::from(value))
}

fn parse_positive(value: &str) -> Result<usize, EnvVarParseError> {
    match value.parse::<usize>() {
        Ok(0) => Err(EnvVarParseError::new("value must be greater than zero")),
        Ok(parsed) => Ok(parsed),
        Err(err) => Err(EnvVarParseError::new(err.to_string())),
    }
}

fn parse_level(value: &str) -> Result<Level, EnvVarParseError> {
    value.parse::<Level>().map_err(|_| EnvVarParseError::new("invalid tracing level"))
}

/// Parse a byte count with an optional binary suffix (`K`, `M`, `G`, `T`, optionally followed by `B` or `iB`).
pub fn parse_byte_size(value: &str) -> Result<u64, EnvVarParseError> {
    let value = value.trim();
    let split = value.find(|c: char| !c.is_ascii_digit()).unwrap_or(value.len());
    let (digits, suffix) = value.split_at(split);
    if digits.is_empty() {
        return Err(EnvVarParseError::new("size must start with a number"));
    }
    let base: u64 = digits.parse().map_err(|_| EnvVarParseError::new("size does not fit in 64 bits"))?;
    let shift = match suffix.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 0,
        "k" | "kb" | "kib" => 10,
        "m" | "mb" | "mib" => 20,
        "g" | "gb" | "gib" => 30,
        "t" | "tb" | "tib" => 40,
        other => return Err(EnvVarParseError::new(format!("unknown size suffix '{other}'"))),
    };
    let bytes = base.checked_mul(1u64 << shift).ok_or_else(|| EnvVarParseError::new("size does not fit in 64 bits"))?;
    if bytes == 0 {
        return Err(EnvVarParseError::new("size must be greater than zero"));
    }
    Ok(bytes)
}

fn format_display<T: std::fmt::Display>(value: &T) -> Result<String, EnvVarFormatError> {
    Ok(value.to_string())
}

fn format_path(path: &PathBuf) -> Result<String, EnvVarFormatError> {
    path.to_str().map(str::to_owned).ok_or_else(|| EnvVarFormatError::new("path is not valid UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_size_accepts_binary_suffixes() {
        assert_eq!(parse_byte_size("4096").unwrap(), 4096);
        assert_eq!(parse_byte_size("1K").unwrap(), 1024);
        assert_eq!(parse_byte_size("512m").unwrap(), 512 << 20);
        assert_eq!(parse_byte_size("2GiB").unwrap(), 2 << 30);
        assert_eq!(parse_byte_size("3 MB").unwrap(), 3 << 20);
    }

    #[test]
    fn byte_size_rejects_garbage() {
        assert!(parse_byte_size("").is_err());
        assert!(parse_byte_size("G").is_err());
        assert!(parse_byte_size("12 parsecs").is_err());
        assert!(parse_byte_size("0").is_err());
        assert!(parse_byte_size("99999999999T").is_err());
    }

    #[test]
    fn positive_integers_reject_zero() {
        assert_eq!(parse_positive("512").unwrap(), 512);
        assert!(parse_positive("0").is_err());
        assert!(parse_positive("-3").is_err());
    }

    #[test]
    fn booleans_follow_common_spellings() {
        for truthy in ["1", "true", "YES", "On"] {
            assert!(parse_bool(truthy).unwrap());
        }
        assert!(!parse_bool("off").unwrap());
        assert!(parse_bool("maybe").is_err());
    }
}
