use std::path::PathBuf;

use thiserror::Error;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Input file is missing
    #[error("File path error: {0} does not exist")]
    FilePathError(PathBuf),

    /// Output could not be created or written
    #[error("Failed to write {path}: {source}")]
    OutputError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Log filter or environment configuration was invalid
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl CliError {
    pub fn file_path_error(path: impl Into<PathBuf>) -> Self {
        Self::FilePathError(path.into())
    }

    pub fn output_error(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::OutputError { path: path.into(), source }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
