//! Command-line argument parsing for the tensor-trace tool.

pub mod config;
pub mod error;

pub use config::{CliConfig, Command};
pub use error::CliError;
