use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;

/// Command-line interface of the tensor-trace tool
#[derive(Debug, Parser)]
#[command(name = "tensor-trace")]
#[command(about = "Inspect tensor access traces and the model files they refer to", long_about = None)]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v debug, -vv trace); overrides TENSOR_TRACE_LOG_LEVEL
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Write the tensor layout of a GGUF model as CSV
    GgufDump {
        /// Path to the GGUF model file
        #[arg(value_name = "MODEL")]
        model: PathBuf,

        /// Destination file (defaults to stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Decode a binary access trace into CSV rows
    Decode {
        /// Path to the binary trace file
        #[arg(value_name = "TRACE")]
        trace: PathBuf,

        /// Stop after this many records
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Destination file (defaults to stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

impl CliConfig {
    /// Filter directive for the log subscriber. `-v` flags win over the environment level.
    pub fn log_directive(&self, env_level: Option<Level>) -> String {
        let level = match self.verbose {
            0 => env_level.unwrap_or(Level::INFO),
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        level.as_str().to_ascii_lowercase()
    }
}

#[path = "config.test.rs"]
mod tests;
