mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{CliConfig, CliError, Command};

fn main() -> anyhow::Result<()> {
    let cli_config = CliConfig::parse();
    init_tracing(&cli_config)?;

    match &cli_config.command {
        Command::GgufDump { model, output } => commands::gguf_dump::run(model, output.as_deref())?,
        Command::Decode { trace, count, output } => commands::decode::run(trace, *count, output.as_deref())?,
    }
    Ok(())
}

fn init_tracing(cli_config: &CliConfig) -> Result<(), CliError> {
    let env_level = tensor_trace_env::LOG_LEVEL.get().map_err(|e| CliError::config_error(e.to_string()))?;
    let directive = cli_config.log_directive(env_level);
    let filter = EnvFilter::try_new(&directive).map_err(|e| CliError::config_error(format!("invalid log filter '{directive}': {e}")))?;
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    Ok(())
}
