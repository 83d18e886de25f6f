use std::{io::Write, path::Path};

use tensor_trace_loader::TensorLayoutTable;

use super::{open_output, output_label};
use crate::cli::CliError;

pub fn run(model: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    if !model.exists() {
        return Err(CliError::file_path_error(model).into());
    }

    let table = TensorLayoutTable::load(model)?;
    let mut out = open_output(output)?;
    table
        .write_csv(&mut out)
        .and_then(|()| out.flush())
        .map_err(|e| CliError::output_error(output_label(output), e))?;

    tracing::info!(
        model = %model.display(),
        output = %output_label(output),
        tensors = table.entries.len(),
        data_start = table.data_start,
        "wrote tensor layout"
    );
    Ok(())
}
