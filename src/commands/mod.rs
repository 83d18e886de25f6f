pub mod decode;
pub mod gguf_dump;

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use crate::cli::CliError;

/// Buffered CSV destination: the named file, or stdout.
pub(crate) fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>, CliError> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|e| CliError::output_error(path.display().to_string(), e))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

pub(crate) fn output_label(path: Option<&Path>) -> String {
    path.map_or_else(|| "<stdout>".to_string(), |p| p.display().to_string())
}
