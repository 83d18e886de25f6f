use std::{
    fmt::Write as _,
    io::{self, Write},
    path::Path,
};

use tensor_trace::{
    error::RecordError,
    layer::known_layer,
    reader::TraceReader,
    record::{AccessRecord, MAX_SOURCES, SourceSlot},
};

use super::{open_output, output_label};
use crate::cli::CliError;

const HEADER_PREFIX: &str = "index,timestamp_ns,token_id,phase,thread_id,op_code,layer_id,dst_name,n_sources";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecodeStats {
    pub rows: usize,
    pub errors: usize,
}

pub fn run(trace: &Path, count: Option<usize>, output: Option<&Path>) -> anyhow::Result<()> {
    if !trace.exists() {
        return Err(CliError::file_path_error(trace).into());
    }

    let reader = TraceReader::open(trace)?;
    let mut out = open_output(output)?;
    let written = if reader.summary().is_some() {
        write_csv(reader.iter(), count, &mut out)
    } else {
        tracing::debug!(trace = %trace.display(), "no summary sidecar; stopping at the first empty record");
        write_csv(reader.iter_written(), count, &mut out)
    };
    let stats = written.and_then(|stats| out.flush().map(|()| stats)).map_err(|e| CliError::output_error(output_label(output), e))?;

    tracing::info!(
        trace = %trace.display(),
        output = %output_label(output),
        rows = stats.rows,
        errors = stats.errors,
        "decoded trace"
    );
    Ok(())
}

pub fn header() -> String {
    let mut header = HEADER_PREFIX.to_string();
    for i in 0..MAX_SOURCES {
        let _ = write!(header, ",src{i}_name,src{i}_memory,src{i}_location,src{i}_size,src{i}_layer,src{i}_registry_index");
    }
    header
}

/// Write one row per decodable record, at most `limit` rows. Undecodable records are skipped.
pub fn write_csv<I, W>(records: I, limit: Option<usize>, out: &mut W) -> io::Result<DecodeStats>
where
    I: Iterator<Item = Result<AccessRecord, RecordError>>,
    W: Write + ?Sized,
{
    writeln!(out, "{}", header())?;

    let mut stats = DecodeStats::default();
    for (index, record) in records.take(limit.unwrap_or(usize::MAX)).enumerate() {
        match record {
            Ok(record) => {
                writeln!(out, "{}", row(index, &record))?;
                stats.rows += 1;
            }
            Err(e) => {
                tracing::warn!(index, error = %e, "skipping undecodable record");
                stats.errors += 1;
            }
        }
    }
    Ok(stats)
}

fn layer_column(layer_id: u16) -> i32 {
    known_layer(layer_id).map_or(-1, i32::from)
}

fn row(index: usize, record: &AccessRecord) -> String {
    let sources = record.sources();
    let mut line = format!(
        "{index},{},{},{},{},{},{},{},{}",
        record.timestamp_ns,
        record.token_id,
        record.phase,
        record.thread_id,
        record.op_code,
        layer_column(record.layer_id),
        record.dst_name,
        sources.len()
    );
    for slot in 0..MAX_SOURCES {
        match sources.get(slot) {
            Some(source) => push_source(&mut line, source),
            None => line.push_str(",,,,,,"),
        }
    }
    line
}

fn push_source(line: &mut String, source: &SourceSlot) {
    let location = if source.location_known { source.location.to_string() } else { String::new() };
    let registry = source.registry_index().map(|i| i.to_string()).unwrap_or_default();
    let _ = write!(
        line,
        ",{},{},{},{},{},{}",
        source.name,
        source.memory,
        location,
        source.size_bytes,
        layer_column(source.layer_id),
        registry
    );
}
