//! JSON-lines I/O for the CLI
//!
//! - Input: one JSON request per line, from a script file or stdin
//! - Output: one JSON object per line on the command's writer (stdout)
//! - Blank lines and lines starting with `#` are skipped

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use serde::Serialize;

use super::errors::{CliError, CliResult};
use crate::latency::Request;

/// Reads every request from `script`, or from stdin when `None`.
///
/// Fails on the first line that is not a valid request, naming its line number.
pub fn read_requests(script: Option<&Path>) -> CliResult<Vec<Request>> {
    let reader: Box<dyn BufRead> = match script {
        Some(path) => {
            let file = File::open(path).map_err(|e| {
                CliError::io_error(format!("failed to open script '{}': {}", path.display(), e))
            })?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(io::stdin().lock()),
    };
    parse_requests(reader)
}

pub(super) fn parse_requests(reader: impl BufRead) -> CliResult<Vec<Request>> {
    let mut requests = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let request = serde_json::from_str(trimmed)
            .map_err(|e| CliError::io_error(format!("line {}: invalid request: {}", index + 1, e)))?;
        requests.push(request);
    }
    Ok(requests)
}

/// Write one JSON line to `out` and flush it
pub fn write_json_to<W: Write, T: Serialize>(out: &mut W, value: &T) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
