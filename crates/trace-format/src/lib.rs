use std::io::BufRead;

use anyhow::{Error, ensure};

use crate::generic::{Parser, TraceEvent};

/// The trace event model and the parser seam shared by all trace readers
pub mod generic;
mod execution;
mod tables;
mod text;

pub use execution::{ExecutionLog, LogLine};
pub use tables::{DeviceTable, ProgramImage, ProgramTable};
pub use text::TextTraceParser;

/// Reads a complete trace in text format into memory.
///
/// Every line is parsed exactly once, so the returned events can be
/// sliced and copied freely by the simulation without re-parsing.
///
/// # Errors
///
/// Fails if a line could not be parsed or if the input contains no events at all.
pub fn read_trace<R: BufRead>(input: R) -> Result<Vec<TraceEvent>, Error> {
    let mut parser = TextTraceParser::new();
    let events = parser.parse(input)?.collect::<Result<Vec<_>, Error>>()?;

    ensure!(!events.is_empty(), "Trace contains no events");

    Ok(events)
}
