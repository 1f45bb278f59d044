use std::{fmt::Display, io::Write};

use anyhow::Error;

/// One entry of the execution log: `time, duration, description`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub time: u64,
    pub duration: u64,
    pub description: String,
}

impl LogLine {
    pub fn new<S: Into<String>>(time: u64, duration: u64, description: S) -> Self {
        Self {
            time,
            duration,
            description: description.into(),
        }
    }

    /// The simulated time at which the next line starts.
    pub fn end(&self) -> u64 {
        self.time + self.duration
    }
}

impl Display for LogLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}, {}", self.time, self.duration, self.description)
    }
}

/// The chronological execution log produced by a simulation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionLog {
    lines: Vec<LogLine>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    pub fn push(&mut self, line: LogLine) {
        self.lines.push(line);
    }

    /// Appends all lines of `other` after the lines of this log.
    pub fn append(&mut self, other: ExecutionLog) {
        self.lines.extend(other.lines);
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Writes the log in text format, one line per entry.
    pub fn encode<W: Write>(&self, mut output: W) -> Result<(), Error> {
        for line in &self.lines {
            writeln!(output, "{line}")?;
        }

        output.flush()?;

        Ok(())
    }
}

impl Display for ExecutionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }

        Ok(())
    }
}
