use std::fmt::Write;

use trace_format::generic::TraceEvent;

use crate::pcb::{Pid, ProcessRecord};

/// The live direct children of a process, in creation order.
///
/// Every recursion level of the simulation owns its own wait set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitSet {
    children: Vec<ProcessRecord>,
}

impl WaitSet {
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
        }
    }

    pub fn push(&mut self, child: ProcessRecord) {
        self.children.push(child);
    }

    /// Removes the child with the given PID, returning its record.
    pub fn remove(&mut self, pid: Pid) -> Option<ProcessRecord> {
        let idx = self.children.iter().position(|child| child.pid() == pid)?;
        Some(self.children.remove(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.children.iter()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

const PROGRAM_TITLE: &str = "program name";

/// Renders the state of `current` and its wait set after `trigger` was
/// executed at `time`.
///
/// The current process is listed first as `running`, followed by every
/// waiting record. A missing parent or partition is rendered as `-1`. The
/// program column grows with the longest program name of the block.
pub fn snapshot(time: u64, trigger: &TraceEvent, current: &ProcessRecord, wait_set: &WaitSet) -> String {
    let width = std::iter::once(current)
        .chain(wait_set.iter())
        .map(|record| record.program().len())
        .fold(PROGRAM_TITLE.len(), usize::max);
    let header = format!("| PID | PPID | {PROGRAM_TITLE:>width$} | partition number | size | state   |");
    let border = format!("+{}+", "-".repeat(header.len() - 2));

    let mut block = String::new();
    // Writing into a String cannot fail
    let _ = writeln!(block, "time: {time}; current trace: {trigger}");
    let _ = writeln!(block, "{border}");
    let _ = writeln!(block, "{header}");
    let _ = writeln!(block, "{border}");
    let _ = writeln!(block, "{}", row(current, "running", width));
    for child in wait_set.iter() {
        let _ = writeln!(block, "{}", row(child, "waiting", width));
    }
    let _ = writeln!(block, "{border}");

    block
}

fn row(record: &ProcessRecord, state: &str, width: usize) -> String {
    let parent = record.parent().map_or(-1, i64::from);
    let partition = record.partition().map_or(-1, i64::from);

    format!(
        "| {:>3} | {:>4} | {:>width$} | {:>16} | {:>4} | {:<7} |",
        record.pid(),
        parent,
        record.program(),
        partition,
        record.size(),
        state
    )
}
