use crate::pcb::{Pid, ROOT_PID};

/// Hands out process identifiers for a single simulation run.
///
/// The allocator only ever counts upwards, so there is no way of
/// reusing a PID once it has been issued, even after the process
/// it belonged to has terminated.
#[derive(Debug)]
pub struct PidAllocator {
    next: Pid,
}

impl PidAllocator {
    /// Creates an allocator whose first PID follows the root PID.
    pub fn new() -> Self {
        Self { next: ROOT_PID + 1 }
    }

    /// Generates a new, unique PID.
    pub fn next_pid(&mut self) -> Pid {
        let pid = self.next;
        self.next += 1;
        pid
    }

    /// Number of PIDs issued so far, not counting the root.
    pub fn issued(&self) -> u32 {
        self.next - ROOT_PID - 1
    }
}

impl Default for PidAllocator {
    fn default() -> Self {
        Self::new()
    }
}
