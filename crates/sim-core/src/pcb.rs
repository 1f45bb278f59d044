use std::fmt::Display;

/// Process identifiers are handed out by [`crate::pid::PidAllocator`] and never reused.
pub type Pid = u32;

/// PID of the process every simulation starts with.
pub const ROOT_PID: Pid = 0;
/// Program name of the root process.
pub const INIT_PROGRAM: &str = "init";
/// Memory footprint of the root process.
pub const INIT_SIZE: u32 = 1;
/// Appended to the parent's program name when a child is forked.
pub const CHILD_SUFFIX: &str = "_child";

/// The process control block of a simulated process.
///
/// `partition` is `None` while the process holds no memory. A record with a
/// partition owns exactly that partition in the [`crate::memory::MemoryManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pid: Pid,
    parent: Option<Pid>,
    program: String,
    size: u32,
    partition: Option<u32>,
}

impl ProcessRecord {
    pub fn new<S: Into<String>>(pid: Pid, parent: Option<Pid>, program: S, size: u32) -> Self {
        Self {
            pid,
            parent,
            program: program.into(),
            size,
            partition: None,
        }
    }

    /// The record of the root process before any memory has been assigned.
    pub fn init() -> Self {
        Self::new(ROOT_PID, None, INIT_PROGRAM, INIT_SIZE)
    }

    /// Creates the record of a freshly forked child of this process.
    ///
    /// The child inherits the program image and size but no memory.
    pub fn fork_child(&self, pid: Pid) -> Self {
        Self::new(
            pid,
            Some(self.pid),
            format!("{}{CHILD_SUFFIX}", self.program),
            self.size,
        )
    }

    /// Replaces the program image of this process in place.
    ///
    /// The caller has to release the memory of the old image first.
    pub fn replace_image<S: Into<String>>(&mut self, program: S, size: u32) {
        debug_assert!(self.partition.is_none(), "Image replaced while holding memory");
        self.program = program.into();
        self.size = size;
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn parent(&self) -> Option<Pid> {
        self.parent
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn partition(&self) -> Option<u32> {
        self.partition
    }

    pub(crate) fn set_partition(&mut self, partition: Option<u32>) {
        self.partition = partition;
    }
}

impl Display for ProcessRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PID {} ({})", self.pid, self.program)
    }
}

#[cfg(test)]
mod tests {
    use super::{ProcessRecord, ROOT_PID};

    #[test]
    fn init_record_has_no_parent_and_no_memory() {
        let init = ProcessRecord::init();

        assert_eq!(init.pid(), ROOT_PID);
        assert_eq!(init.parent(), None);
        assert_eq!(init.program(), "init");
        assert_eq!(init.size(), 1);
        assert_eq!(init.partition(), None);
    }

    #[test]
    fn forked_child_inherits_image_but_not_memory() {
        let mut parent = ProcessRecord::new(3, Some(0), "shell", 12);
        parent.set_partition(Some(2));

        let child = parent.fork_child(4);

        assert_eq!(child.pid(), 4);
        assert_eq!(child.parent(), Some(3));
        assert_eq!(child.program(), "shell_child");
        assert_eq!(child.size(), 12);
        assert_eq!(child.partition(), None);
    }

    #[test]
    fn replace_image_keeps_identity() {
        let mut record = ProcessRecord::new(5, Some(1), "init_child", 1);
        record.replace_image("program1", 10);

        assert_eq!(record.pid(), 5);
        assert_eq!(record.parent(), Some(1));
        assert_eq!(record.program(), "program1");
        assert_eq!(record.size(), 10);
    }
}
