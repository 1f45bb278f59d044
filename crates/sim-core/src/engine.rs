use std::collections::HashMap;

use anyhow::{Error, anyhow, ensure};
use log::{debug, info, warn};
use trace_format::{
    DeviceTable, ExecutionLog, LogLine, ProgramTable,
    generic::{Activity, TraceEvent},
};

use crate::{
    branch::extract_child_branch,
    dispatch::dispatch,
    memory::{MemoryLayout, MemoryManager},
    pcb::ProcessRecord,
    pid::PidAllocator,
    status::{WaitSet, snapshot},
};

/// Trap cost of `SYSCALL` and `END_IO` interrupts.
pub const SYSCALL_TRAP_TICKS: u64 = 10;
/// Vector used to enter the kernel for `FORK`.
pub const FORK_VECTOR: usize = 2;
/// Trap cost of `FORK`.
pub const FORK_TRAP_TICKS: u64 = 2;
/// Vector used to enter the kernel for `EXEC`.
pub const EXEC_VECTOR: usize = 3;
/// Trap cost of `EXEC`.
pub const EXEC_TRAP_TICKS: u64 = 3;
pub const IRET_TICKS: u64 = 1;
pub const CHILD_CREATED_TICKS: u64 = 2;
pub const CHILD_TERMINATED_TICKS: u64 = 1;
pub const EXEC_ANNOUNCE_TICKS: u64 = 1;
/// Loading a program image takes this many ticks per unit of its size.
pub const LOAD_TICKS_PER_UNIT: u64 = 15;
/// Maximum nesting of forked children and replaced images.
pub const MAX_DEPTH: usize = 256;

/// Provides the trace of a program whenever a process replaces its image.
pub trait TraceSource {
    fn load(&self, program: &str) -> Result<Vec<TraceEvent>, Error>;
}

impl TraceSource for HashMap<String, Vec<TraceEvent>> {
    fn load(&self, program: &str) -> Result<Vec<TraceEvent>, Error> {
        self.get(program)
            .cloned()
            .ok_or_else(|| anyhow!("No trace available for program `{program}`"))
    }
}

/// The result of simulating one trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationOutput {
    pub execution: ExecutionLog,
    pub status: String,
    /// Simulated time after the last event.
    pub clock: u64,
    /// The process as it was when its trace ended, including image replacements.
    pub process: ProcessRecord,
}

/// Logs and clock of the trace currently being interpreted.
struct Frame {
    execution: ExecutionLog,
    status: String,
    clock: u64,
}

impl Frame {
    fn new(clock: u64) -> Self {
        Self {
            execution: ExecutionLog::new(),
            status: String::new(),
            clock,
        }
    }

    fn step<S: Into<String>>(&mut self, duration: u64, description: S) {
        self.execution
            .push(LogLine::new(self.clock, duration, description));
        self.clock += duration;
    }

    fn append(&mut self, (fragment, clock): (ExecutionLog, u64)) {
        self.execution.append(fragment);
        self.clock = clock;
    }

    fn snapshot(&mut self, trigger: &TraceEvent, current: &ProcessRecord, wait_set: &WaitSet) {
        self.status
            .push_str(&snapshot(self.clock, trigger, current, wait_set));
    }

    fn splice(&mut self, output: SimulationOutput) -> ProcessRecord {
        self.execution.append(output.execution);
        self.status.push_str(&output.status);
        self.clock = output.clock;
        output.process
    }

    fn finish(self, process: ProcessRecord) -> SimulationOutput {
        SimulationOutput {
            execution: self.execution,
            status: self.status,
            clock: self.clock,
            process,
        }
    }
}

/// Interprets traces against a fixed machine configuration.
///
/// The simulator owns the state that outlives a single trace: the
/// partition table and the PID counter. Forked children and replaced
/// images are simulated by recursive calls to [`Simulator::run`] which
/// run to completion before their caller continues.
pub struct Simulator<'a, S: TraceSource> {
    devices: &'a DeviceTable,
    programs: &'a ProgramTable,
    traces: &'a S,
    memory: MemoryManager,
    pids: PidAllocator,
    depth: usize,
}

impl<'a, S: TraceSource> Simulator<'a, S> {
    pub fn new(
        devices: &'a DeviceTable,
        programs: &'a ProgramTable,
        traces: &'a S,
        layout: &MemoryLayout,
    ) -> Self {
        Self {
            devices,
            programs,
            traces,
            memory: MemoryManager::new(layout),
            pids: PidAllocator::new(),
            depth: 0,
        }
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    pub fn pids(&self) -> &PidAllocator {
        &self.pids
    }

    /// Creates the root process and assigns its memory.
    ///
    /// # Errors
    ///
    /// The root process must always fit, failing to allocate it aborts
    /// the simulation.
    pub fn boot(&mut self) -> Result<ProcessRecord, Error> {
        let mut init = ProcessRecord::init();
        ensure!(
            self.memory.allocate(&mut init),
            "Memory allocation for {init} failed: no partition holds {} units",
            init.size()
        );
        info!("Booted {init} in partition {:?}", init.partition());

        Ok(init)
    }

    /// Simulates `trace` for `current`, starting at `start`.
    ///
    /// `wait_set` holds the live children of `current`. The returned output
    /// contains only what happened during this trace, including everything
    /// simulated for forked children and replaced images.
    ///
    /// # Errors
    ///
    /// This function fails on configuration errors: interrupt or device
    /// numbers outside the device tables, unknown programs, traces that
    /// cannot be loaded and nesting deeper than [`MAX_DEPTH`]. Running out
    /// of memory is not an error, it is narrated in the execution log.
    pub fn run(
        &mut self,
        trace: &[TraceEvent],
        start: u64,
        current: ProcessRecord,
        mut wait_set: WaitSet,
    ) -> Result<SimulationOutput, Error> {
        ensure!(
            self.depth < MAX_DEPTH,
            "Processes are nested deeper than {MAX_DEPTH} levels"
        );
        self.depth += 1;

        let mut frame = Frame::new(start);
        let mut current = current;
        let mut idx = 0;

        while let Some(event) = trace.get(idx) {
            debug!("[t={}] {current}: {event}", frame.clock);

            // Markers were consumed by the FORK that encloses them
            if event.activity().is_marker() {
                idx += 1;
                continue;
            }

            match event.activity() {
                Activity::Cpu => {
                    frame.step(u64::from(event.parameter()), "CPU Burst");
                }
                Activity::Syscall | Activity::EndIo => {
                    self.service_interrupt(&mut frame, event)?;
                }
                Activity::Fork => {
                    idx = self.fork(&mut frame, trace, idx, &current, &mut wait_set)?;
                    continue;
                }
                Activity::Exec => {
                    current = self.exec(&mut frame, event, current, &wait_set)?;
                    // The old image is gone, nothing after EXEC belongs to this process
                    break;
                }
                Activity::IfChild | Activity::IfParent | Activity::EndIf => {
                    unreachable!("branch markers are skipped above")
                }
            }

            idx += 1;
        }

        self.depth -= 1;
        Ok(frame.finish(current))
    }

    fn service_interrupt(&mut self, frame: &mut Frame, event: &TraceEvent) -> Result<(), Error> {
        let device = usize::try_from(event.parameter())?;
        let delay = self.devices.delay(device)?;

        frame.append(dispatch(
            frame.clock,
            device,
            SYSCALL_TRAP_TICKS,
            self.devices,
        )?);
        frame.step(
            u64::from(delay),
            format!("{} ISR executed", event.activity()),
        );
        frame.step(IRET_TICKS, "IRET");

        Ok(())
    }

    /// Returns the index at which the parent continues.
    fn fork(
        &mut self,
        frame: &mut Frame,
        trace: &[TraceEvent],
        fork_index: usize,
        current: &ProcessRecord,
        wait_set: &mut WaitSet,
    ) -> Result<usize, Error> {
        let event = &trace[fork_index];
        frame.append(dispatch(
            frame.clock,
            FORK_VECTOR,
            FORK_TRAP_TICKS,
            self.devices,
        )?);

        let mut child = current.fork_child(self.pids.next_pid());
        let created = self.memory.allocate(&mut child);
        if created {
            info!("{current} forked {child} into partition {:?}", child.partition());
            frame.step(
                CHILD_CREATED_TICKS,
                format!("Child process created (PID {})", child.pid()),
            );
        } else {
            warn!("{current} cannot fork {child}: no partition holds {} units", child.size());
            frame.step(0, "Memory full, child process cannot be created");
        }

        let child_pid = child.pid();
        wait_set.push(child.clone());
        frame.snapshot(event, current, wait_set);

        let branches = extract_child_branch(trace, fork_index);

        if created {
            let output = self.run(&branches.child, frame.clock, child, WaitSet::new())?;
            let mut finished = frame.splice(output);
            self.memory.free(&mut finished);
            info!("{finished} terminated, returning to {current}");
            frame.step(
                CHILD_TERMINATED_TICKS,
                "Child terminated, returning to parent",
            );
        }
        wait_set.remove(child_pid);

        Ok(branches.resume_at)
    }

    /// Returns the record of `current` after its image was replaced.
    fn exec(
        &mut self,
        frame: &mut Frame,
        event: &TraceEvent,
        mut current: ProcessRecord,
        wait_set: &WaitSet,
    ) -> Result<ProcessRecord, Error> {
        let program = event
            .program()
            .ok_or_else(|| anyhow!("EXEC without a program name"))?;

        frame.append(dispatch(
            frame.clock,
            EXEC_VECTOR,
            EXEC_TRAP_TICKS,
            self.devices,
        )?);

        let size = self.programs.size_of(program)?;
        self.memory.free(&mut current);
        current.replace_image(program, size);

        if !self.memory.allocate(&mut current) {
            warn!("{current} cannot be loaded: no partition holds {size} units");
            frame.step(0, "EXEC failed (no space)");
            frame.snapshot(event, &current, wait_set);
            return Ok(current);
        }

        info!("{current} loaded into partition {:?}", current.partition());
        frame.step(
            EXEC_ANNOUNCE_TICKS,
            format!("EXEC successful, running {program}"),
        );
        frame.step(
            u64::from(size) * LOAD_TICKS_PER_UNIT,
            "loading program into memory",
        );
        frame.snapshot(event, &current, wait_set);

        let trace = self.traces.load(program)?;
        let output = self.run(&trace, frame.clock, current, wait_set.clone())?;

        Ok(frame.splice(output))
    }
}
