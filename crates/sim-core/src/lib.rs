use anyhow::{Error, ensure};
use trace_format::{DeviceTable, ProgramTable, generic::TraceEvent};

use crate::{
    engine::{SimulationOutput, Simulator, TraceSource},
    memory::MemoryLayout,
    status::WaitSet,
};

/// Fork branch extraction
pub mod branch;
/// The interrupt dispatch unit
pub mod dispatch;
/// The recursive trace interpreter
pub mod engine;
/// Partition-based memory management
pub mod memory;
/// Process control blocks
pub mod pcb;
/// Process identifier allocation
pub mod pid;
/// Wait sets and status snapshots
pub mod status;

/// Runs a complete simulation of `trace` for a freshly booted root process.
///
/// The clock starts at 0 and the root process starts without children.
/// Traces of programs loaded by `EXEC` are requested from `traces`.
///
/// # Errors
///
/// This function fails if `trace` is empty, if the root process does not
/// fit into any partition of `layout`, or on any configuration error
/// reported by [`Simulator::run`].
pub fn simulate<S: TraceSource>(
    trace: &[TraceEvent],
    devices: &DeviceTable,
    programs: &ProgramTable,
    traces: &S,
    layout: &MemoryLayout,
) -> Result<SimulationOutput, Error> {
    ensure!(!trace.is_empty(), "Cannot simulate an empty trace");

    let mut simulator = Simulator::new(devices, programs, traces, layout);
    let init = simulator.boot()?;

    simulator.run(trace, 0, init, WaitSet::new())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use anyhow::Error;
    use trace_format::{
        DeviceTable, ProgramTable,
        generic::{Activity, TraceEvent},
    };

    use crate::{memory::MemoryLayout, pcb::ROOT_PID};

    fn no_traces() -> HashMap<String, Vec<TraceEvent>> {
        HashMap::new()
    }

    #[test]
    fn simulate_from_boot() -> Result<(), Error> {
        let devices = DeviceTable::new(vec!["0X0000".into(), "0X0001".into()], vec![0, 4]);
        let trace = vec![
            TraceEvent::new(Activity::Cpu, 5),
            TraceEvent::new(Activity::Syscall, 1),
        ];

        let output = super::simulate(
            &trace,
            &devices,
            &ProgramTable::default(),
            &no_traces(),
            &MemoryLayout::default(),
        )?;

        assert_eq!(output.clock, 20);
        assert_eq!(output.process.pid(), ROOT_PID);
        assert_eq!(output.process.partition(), Some(1));

        Ok(())
    }

    #[test]
    fn empty_trace_is_rejected() {
        super::simulate(
            &[],
            &DeviceTable::new(vec![], vec![]),
            &ProgramTable::default(),
            &no_traces(),
            &MemoryLayout::default(),
        )
        .unwrap_err();
    }
}
