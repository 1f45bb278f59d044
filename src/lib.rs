use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

use anyhow::{Context, Error};
use log::info;
use sim_core::{engine::SimulationOutput, memory::MemoryLayout};
use trace_format::{DeviceTable, ProgramTable};

pub use source::DirectoryTraceSource;

mod source;

/// Name of the execution log written by [`write_outputs`].
pub const EXECUTION_FILE: &str = "execution.txt";
/// Name of the status log written by [`write_outputs`].
pub const STATUS_FILE: &str = "system_status.txt";

/// Locations of every input a simulation run reads.
#[derive(Debug, Clone)]
pub struct SimulationInputs {
    /// The trace of the root process.
    pub trace: PathBuf,
    /// One ISR address per line, indexed by interrupt number.
    pub vector_table: PathBuf,
    /// One service time per line, indexed by device number.
    pub device_table: PathBuf,
    /// `name, size` pairs of the programs `EXEC` can load.
    pub external_files: PathBuf,
    /// Directory containing `<program>.txt` traces. Defaults to the directory of `trace`.
    pub program_dir: Option<PathBuf>,
    /// JSON partition layout. Defaults to [`MemoryLayout::default`].
    pub layout: Option<PathBuf>,
}

impl SimulationInputs {
    pub fn new<P: Into<PathBuf>>(
        trace: P,
        vector_table: P,
        device_table: P,
        external_files: P,
    ) -> Self {
        Self {
            trace: trace.into(),
            vector_table: vector_table.into(),
            device_table: device_table.into(),
            external_files: external_files.into(),
            program_dir: None,
            layout: None,
        }
    }

    fn program_dir(&self) -> PathBuf {
        self.program_dir.clone().unwrap_or_else(|| {
            self.trace
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default()
        })
    }
}

fn open<P: AsRef<Path>>(path: P, what: &str) -> Result<BufReader<File>, Error> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Could not open {what} at {}", path.display()))?;
    Ok(BufReader::new(file))
}

/// Loads the vector and device tables.
pub fn load_devices(inputs: &SimulationInputs) -> Result<DeviceTable, Error> {
    DeviceTable::from_readers(
        open(&inputs.vector_table, "vector table")?,
        open(&inputs.device_table, "device table")?,
    )
    .context("Could not load device tables")
}

/// Loads the program-size table.
pub fn load_programs(inputs: &SimulationInputs) -> Result<ProgramTable, Error> {
    let programs = ProgramTable::from_reader(open(&inputs.external_files, "program table")?)
        .context("Could not load program table")?;

    info!("{} external program(s) available:", programs.len());
    for program in programs.iter() {
        info!("  {} (size {})", program.name, program.size);
    }

    Ok(programs)
}

/// Loads the configured partition layout or falls back to the default one.
pub fn load_layout(inputs: &SimulationInputs) -> Result<MemoryLayout, Error> {
    match &inputs.layout {
        Some(path) => MemoryLayout::from_json(open(path, "memory layout")?)
            .with_context(|| format!("Invalid memory layout {}", path.display())),
        None => Ok(MemoryLayout::default()),
    }
}

/// Reads all inputs and runs the simulation of the root trace.
///
/// # Errors
///
/// This function fails if any input is missing or malformed, or if the
/// simulation hits a configuration error. Refer to [`sim_core::simulate`].
pub fn simulate_files(inputs: &SimulationInputs) -> Result<SimulationOutput, Error> {
    let devices = load_devices(inputs)?;
    let programs = load_programs(inputs)?;
    let layout = load_layout(inputs)?;
    let trace = trace_format::read_trace(open(&inputs.trace, "trace")?)
        .with_context(|| format!("Could not read trace {}", inputs.trace.display()))?;
    let traces = DirectoryTraceSource::new(inputs.program_dir());

    info!(
        "Simulating {} event(s) with partitions {:?}",
        trace.len(),
        layout.partitions()
    );
    let output = sim_core::simulate(&trace, &devices, &programs, &traces, &layout)?;
    info!("Simulation finished at t={}", output.clock);

    Ok(output)
}

/// Writes the execution and status logs into `dir`, replacing older files.
pub fn write_outputs<P: AsRef<Path>>(output: &SimulationOutput, dir: P) -> Result<(), Error> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    output
        .execution
        .encode(BufWriter::new(File::create(dir.join(EXECUTION_FILE))?))?;
    std::fs::write(dir.join(STATUS_FILE), &output.status)?;

    info!("Logs written to {}", dir.display());

    Ok(())
}
