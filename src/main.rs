use std::path::PathBuf;

use anyhow::Error;
use clap::Parser;
use intrsim::SimulationInputs;
use log::LevelFilter;
use log4rs::{
    Config,
    append::console::{ConsoleAppender, Target},
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
};

#[derive(Parser)]
#[command(version, about = "Simulates interrupt handling and process management from a trace")]
struct Cli {
    /// Trace of the root process
    trace: PathBuf,

    /// ISR addresses, one per line
    vector_table: PathBuf,

    /// Device service times in ticks, one per line
    device_table: PathBuf,

    /// `name, size` pairs of the programs EXEC can load
    external_files: PathBuf,

    /// Directory holding `<program>.txt` traces [default: directory of TRACE]
    #[arg(long)]
    program_dir: Option<PathBuf>,

    /// Directory the logs are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// JSON file describing the partition table
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Increase console verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Silence all console diagnostics
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn init_logging(verbose: u8, quiet: bool) -> Result<(), Error> {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::Off,
        (false, 0) => LevelFilter::Warn,
        (false, 1) => LevelFilter::Info,
        (false, 2) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{h({l:<5})} {t} - {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))?;
    log4rs::init_config(config)?;

    Ok(())
}

fn main() -> Result<(), Error> {
    let args = Cli::parse();
    init_logging(args.verbose, args.quiet)?;

    let inputs = SimulationInputs {
        trace: args.trace,
        vector_table: args.vector_table,
        device_table: args.device_table,
        external_files: args.external_files,
        program_dir: args.program_dir,
        layout: args.layout,
    };

    let output = intrsim::simulate_files(&inputs)?;
    intrsim::write_outputs(&output, &args.output_dir)?;

    println!(
        "Simulation finished at t={} ({} execution log lines)",
        output.clock,
        output.execution.len()
    );

    Ok(())
}
