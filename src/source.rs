use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Error};
use sim_core::engine::TraceSource;
use trace_format::generic::TraceEvent;

/// Loads the trace of a program from `<dir>/<program>.txt`.
pub struct DirectoryTraceSource {
    dir: PathBuf,
}

impl DirectoryTraceSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_of(&self, program: &str) -> PathBuf {
        self.dir.join(format!("{program}.txt"))
    }
}

impl TraceSource for DirectoryTraceSource {
    fn load(&self, program: &str) -> Result<Vec<TraceEvent>, Error> {
        let path = self.path_of(program);
        log::debug!("Loading trace of `{program}` from {}", path.display());

        let file = File::open(&path)
            .with_context(|| format!("Could not open trace of `{program}` at {}", path.display()))?;
        trace_format::read_trace(BufReader::new(file))
            .with_context(|| format!("Could not read trace {}", path.display()))
    }
}
