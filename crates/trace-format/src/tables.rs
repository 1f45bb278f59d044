use std::io::BufRead;

use anyhow::{Context, Error, anyhow, bail, ensure};

/// The interrupt vector table and the matching device service times.
///
/// Both tables are indexed by interrupt/device number and are read-only
/// once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTable {
    vectors: Vec<String>,
    delays: Vec<u32>,
}

impl DeviceTable {
    pub fn new(vectors: Vec<String>, delays: Vec<u32>) -> Self {
        Self { vectors, delays }
    }

    /// Reads a vector table (one ISR address per line) and a device table
    /// (one service time in ticks per line).
    ///
    /// # Errors
    ///
    /// This function fails if either input could not be read or a device
    /// table line is not a non-negative integer.
    pub fn from_readers<V: BufRead, D: BufRead>(vectors: V, delays: D) -> Result<Self, Error> {
        let vectors = significant_lines(vectors)
            .map(|line| line.map(|(_, address)| address))
            .collect::<Result<Vec<_>, Error>>()?;

        let delays = significant_lines(delays)
            .map(|line| {
                let (number, delay) = line?;
                delay
                    .parse::<u32>()
                    .with_context(|| format!("Invalid device delay on line {number}: `{delay}`"))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Self::new(vectors, delays))
    }

    /// Returns the ISR address for `interrupt`.
    ///
    /// An interrupt number outside the table is a configuration error.
    pub fn vector(&self, interrupt: usize) -> Result<&str, Error> {
        self.vectors.get(interrupt).map(String::as_str).ok_or_else(|| {
            anyhow!(
                "Interrupt {interrupt} is outside the vector table (size {})",
                self.vectors.len()
            )
        })
    }

    /// Returns the service time of `device` in ticks.
    ///
    /// A device number outside the table is a configuration error.
    pub fn delay(&self, device: usize) -> Result<u32, Error> {
        self.delays.get(device).copied().ok_or_else(|| {
            anyhow!(
                "Device {device} is outside the device table (size {})",
                self.delays.len()
            )
        })
    }

    pub fn vectors(&self) -> &[String] {
        &self.vectors
    }

    pub fn delays(&self) -> &[u32] {
        &self.delays
    }
}

/// A program that can be loaded by `EXEC` together with its memory footprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramImage {
    pub name: String,
    pub size: u32,
}

/// The program-size table consulted when a process replaces its image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramTable {
    programs: Vec<ProgramImage>,
}

impl ProgramTable {
    pub fn new(programs: Vec<ProgramImage>) -> Self {
        Self { programs }
    }

    /// Reads `name, size` pairs, one per line.
    pub fn from_reader<R: BufRead>(input: R) -> Result<Self, Error> {
        let programs = significant_lines(input)
            .map(|line| {
                let (number, line) = line?;
                parse_program(&line).with_context(|| format!("Invalid program entry on line {number}"))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Self::new(programs))
    }

    /// Looks up the memory footprint of `program`.
    pub fn size_of(&self, program: &str) -> Result<u32, Error> {
        self.programs
            .iter()
            .find(|image| image.name == program)
            .map(|image| image.size)
            .ok_or_else(|| anyhow!("Program `{program}` is not listed in the program table"))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProgramImage> {
        self.programs.iter()
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

fn parse_program(line: &str) -> Result<ProgramImage, Error> {
    let mut tokens = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty());

    let (Some(name), Some(size)) = (tokens.next(), tokens.next()) else {
        bail!("Expected `name, size` but found `{line}`");
    };
    ensure!(tokens.next().is_none(), "Trailing tokens after `{name}, {size}`");

    Ok(ProgramImage {
        name: name.to_owned(),
        size: size
            .parse()
            .with_context(|| format!("Size of `{name}` is not a non-negative integer: `{size}`"))?,
    })
}

/// Yields trimmed, non-empty lines together with their 1-based line number.
fn significant_lines<R: BufRead>(input: R) -> impl Iterator<Item = Result<(usize, String), Error>> {
    input
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| match line {
            Ok(line) => {
                let line = line.trim();
                (!line.is_empty()).then(|| Ok((idx + 1, line.to_owned())))
            }
            Err(e) => Some(Err(Error::from(e))),
        })
}
