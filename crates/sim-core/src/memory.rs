use std::io::Read;

use anyhow::{Error, ensure};
use log::trace;
use serde::{Deserialize, Serialize};

use crate::pcb::{Pid, ProcessRecord};

/// Partition sizes used when no layout is configured.
pub const DEFAULT_PARTITIONS: [u32; 6] = [40, 25, 15, 10, 8, 2];

/// The fixed partition table of the simulated machine.
///
/// Partitions are numbered from 1 in the order they are listed.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct MemoryLayout {
    partitions: Vec<u32>,
}

impl MemoryLayout {
    pub fn new(partitions: Vec<u32>) -> Result<Self, Error> {
        let layout = Self { partitions };
        layout.validate()?;
        Ok(layout)
    }

    pub fn partitions(&self) -> &[u32] {
        &self.partitions
    }

    pub fn from_json<R: Read>(reader: R) -> Result<Self, Error> {
        let layout: Self = serde_json::from_reader(reader)?;
        layout.validate()?;
        Ok(layout)
    }

    fn validate(&self) -> Result<(), Error> {
        ensure!(!self.partitions.is_empty(), "Memory layout has no partitions");
        ensure!(
            self.partitions.iter().all(|size| *size > 0),
            "Memory layout contains a partition of size 0"
        );
        Ok(())
    }
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self {
            partitions: DEFAULT_PARTITIONS.to_vec(),
        }
    }
}

/// A fixed memory region which is either free or owned by one process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub number: u32,
    pub size: u32,
    pub owner: Option<Pid>,
}

/// A first-fit allocator over a fixed partition table.
///
/// Given the same sequence of [`allocate`](MemoryManager::allocate) and
/// [`free`](MemoryManager::free) calls, partitions are assigned identically.
#[derive(Debug, Clone)]
pub struct MemoryManager {
    partitions: Vec<Partition>,
}

impl MemoryManager {
    pub fn new(layout: &MemoryLayout) -> Self {
        Self {
            partitions: (1..)
                .zip(layout.partitions())
                .map(|(number, size)| Partition {
                    number,
                    size: *size,
                    owner: None,
                })
                .collect(),
        }
    }

    /// Assigns the first free partition that can hold `record`.
    ///
    /// Returns `false` and leaves `record` without memory if no free
    /// partition is large enough. A record that already owns a partition
    /// keeps it.
    pub fn allocate(&mut self, record: &mut ProcessRecord) -> bool {
        if record.partition().is_some() {
            return true;
        }

        match self
            .partitions
            .iter_mut()
            .find(|partition| partition.owner.is_none() && partition.size >= record.size())
        {
            Some(partition) => {
                trace!(
                    "Partition {} ({} units) assigned to {record}",
                    partition.number, partition.size
                );
                partition.owner = Some(record.pid());
                record.set_partition(Some(partition.number));
                true
            }
            None => {
                trace!("No free partition can hold {} units for {record}", record.size());
                false
            }
        }
    }

    /// Releases the partition owned by `record`. Does nothing if it owns none.
    pub fn free(&mut self, record: &mut ProcessRecord) {
        let Some(number) = record.partition() else {
            return;
        };

        if let Some(partition) = self
            .partitions
            .iter_mut()
            .find(|partition| partition.number == number && partition.owner == Some(record.pid()))
        {
            trace!("Partition {number} released by {record}");
            partition.owner = None;
        }
        record.set_partition(None);
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Total size of all partitions nobody owns.
    pub fn free_capacity(&self) -> u32 {
        self.partitions
            .iter()
            .filter(|partition| partition.owner.is_none())
            .map(|partition| partition.size)
            .sum()
    }
}
