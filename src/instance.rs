//! # Problem Instance
//!
//! A job-shop instance: `num_jobs` jobs, each an ordered list of `num_machines`
//! operations `(machine, duration)`. The instance is immutable once built and is
//! shared read-only by every island.
//!
//! ## Benchmark format
//!
//! The text format is the one used by the classic FT/Taillard files: blank lines
//! are ignored, the first line holds `J M`, and each of the next `J` lines holds
//! `M` pairs of `machine duration`.
//!
//! ```rust
//! use islandga::instance::{MachineNumbering, ProblemInstance};
//!
//! let text = "2 2\n1 3 2 2\n2 2 1 4\n";
//! let instance = ProblemInstance::parse(text, MachineNumbering::OneBased).unwrap();
//! assert_eq!(instance.num_jobs(), 2);
//! assert_eq!(instance.operation(1, 1).unwrap().machine, 0);
//! ```

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{GeneticError, Result};

/// A single operation of a job: the machine it runs on and how long it takes.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operation {
    pub machine: usize,
    pub duration: u64,
}

impl Operation {
    pub fn new(machine: usize, duration: u64) -> Self {
        Self { machine, duration }
    }
}

/// How machine ids are written in a benchmark file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MachineNumbering {
    /// Machines are numbered `0..M`.
    ZeroBased,
    /// Machines are numbered `1..=M`.
    #[default]
    OneBased,
}

/// An immutable job-shop problem instance.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemInstance {
    num_jobs: usize,
    num_machines: usize,
    jobs: Vec<Vec<Operation>>,
}

impl ProblemInstance {
    /// Builds an instance, checking that there are `num_jobs` jobs with exactly
    /// `num_machines` operations each and that every machine id is in range.
    ///
    /// The sum of all durations must fit in a `u64`. No schedule is longer than
    /// that sum, so makespans never overflow.
    pub fn new(num_jobs: usize, num_machines: usize, jobs: Vec<Vec<Operation>>) -> Result<Self> {
        if jobs.len() != num_jobs {
            return Err(GeneticError::MalformedInstance(format!(
                "expected {} jobs, found {}",
                num_jobs,
                jobs.len()
            )));
        }

        for (job, operations) in jobs.iter().enumerate() {
            if operations.len() != num_machines {
                return Err(GeneticError::MalformedInstance(format!(
                    "job {} has {} operations, expected {}",
                    job,
                    operations.len(),
                    num_machines
                )));
            }
            if let Some(op) = operations.iter().find(|op| op.machine >= num_machines) {
                return Err(GeneticError::MalformedInstance(format!(
                    "job {} uses machine {} but the instance has {} machines",
                    job, op.machine, num_machines
                )));
            }
        }

        let total = jobs
            .iter()
            .flatten()
            .try_fold(0u64, |total, op| total.checked_add(op.duration));
        if total.is_none() {
            return Err(GeneticError::MalformedInstance(
                "total processing time overflows a 64-bit makespan".to_string(),
            ));
        }

        Ok(Self {
            num_jobs,
            num_machines,
            jobs,
        })
    }

    /// Builds an instance from raw `(machine, duration)` pairs.
    pub fn from_pairs(num_jobs: usize, num_machines: usize, jobs: &[Vec<(usize, u64)>]) -> Result<Self> {
        let jobs = jobs
            .iter()
            .map(|ops| ops.iter().map(|&(m, d)| Operation::new(m, d)).collect())
            .collect();
        Self::new(num_jobs, num_machines, jobs)
    }

    /// Parses the benchmark text format.
    pub fn parse(text: &str, numbering: MachineNumbering) -> Result<Self> {
        let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());

        let header = lines
            .next()
            .ok_or_else(|| GeneticError::MalformedInstance("missing header line".to_string()))?;
        let header = parse_numbers(header, 0)?;
        let (num_jobs, num_machines) = match header.as_slice() {
            [jobs, machines, ..] => (*jobs as usize, *machines as usize),
            _ => {
                return Err(GeneticError::MalformedInstance(
                    "header must contain the number of jobs and machines".to_string(),
                ))
            }
        };

        let data: Vec<&str> = lines.collect();
        if data.len() != num_jobs {
            return Err(GeneticError::MalformedInstance(format!(
                "header announces {} jobs but {} job lines follow",
                num_jobs,
                data.len()
            )));
        }

        let mut jobs = Vec::with_capacity(num_jobs);
        for (job, line) in data.iter().enumerate() {
            let values = parse_numbers(line, job + 2)?;
            if values.len() % 2 != 0 {
                return Err(GeneticError::MalformedInstance(format!(
                    "job {} has an odd number of values",
                    job
                )));
            }
            let operations = values
                .chunks_exact(2)
                .map(|pair| {
                    let machine = match numbering {
                        MachineNumbering::ZeroBased => Some(pair[0]),
                        MachineNumbering::OneBased => pair[0].checked_sub(1),
                    }
                    .ok_or_else(|| {
                        GeneticError::MalformedInstance(format!(
                            "job {} uses machine 0 in a one-based file",
                            job
                        ))
                    })?;
                    Ok(Operation::new(machine as usize, pair[1]))
                })
                .collect::<Result<Vec<_>>>()?;
            jobs.push(operations);
        }

        Self::new(num_jobs, num_machines, jobs)
    }

    /// Reads and parses a benchmark file.
    pub fn from_file<P: AsRef<Path>>(path: P, numbering: MachineNumbering) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text, numbering)
    }

    pub fn num_jobs(&self) -> usize {
        self.num_jobs
    }

    pub fn num_machines(&self) -> usize {
        self.num_machines
    }

    pub fn jobs(&self) -> &[Vec<Operation>] {
        &self.jobs
    }

    /// The `index`-th operation of `job`, if it exists.
    pub fn operation(&self, job: usize, index: usize) -> Option<&Operation> {
        self.jobs.get(job).and_then(|ops| ops.get(index))
    }

    /// Length of every valid chromosome for this instance (J × M).
    pub fn chromosome_len(&self) -> usize {
        self.num_jobs * self.num_machines
    }

    /// A trivial makespan lower bound: the longest job or the busiest machine.
    pub fn lower_bound(&self) -> u64 {
        let longest_job = self
            .jobs
            .iter()
            .map(|ops| ops.iter().map(|op| op.duration).sum::<u64>())
            .max()
            .unwrap_or(0);

        let mut machine_load = vec![0u64; self.num_machines];
        for op in self.jobs.iter().flatten() {
            machine_load[op.machine] += op.duration;
        }
        let busiest_machine = machine_load.into_iter().max().unwrap_or(0);

        longest_job.max(busiest_machine)
    }
}

impl FromStr for ProblemInstance {
    type Err = GeneticError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s, MachineNumbering::OneBased)
    }
}

fn parse_numbers(line: &str, line_no: usize) -> Result<Vec<u64>> {
    line.split_whitespace()
        .map(|token| {
            token.parse::<u64>().map_err(|_| {
                GeneticError::MalformedInstance(format!(
                    "invalid number '{}' on line {}",
                    token,
                    line_no + 1
                ))
            })
        })
        .collect()
}
