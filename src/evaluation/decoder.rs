//! Schedule construction from a job-repeated permutation.
//!
//! The decoder is a discrete-event simulation with one unit of capacity per
//! machine: each gene schedules the next pending operation of its job at the
//! earliest time both the machine and the job are free. Integer arithmetic only,
//! so the same chromosome always decodes to the same makespan.

use crate::chromosome::{JobId, Makespan};
use crate::error::{GeneticError, Result};
use crate::instance::ProblemInstance;

/// One operation placed on the time line.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledOperation {
    pub job: JobId,
    /// Position of the operation within its job.
    pub index: usize,
    pub machine: usize,
    pub start: u64,
    pub finish: u64,
}

/// A fully decoded schedule, operations in decode order.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub operations: Vec<ScheduledOperation>,
    pub makespan: Makespan,
}

impl Schedule {
    /// Operations processed by `machine`, in start order.
    pub fn machine_sequence(&self, machine: usize) -> Vec<ScheduledOperation> {
        let mut ops: Vec<_> = self
            .operations
            .iter()
            .filter(|op| op.machine == machine)
            .copied()
            .collect();
        ops.sort_by_key(|op| op.start);
        ops
    }
}

/// Computes the makespan of `genes` without materializing the schedule.
pub fn makespan(genes: &[JobId], instance: &ProblemInstance) -> Result<Makespan> {
    simulate(genes, instance, |_| {})
}

/// Decodes `genes` into a full [`Schedule`].
pub fn decode(genes: &[JobId], instance: &ProblemInstance) -> Result<Schedule> {
    let mut operations = Vec::with_capacity(genes.len());
    let makespan = simulate(genes, instance, |op| operations.push(op))?;
    Ok(Schedule {
        operations,
        makespan,
    })
}

fn simulate<F>(genes: &[JobId], instance: &ProblemInstance, mut on_scheduled: F) -> Result<Makespan>
where
    F: FnMut(ScheduledOperation),
{
    let num_jobs = instance.num_jobs();
    let num_machines = instance.num_machines();

    if genes.len() != instance.chromosome_len() {
        return Err(GeneticError::InvalidChromosome {
            reason: format!(
                "length {} does not match {} jobs x {} machines ({:?})",
                genes.len(),
                num_jobs,
                num_machines,
                genes
            ),
        });
    }
    if let Some(&job) = genes.iter().find(|&&job| job >= num_jobs) {
        return Err(GeneticError::InvalidChromosome {
            reason: format!("job id {} out of range 0..{} ({:?})", job, num_jobs, genes),
        });
    }

    let mut machine_finish = vec![0u64; num_machines];
    let mut job_finish = vec![0u64; num_jobs];
    let mut next_operation = vec![0usize; num_jobs];

    for &job in genes {
        let index = next_operation[job];
        let op = instance
            .operation(job, index)
            .ok_or_else(|| GeneticError::OperationIndexOverflow {
                job,
                index,
                available: num_machines,
                genes: genes.to_vec(),
            })?;

        let start = machine_finish[op.machine].max(job_finish[job]);
        let finish = start + op.duration;
        machine_finish[op.machine] = finish;
        job_finish[job] = finish;
        next_operation[job] += 1;

        on_scheduled(ScheduledOperation {
            job,
            index,
            machine: op.machine,
            start,
            finish,
        });
    }

    Ok(machine_finish.into_iter().max().unwrap_or(0))
}
