use crate::chromosome::{Chromosome, JobId};
use crate::error::{GeneticError, Result};
use crate::rng::RandomNumberGenerator;

/// Job-Based Crossover (JBX).
///
/// Draws `k` uniformly from `[1, num_jobs - 1]` and a random subset of `k`
/// jobs, then builds the child with [`crossover_with_subset`]. With a single
/// job there is nothing to partition and the child is a copy of `parent1`.
pub fn job_based_crossover(
    parent1: &Chromosome,
    parent2: &Chromosome,
    num_jobs: usize,
    rng: &mut RandomNumberGenerator,
) -> Result<Chromosome> {
    if num_jobs < 2 {
        return Ok(parent1.clone());
    }

    let k = rng.gen_range(1, num_jobs);
    let mut in_subset = vec![false; num_jobs];
    for job in rng.sample_indices(num_jobs, k) {
        in_subset[job] = true;
    }

    crossover_with_subset(parent1, parent2, &in_subset)
}

/// Deterministic core of JBX.
///
/// `in_subset[g]` marks the jobs inherited positionally from `parent1`. Every
/// other position is filled left to right with the genes of `parent2` whose job
/// is not in the subset, in `parent2`'s order.
///
/// # Errors
///
/// - `InvalidChromosome` if `parent1` holds a job id outside `in_subset`.
/// - `CrossoverUnderflow` if `parent2` runs out of complementary genes.
pub fn crossover_with_subset(
    parent1: &Chromosome,
    parent2: &Chromosome,
    in_subset: &[bool],
) -> Result<Chromosome> {
    let keeps = |job: JobId| -> Result<bool> {
        in_subset.get(job).copied().ok_or_else(|| GeneticError::InvalidChromosome {
            reason: format!(
                "job id {} out of range 0..{} during crossover",
                job,
                in_subset.len()
            ),
        })
    };

    let mut donors = parent2.genes().iter().copied();
    let mut child = Vec::with_capacity(parent1.len());

    for (position, &gene) in parent1.genes().iter().enumerate() {
        if keeps(gene)? {
            child.push(gene);
            continue;
        }
        let filler = loop {
            let candidate = donors.next().ok_or_else(|| GeneticError::CrossoverUnderflow {
                position,
                parent1: parent1.genes().to_vec(),
                parent2: parent2.genes().to_vec(),
            })?;
            if !keeps(candidate)? {
                break candidate;
            }
        };
        child.push(filler);
    }

    Ok(Chromosome::new(child))
}
