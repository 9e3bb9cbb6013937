//! # Chromosomes
//!
//! A chromosome is a job-repeated permutation: a sequence of length J × M in
//! which every job id occurs exactly M times. The i-th occurrence of job `g`
//! stands for the i-th operation of `g`; that is all the encoding carries.
//!
//! ```rust
//! use islandga::chromosome::Chromosome;
//! use islandga::rng::RandomNumberGenerator;
//!
//! let mut rng = RandomNumberGenerator::from_seed(0);
//! let chromosome = Chromosome::random(3, 4, &mut rng);
//! assert_eq!(chromosome.len(), 12);
//! assert!(chromosome.is_valid(3, 4));
//! ```

use std::cmp::Ordering;

use crate::rng::RandomNumberGenerator;

/// Index of a job in the problem instance.
pub type JobId = usize;

/// Completion time of the last operation of a decoded schedule.
pub type Makespan = u64;

/// A permutation-encoded schedule.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Chromosome {
    genes: Vec<JobId>,
}

impl Chromosome {
    pub fn new(genes: Vec<JobId>) -> Self {
        Self { genes }
    }

    /// The sorted base sequence `0,0,..,1,1,..` with each job repeated `num_machines` times.
    pub fn base(num_jobs: usize, num_machines: usize) -> Self {
        let genes = (0..num_jobs)
            .flat_map(|job| std::iter::repeat(job).take(num_machines))
            .collect();
        Self { genes }
    }

    /// A uniformly shuffled base sequence.
    pub fn random(num_jobs: usize, num_machines: usize, rng: &mut RandomNumberGenerator) -> Self {
        let mut chromosome = Self::base(num_jobs, num_machines);
        rng.shuffle(&mut chromosome.genes);
        chromosome
    }

    pub fn genes(&self) -> &[JobId] {
        &self.genes
    }

    pub fn into_genes(self) -> Vec<JobId> {
        self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Swaps the genes at positions `a` and `b`.
    ///
    /// # Panics
    ///
    /// Panics if either position is out of bounds.
    pub fn swap(&mut self, a: usize, b: usize) {
        self.genes.swap(a, b);
    }

    /// Occurrence count per job id, or `None` if a gene is outside `0..num_jobs`.
    pub fn job_counts(&self, num_jobs: usize) -> Option<Vec<usize>> {
        let mut counts = vec![0usize; num_jobs];
        for &gene in &self.genes {
            *counts.get_mut(gene)? += 1;
        }
        Some(counts)
    }

    /// Checks the multiset invariant: each job id in `0..num_jobs` occurs exactly
    /// `num_machines` times and nothing else occurs.
    pub fn is_valid(&self, num_jobs: usize, num_machines: usize) -> bool {
        self.genes.len() == num_jobs * num_machines
            && self
                .job_counts(num_jobs)
                .is_some_and(|counts| counts.iter().all(|&c| c == num_machines))
    }
}

impl From<Vec<JobId>> for Chromosome {
    fn from(genes: Vec<JobId>) -> Self {
        Self::new(genes)
    }
}

impl AsRef<[JobId]> for Chromosome {
    fn as_ref(&self) -> &[JobId] {
        &self.genes
    }
}

/// A chromosome together with the makespan it decodes to.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatedIndividual {
    pub chromosome: Chromosome,
    pub makespan: Makespan,
}

impl EvaluatedIndividual {
    pub fn new(chromosome: Chromosome, makespan: Makespan) -> Self {
        Self {
            chromosome,
            makespan,
        }
    }

    /// Orders by makespan only, lower first.
    pub fn by_makespan(a: &Self, b: &Self) -> Ordering {
        a.makespan.cmp(&b.makespan)
    }
}

/// Sorts best first. The sort is stable, so equal makespans keep their order.
pub fn sort_ascending(population: &mut [EvaluatedIndividual]) {
    population.sort_by(EvaluatedIndividual::by_makespan);
}

/// Sorts worst first. The sort is stable, so equal makespans keep their order.
pub fn sort_descending(population: &mut [EvaluatedIndividual]) {
    population.sort_by(|a, b| EvaluatedIndividual::by_makespan(b, a));
}

/// The first individual with the minimum makespan.
pub fn best_of(population: &[EvaluatedIndividual]) -> Option<&EvaluatedIndividual> {
    population.iter().fold(None, |best, candidate| match best {
        Some(b) if b.makespan <= candidate.makespan => Some(b),
        _ => Some(candidate),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_sequence() {
        assert_eq!(Chromosome::base(2, 3).genes(), &[0, 0, 0, 1, 1, 1]);
        assert!(Chromosome::base(0, 3).is_empty());
    }

    #[test]
    fn test_random_is_valid() {
        let mut rng = RandomNumberGenerator::from_seed(9);
        for _ in 0..50 {
            assert!(Chromosome::random(5, 4, &mut rng).is_valid(5, 4));
        }
    }

    #[test]
    fn test_is_valid_rejects_bad_counts() {
        assert!(!Chromosome::new(vec![0, 0, 0, 1]).is_valid(2, 2));
        assert!(!Chromosome::new(vec![0, 1, 2, 1]).is_valid(2, 2));
        assert!(!Chromosome::new(vec![0, 1, 0]).is_valid(2, 2));
        assert!(Chromosome::new(vec![1, 0, 0, 1]).is_valid(2, 2));
    }

    #[test]
    fn test_job_counts_out_of_range() {
        assert_eq!(Chromosome::new(vec![0, 3]).job_counts(2), None);
        assert_eq!(Chromosome::new(vec![1, 0, 1]).job_counts(2), Some(vec![1, 2]));
    }

    #[test]
    fn test_best_of_prefers_first_on_ties() {
        let population = vec![
            EvaluatedIndividual::new(Chromosome::new(vec![1, 0]), 9),
            EvaluatedIndividual::new(Chromosome::new(vec![0, 1]), 7),
            EvaluatedIndividual::new(Chromosome::new(vec![1, 1]), 7),
        ];
        assert_eq!(best_of(&population).unwrap().chromosome.genes(), &[0, 1]);
        assert!(best_of(&[]).is_none());
    }

    #[test]
    fn test_sorting_is_stable() {
        let mut population = vec![
            EvaluatedIndividual::new(Chromosome::new(vec![0]), 5),
            EvaluatedIndividual::new(Chromosome::new(vec![1]), 3),
            EvaluatedIndividual::new(Chromosome::new(vec![2]), 5),
        ];
        sort_ascending(&mut population);
        let order: Vec<_> = population.iter().map(|i| i.chromosome.genes()[0]).collect();
        assert_eq!(order, vec![1, 0, 2]);

        sort_descending(&mut population);
        let order: Vec<_> = population.iter().map(|i| i.chromosome.genes()[0]).collect();
        assert_eq!(order, vec![0, 2, 1]);
    }
}
