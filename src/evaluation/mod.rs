//! # Fitness Evaluation
//!
//! The fitness of a chromosome is its makespan, lower is better. The
//! [`FitnessEvaluator`] trait is the seam between the island loop and the
//! decoder; caches wrap it without changing results.
//!
//! ```rust
//! use islandga::chromosome::Chromosome;
//! use islandga::evaluation::FitnessEvaluator;
//! use islandga::instance::ProblemInstance;
//!
//! let instance = ProblemInstance::from_pairs(
//!     2,
//!     2,
//!     &[vec![(0, 3), (1, 2)], vec![(1, 2), (0, 4)]],
//! ).unwrap();
//! let makespan = instance.makespan(&Chromosome::new(vec![0, 1, 0, 1])).unwrap();
//! assert_eq!(makespan, 7);
//! ```

pub mod caching;
pub mod decoder;

use rayon::prelude::*;

use crate::chromosome::{Chromosome, EvaluatedIndividual, Makespan};
use crate::error::Result;
use crate::instance::ProblemInstance;

pub use caching::{CachedEvaluator, ThreadLocalCachedEvaluator};
pub use decoder::{decode, Schedule, ScheduledOperation};

/// Computes the makespan of a chromosome.
///
/// Implementations must be pure: the same chromosome always yields the same
/// makespan, which is what lets evaluation run in parallel and be cached.
pub trait FitnessEvaluator: Send + Sync {
    fn makespan(&self, chromosome: &Chromosome) -> Result<Makespan>;
}

impl FitnessEvaluator for ProblemInstance {
    fn makespan(&self, chromosome: &Chromosome) -> Result<Makespan> {
        decoder::makespan(chromosome.genes(), self)
    }
}

impl<E: FitnessEvaluator + ?Sized> FitnessEvaluator for &E {
    fn makespan(&self, chromosome: &Chromosome) -> Result<Makespan> {
        (**self).makespan(chromosome)
    }
}

impl<E: FitnessEvaluator + ?Sized> FitnessEvaluator for Box<E> {
    fn makespan(&self, chromosome: &Chromosome) -> Result<Makespan> {
        (**self).makespan(chromosome)
    }
}

/// Evaluates every chromosome, keeping the population order.
///
/// Populations of at least `parallel_threshold` chromosomes are evaluated with
/// rayon; the result is the same either way. The first failing chromosome
/// aborts the whole evaluation.
pub fn evaluate_population<E>(
    evaluator: &E,
    population: &[Chromosome],
    parallel_threshold: usize,
) -> Result<Vec<EvaluatedIndividual>>
where
    E: FitnessEvaluator + ?Sized,
{
    let evaluate_one = |chromosome: &Chromosome| {
        evaluator
            .makespan(chromosome)
            .map(|makespan| EvaluatedIndividual::new(chromosome.clone(), makespan))
    };

    if population.len() >= parallel_threshold {
        population.par_iter().map(evaluate_one).collect()
    } else {
        population.iter().map(evaluate_one).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeneticError;
    use crate::rng::RandomNumberGenerator;

    fn instance() -> ProblemInstance {
        ProblemInstance::from_pairs(
            3,
            2,
            &[
                vec![(0, 3), (1, 2)],
                vec![(1, 2), (0, 4)],
                vec![(0, 1), (1, 5)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let instance = instance();
        let mut rng = RandomNumberGenerator::from_seed(11);
        let population: Vec<_> = (0..64).map(|_| Chromosome::random(3, 2, &mut rng)).collect();

        let sequential = evaluate_population(&instance, &population, usize::MAX).unwrap();
        let parallel = evaluate_population(&instance, &population, 1).unwrap();

        assert_eq!(sequential, parallel);
        for (individual, chromosome) in sequential.iter().zip(&population) {
            assert_eq!(&individual.chromosome, chromosome);
        }
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let instance = instance();
        let mut rng = RandomNumberGenerator::from_seed(12);
        for _ in 0..20 {
            let chromosome = Chromosome::random(3, 2, &mut rng);
            assert_eq!(
                instance.makespan(&chromosome).unwrap(),
                instance.makespan(&chromosome).unwrap()
            );
        }
    }

    #[test]
    fn test_invalid_member_fails_population() {
        let instance = instance();
        let population = vec![
            Chromosome::base(3, 2),
            Chromosome::new(vec![0, 0, 0, 1, 1, 2]),
        ];
        let result = evaluate_population(&instance, &population, usize::MAX);
        assert!(matches!(result, Err(GeneticError::OperationIndexOverflow { .. })));
    }

    #[test]
    fn test_boxed_evaluator() {
        let boxed: Box<dyn FitnessEvaluator> = Box::new(instance());
        let evaluated = evaluate_population(&boxed, &[Chromosome::base(3, 2)], 10).unwrap();
        assert_eq!(evaluated.len(), 1);
    }
}
