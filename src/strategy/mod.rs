//! # BreedStrategy
//!
//! The `BreedStrategy` trait defines the interface for strategies responsible for
//! producing the next generation of an island from its evaluated population.
pub mod generational;

use std::fmt::Debug;

use crate::{
    chromosome::{Chromosome, EvaluatedIndividual},
    error::Result,
    evolution::options::IslandOptions,
    rng::RandomNumberGenerator,
};

/// # BreedStrategy
///
/// Implementors turn one evaluated generation into the chromosomes of the next.
pub trait BreedStrategy
where
    Self: Debug + Send + Sync,
{
    /// Breeds the next generation.
    ///
    /// ## Parameters
    ///
    /// - `population`: the current generation, sorted by ascending makespan.
    /// - `options`: the run configuration.
    /// - `rng`: the island's random number generator.
    ///
    /// ## Returns
    ///
    /// A population of the same size as `population`.
    ///
    /// ## Errors
    ///
    /// This method can fail if:
    /// - The population is empty or smaller than the tournament
    /// - Crossover receives parents that are not permutations of the same multiset
    fn breed(
        &self,
        population: &[EvaluatedIndividual],
        options: &IslandOptions,
        rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<Chromosome>>;
}

pub use generational::GenerationalStrategy;
