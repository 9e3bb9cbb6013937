use tracing::trace;

use super::BreedStrategy;
use crate::{
    chromosome::{Chromosome, EvaluatedIndividual},
    error::{GeneticError, Result},
    evolution::options::IslandOptions,
    operators::{job_based_crossover, swap_mutation},
    rng::RandomNumberGenerator,
    selection::TournamentSelection,
};

/// # GenerationalStrategy
///
/// Builds the next generation in three steps:
///
/// 1. The best `elitism_count` individuals are copied unchanged.
/// 2. A parent pool is drawn with one tournament per population member.
/// 3. Each remaining slot gets a child of two distinct pool members: JBX with
///    probability `crossover_rate` (otherwise a clone of the first parent),
///    followed by a swap mutation with probability `mutation_rate`.
///
/// The population size never changes.
#[derive(Debug, Clone)]
pub struct GenerationalStrategy {
    selection: TournamentSelection,
    num_jobs: usize,
}

impl GenerationalStrategy {
    pub fn new(tournament_size: usize, num_jobs: usize) -> Result<Self> {
        Ok(Self {
            selection: TournamentSelection::new(tournament_size)?,
            num_jobs,
        })
    }

    pub fn from_options(options: &IslandOptions, num_jobs: usize) -> Result<Self> {
        Self::new(options.get_tournament_size(), num_jobs)
    }

    pub fn num_jobs(&self) -> usize {
        self.num_jobs
    }

    fn offspring(
        &self,
        pool: &[Chromosome],
        options: &IslandOptions,
        rng: &mut RandomNumberGenerator,
    ) -> Result<Chromosome> {
        let picks = rng.sample_indices(pool.len(), 2);
        let (first, second) = match picks.as_slice() {
            [a, b] => (&pool[*a], &pool[*b]),
            // a pool of one breeds with itself
            _ => (&pool[0], &pool[0]),
        };

        let mut child = if rng.chance(options.get_crossover_rate()) {
            job_based_crossover(first, second, self.num_jobs, rng)?
        } else {
            first.clone()
        };

        if rng.chance(options.get_mutation_rate()) {
            swap_mutation(&mut child, rng);
        }

        Ok(child)
    }
}

impl BreedStrategy for GenerationalStrategy {
    fn breed(
        &self,
        population: &[EvaluatedIndividual],
        options: &IslandOptions,
        rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<Chromosome>> {
        if population.is_empty() {
            return Err(GeneticError::EmptyPopulation);
        }

        let size = population.len();
        let elites = options.get_elitism_count().min(size);

        let mut next: Vec<Chromosome> = population
            .iter()
            .take(elites)
            .map(|individual| individual.chromosome.clone())
            .collect();

        if next.len() < size {
            let pool = self.selection.select(population, rng)?;
            while next.len() < size {
                next.push(self.offspring(&pool, options, rng)?);
            }
        }

        trace!(elites, offspring = size - elites, "Bred next generation");
        Ok(next)
    }
}
