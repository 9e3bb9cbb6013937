use crate::chromosome::{Chromosome, EvaluatedIndividual};
use crate::error::{GeneticError, Result};
use crate::rng::RandomNumberGenerator;

/// A selection strategy that picks parents through tournaments.
///
/// Each tournament samples `tournament_size` distinct individuals uniformly at
/// random from the whole population and keeps the one with the lowest makespan.
/// Ties go to the participant drawn first. Running one tournament per population
/// member yields the parent pool, which may contain duplicates.
///
/// - Smaller tournament sizes lead to more exploration (more random selection)
/// - Larger tournament sizes lead to more exploitation (more focus on the best individuals)
///
/// # Examples
///
/// ```
/// use islandga::chromosome::{Chromosome, EvaluatedIndividual};
/// use islandga::rng::RandomNumberGenerator;
/// use islandga::selection::TournamentSelection;
///
/// let population = vec![
///     EvaluatedIndividual::new(Chromosome::new(vec![0, 1]), 9),
///     EvaluatedIndividual::new(Chromosome::new(vec![1, 0]), 4),
///     EvaluatedIndividual::new(Chromosome::new(vec![0, 1]), 6),
/// ];
///
/// // A tournament over the whole population always finds the best.
/// let selection = TournamentSelection::new(3).unwrap();
/// let mut rng = RandomNumberGenerator::from_seed(1);
/// let parents = selection.select(&population, &mut rng).unwrap();
///
/// assert_eq!(parents.len(), 3);
/// assert!(parents.iter().all(|p| p.genes() == [1, 0]));
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TournamentSelection {
    tournament_size: usize,
}

impl TournamentSelection {
    /// Creates a new TournamentSelection strategy with the specified tournament size.
    ///
    /// A tournament size of 1 is equivalent to uniform random selection.
    ///
    /// # Errors
    ///
    /// Returns an error if `tournament_size` is 0.
    pub fn new(tournament_size: usize) -> Result<Self> {
        if tournament_size < 1 {
            return Err(GeneticError::Configuration(
                "Tournament size must be at least 1".to_string(),
            ));
        }

        Ok(Self { tournament_size })
    }

    pub fn tournament_size(&self) -> usize {
        self.tournament_size
    }

    /// Runs a single tournament and returns the index of the winner.
    ///
    /// # Errors
    ///
    /// Returns an error if the population is empty or smaller than the tournament.
    pub fn run_tournament(
        &self,
        population: &[EvaluatedIndividual],
        rng: &mut RandomNumberGenerator,
    ) -> Result<usize> {
        if population.is_empty() {
            return Err(GeneticError::EmptyPopulation);
        }
        if self.tournament_size > population.len() {
            return Err(GeneticError::Configuration(format!(
                "Tournament size ({}) exceeds population size ({})",
                self.tournament_size,
                population.len()
            )));
        }

        let participants = rng.sample_indices(population.len(), self.tournament_size);

        let mut best_idx = participants[0];
        for &idx in &participants[1..] {
            if population[idx].makespan < population[best_idx].makespan {
                best_idx = idx;
            }
        }

        Ok(best_idx)
    }

    /// Runs `population.len()` tournaments and returns the winners' chromosomes.
    pub fn select(
        &self,
        population: &[EvaluatedIndividual],
        rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<Chromosome>> {
        (0..population.len())
            .map(|_| {
                self.run_tournament(population, rng)
                    .map(|winner| population[winner].chromosome.clone())
            })
            .collect()
    }
}

impl Default for TournamentSelection {
    fn default() -> Self {
        Self { tournament_size: 3 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn population(makespans: &[u64]) -> Vec<EvaluatedIndividual> {
        makespans
            .iter()
            .enumerate()
            .map(|(i, &m)| EvaluatedIndividual::new(Chromosome::new(vec![i]), m))
            .collect()
    }

    #[test]
    fn test_tournament_selection_size() {
        let population = population(&[5, 8, 3, 9, 1]);
        let selection = TournamentSelection::default();
        let mut rng = RandomNumberGenerator::from_seed(42);

        let selected = selection.select(&population, &mut rng).unwrap();
        assert_eq!(selected.len(), population.len());
    }

    #[test]
    fn test_tournament_of_one_returns_sampled_individual() {
        let population = population(&[7, 2, 5]);
        let selection = TournamentSelection::new(1).unwrap();

        let mut rng = RandomNumberGenerator::from_seed(7);
        let mut replay = rng.clone();

        let selected = selection.select(&population, &mut rng).unwrap();
        for chromosome in selected {
            let sampled = replay.sample_indices(population.len(), 1)[0];
            assert_eq!(chromosome, population[sampled].chromosome);
        }
    }

    #[test]
    fn test_full_tournament_picks_minimum() {
        let population = population(&[5, 8, 3, 9, 4]);
        let selection = TournamentSelection::new(5).unwrap();
        let mut rng = RandomNumberGenerator::from_seed(3);

        for _ in 0..20 {
            assert_eq!(selection.run_tournament(&population, &mut rng).unwrap(), 2);
        }
    }

    #[test]
    fn test_ties_go_to_first_drawn() {
        let population = population(&[4, 4, 4, 4]);
        let selection = TournamentSelection::new(3).unwrap();
        let mut rng = RandomNumberGenerator::from_seed(8);
        let mut replay = rng.clone();

        for _ in 0..20 {
            let winner = selection.run_tournament(&population, &mut rng).unwrap();
            let drawn = replay.sample_indices(population.len(), 3);
            assert_eq!(winner, drawn[0]);
        }
    }

    #[test]
    fn test_winner_never_worse_than_worst_k_minus_one() {
        // With k = 2 the global worst can never win a tournament.
        let population = population(&[1, 2, 3, 10]);
        let selection = TournamentSelection::new(2).unwrap();
        let mut rng = RandomNumberGenerator::from_seed(21);

        let selected = selection.select(&population, &mut rng).unwrap();
        assert!(selected.iter().all(|c| c.genes() != [3]));
    }

    #[test]
    fn test_tournament_selection_empty_population() {
        let selection = TournamentSelection::default();
        let mut rng = RandomNumberGenerator::from_seed(0);
        let result = selection.run_tournament(&[], &mut rng);
        assert!(matches!(result, Err(GeneticError::EmptyPopulation)));
        assert!(selection.select(&[], &mut rng).unwrap().is_empty());
    }

    #[test]
    fn test_tournament_larger_than_population() {
        let selection = TournamentSelection::new(4).unwrap();
        let mut rng = RandomNumberGenerator::from_seed(0);
        let result = selection.select(&population(&[1, 2]), &mut rng);
        assert!(matches!(result, Err(GeneticError::Configuration(_))));
    }

    #[test]
    fn test_tournament_selection_invalid_size() {
        assert!(TournamentSelection::new(0).is_err());
    }
}
