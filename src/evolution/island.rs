//! # Island
//!
//! One island evolves its own sub-population through the states
//!
//! ```text
//! Seeding -> Evaluating -> Evolving -> (Migrating) -> Evaluating -> ... -> Terminated
//! ```
//!
//! Each call to [`Island::step`] performs exactly one state. A generation is
//! one `Evaluating` plus one `Evolving` step, followed by `Migrating` on
//! migration generations. Islands only interact with each other inside
//! `Migrating` and in the final aggregation done by [`Island::run`].

use tracing::{debug, error, info, info_span};

use super::aggregate::{aggregate, GlobalBest};
use super::migration::MigrationCoordinator;
use super::options::{CacheType, IslandOptions};
use crate::chromosome::{sort_ascending, Chromosome, EvaluatedIndividual, Makespan};
use crate::comm::Communicator;
use crate::error::{GeneticError, Result};
use crate::evaluation::{
    evaluate_population, CachedEvaluator, FitnessEvaluator, ThreadLocalCachedEvaluator,
};
use crate::instance::ProblemInstance;
use crate::rng::RandomNumberGenerator;
use crate::strategy::{BreedStrategy, GenerationalStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IslandState {
    Seeding,
    Evaluating,
    Evolving,
    Migrating,
    Terminated,
}

/// What an island hands back at the end of a run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct IslandReport {
    pub rank: usize,
    pub best: Option<EvaluatedIndividual>,
    /// Best-so-far makespan after each generation's evaluation.
    pub history: Vec<Makespan>,
    pub migrations: usize,
}

/// The result of [`Island::run`]. `global` is only set on the root island.
#[derive(Debug, Clone, PartialEq)]
pub struct IslandOutcome {
    pub report: IslandReport,
    pub global: Option<Option<GlobalBest>>,
}

pub struct Island<'a, C: Communicator> {
    rank: usize,
    options: &'a IslandOptions,
    instance: &'a ProblemInstance,
    evaluator: Box<dyn FitnessEvaluator + 'a>,
    strategy: GenerationalStrategy,
    migration: MigrationCoordinator,
    comm: C,
    rng: RandomNumberGenerator,
    state: IslandState,
    generation: usize,
    population: Vec<Chromosome>,
    evaluated: Vec<EvaluatedIndividual>,
    best: Option<EvaluatedIndividual>,
    history: Vec<Makespan>,
    migrations: usize,
}

impl<'a, C: Communicator> Island<'a, C> {
    /// Creates the island owning `comm`.
    ///
    /// # Errors
    ///
    /// `Configuration` if the options are invalid or the runtime size differs
    /// from the configured number of islands.
    pub fn new(options: &'a IslandOptions, instance: &'a ProblemInstance, comm: C) -> Result<Self> {
        options.validate()?;
        if comm.size() != options.get_num_islands() {
            return Err(GeneticError::Configuration(format!(
                "Runtime has {} islands but {} are configured",
                comm.size(),
                options.get_num_islands()
            )));
        }

        let rank = comm.rank();
        let evaluator: Box<dyn FitnessEvaluator + 'a> = match options.get_cache_type() {
            CacheType::None => Box::new(instance),
            CacheType::Global => Box::new(CachedEvaluator::new(instance)),
            CacheType::ThreadLocal => Box::new(ThreadLocalCachedEvaluator::new(instance)),
        };

        Ok(Self {
            rank,
            options,
            instance,
            evaluator,
            strategy: GenerationalStrategy::from_options(options, instance.num_jobs())?,
            migration: MigrationCoordinator::new(options),
            comm,
            rng: RandomNumberGenerator::from_seed(options.island_seed(rank)),
            state: IslandState::Seeding,
            generation: 0,
            population: Vec::new(),
            evaluated: Vec::new(),
            best: None,
            history: Vec::new(),
            migrations: 0,
        })
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn state(&self) -> IslandState {
        self.state
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn population(&self) -> &[Chromosome] {
        &self.population
    }

    /// The last evaluated generation, sorted best first.
    pub fn evaluated(&self) -> &[EvaluatedIndividual] {
        &self.evaluated
    }

    pub fn best(&self) -> Option<&EvaluatedIndividual> {
        self.best.as_ref()
    }

    pub fn history(&self) -> &[Makespan] {
        &self.history
    }

    /// Performs the current state and returns the next one.
    pub fn step(&mut self) -> Result<IslandState> {
        match self.state {
            IslandState::Seeding => self.seed(),
            IslandState::Evaluating => self.evaluate()?,
            IslandState::Evolving => self.evolve()?,
            IslandState::Migrating => self.migrate()?,
            IslandState::Terminated => {}
        }
        Ok(self.state)
    }

    fn seed(&mut self) {
        let (jobs, machines) = (self.instance.num_jobs(), self.instance.num_machines());
        self.population = (0..self.options.sub_population_size())
            .map(|_| Chromosome::random(jobs, machines, &mut self.rng))
            .collect();
        debug!(size = self.population.len(), "Seeded population");

        self.state = if self.options.get_num_generations() == 0 {
            IslandState::Terminated
        } else {
            IslandState::Evaluating
        };
    }

    fn evaluate(&mut self) -> Result<()> {
        let mut evaluated = self.evaluate_current()?;
        sort_ascending(&mut evaluated);

        if let Some(candidate) = evaluated.first() {
            let improved = self
                .best
                .as_ref()
                .map_or(true, |best| candidate.makespan < best.makespan);
            if improved {
                info!(
                    generation = self.generation,
                    makespan = candidate.makespan,
                    "New island best"
                );
                self.best = Some(candidate.clone());
            }
        }
        if let Some(best) = &self.best {
            self.history.push(best.makespan);
        }
        debug!(
            generation = self.generation,
            generation_best = ?evaluated.first().map(|e| e.makespan),
            best = ?self.best.as_ref().map(|b| b.makespan),
            "Evaluated generation"
        );

        self.evaluated = evaluated;
        self.state = IslandState::Evolving;
        Ok(())
    }

    fn evolve(&mut self) -> Result<()> {
        self.population = self
            .strategy
            .breed(&self.evaluated, self.options, &mut self.rng)?;

        if self.migration.should_migrate(self.generation, self.comm.size()) {
            self.state = IslandState::Migrating;
        } else {
            self.advance();
        }
        Ok(())
    }

    fn migrate(&mut self) -> Result<()> {
        let mut fresh = self.evaluate_current()?;
        self.migration
            .migrate(&mut self.comm, self.generation, &mut fresh, &mut self.rng)?;
        self.population = fresh.into_iter().map(|e| e.chromosome).collect();
        self.migrations += 1;
        self.advance();
        Ok(())
    }

    fn advance(&mut self) {
        self.generation += 1;
        self.state = if self.generation >= self.options.get_num_generations() {
            IslandState::Terminated
        } else {
            IslandState::Evaluating
        };
    }

    fn evaluate_current(&self) -> Result<Vec<EvaluatedIndividual>> {
        evaluate_population(
            &*self.evaluator,
            &self.population,
            self.options.get_parallel_threshold(),
        )
        .map_err(|e| {
            if let Some(offender) = self
                .population
                .iter()
                .find(|c| self.evaluator.makespan(c).is_err())
            {
                error!(generation = self.generation, genes = ?offender.genes(), "Offending chromosome");
            }
            e
        })
    }

    /// Runs every generation, then takes part in the final aggregation.
    ///
    /// On failure the island notifies its peers before returning the error
    /// wrapped with its rank and generation.
    pub fn run(mut self) -> Result<IslandOutcome> {
        let span = info_span!("island", rank = self.rank);
        let _enter = span.enter();

        if let Err(e) = self.run_generations() {
            return Err(self.fail(e));
        }

        let epoch = self.options.get_num_generations();
        let global = match aggregate(&mut self.comm, epoch, self.best.clone()) {
            Ok(global) => global,
            Err(e) => return Err(self.fail(e)),
        };

        info!(
            best = ?self.best.as_ref().map(|b| b.makespan),
            migrations = self.migrations,
            "Island finished"
        );
        Ok(IslandOutcome {
            report: IslandReport {
                rank: self.rank,
                best: self.best,
                history: self.history,
                migrations: self.migrations,
            },
            global,
        })
    }

    fn run_generations(&mut self) -> Result<()> {
        while self.step()? != IslandState::Terminated {}
        Ok(())
    }

    fn fail(&mut self, source: GeneticError) -> GeneticError {
        if source.is_secondary() {
            debug!(generation = self.generation, error = %source, "Stopping after peer failure");
        } else {
            error!(generation = self.generation, error = %source, "Island aborted");
        }
        self.comm.abort();
        GeneticError::Island {
            rank: self.rank,
            generation: self.generation,
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::local_cluster;

    fn instance() -> ProblemInstance {
        ProblemInstance::from_pairs(
            3,
            3,
            &[
                vec![(0, 3), (1, 2), (2, 2)],
                vec![(0, 2), (2, 1), (1, 4)],
                vec![(1, 4), (2, 3), (0, 1)],
            ],
        )
        .unwrap()
    }

    fn single_island_options(generations: usize) -> IslandOptions {
        IslandOptions::builder()
            .num_islands(1)
            .total_population_size(20)
            .num_generations(generations)
            .seed(3)
            .build()
            .unwrap()
    }

    #[test]
    fn test_state_sequence() {
        let options = single_island_options(2);
        let instance = instance();
        let comm = local_cluster(1).pop().unwrap();
        let mut island = Island::new(&options, &instance, comm).unwrap();

        assert_eq!(island.state(), IslandState::Seeding);
        assert_eq!(island.step().unwrap(), IslandState::Evaluating);
        assert_eq!(island.population().len(), 20);
        assert_eq!(island.step().unwrap(), IslandState::Evolving);
        assert_eq!(island.step().unwrap(), IslandState::Evaluating);
        assert_eq!(island.generation(), 1);
        assert_eq!(island.step().unwrap(), IslandState::Evolving);
        assert_eq!(island.step().unwrap(), IslandState::Terminated);
        assert_eq!(island.step().unwrap(), IslandState::Terminated);
        assert_eq!(island.history().len(), 2);
    }

    #[test]
    fn test_best_never_gets_worse() {
        let options = single_island_options(15);
        let instance = instance();
        let comm = local_cluster(1).pop().unwrap();
        let outcome = Island::new(&options, &instance, comm).unwrap().run().unwrap();

        let history = &outcome.report.history;
        assert_eq!(history.len(), 15);
        assert!(history.windows(2).all(|w| w[1] <= w[0]));
        let best = outcome.report.best.unwrap();
        assert_eq!(best.makespan, *history.last().unwrap());
        assert!(best.makespan >= instance.lower_bound());

        let global = outcome.global.unwrap().unwrap();
        assert_eq!(global.island, 0);
        assert_eq!(global.individual.makespan, best.makespan);
    }

    #[test]
    fn test_zero_generations_reports_no_solution() {
        let options = single_island_options(0);
        let instance = instance();
        let comm = local_cluster(1).pop().unwrap();
        let outcome = Island::new(&options, &instance, comm).unwrap().run().unwrap();

        assert!(outcome.report.best.is_none());
        assert_eq!(outcome.global, Some(None));
    }

    #[test]
    fn test_size_mismatch_is_configuration_error() {
        let options = IslandOptions::builder()
            .num_islands(2)
            .total_population_size(20)
            .build()
            .unwrap();
        let instance = instance();
        let comm = local_cluster(1).pop().unwrap();
        assert!(matches!(
            Island::new(&options, &instance, comm),
            Err(GeneticError::Configuration(_))
        ));
    }

    #[test]
    fn test_cached_evaluators_match_uncached_run() {
        let instance = instance();
        let run = |cache_type| {
            let options = IslandOptions::builder()
                .num_islands(1)
                .total_population_size(20)
                .num_generations(5)
                .seed(9)
                .cache_type(cache_type)
                .build()
                .unwrap();
            let comm = local_cluster(1).pop().unwrap();
            Island::new(&options, &instance, comm).unwrap().run().unwrap().report
        };

        let plain = run(CacheType::None);
        assert_eq!(plain, run(CacheType::Global));
        assert_eq!(plain, run(CacheType::ThreadLocal));
    }
}
