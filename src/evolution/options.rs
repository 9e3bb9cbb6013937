//! # IslandOptions
//!
//! The `IslandOptions` struct is the immutable configuration of a run. It is
//! built once, validated once, and handed by reference to every island; there
//! is no process-wide settings state.
//!
//! ## Example
//!
//! ```rust
//! use islandga::evolution::options::{IslandOptions, MigrationTopology};
//!
//! let options = IslandOptions::builder()
//!     .num_islands(4)
//!     .total_population_size(200)
//!     .num_generations(50)
//!     .migration_frequency(10)
//!     .migration_rate(0.1)
//!     .migration_topology(MigrationTopology::Ring)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(options.sub_population_size(), 50);
//! assert_eq!(options.migration_count(), 5);
//!
//! // 10 individuals cannot be split across 4 islands.
//! assert!(IslandOptions::builder()
//!     .num_islands(4)
//!     .total_population_size(10)
//!     .build()
//!     .is_err());
//! ```
//!
//! ## Derived values
//!
//! - `sub_population_size = total_population_size / num_islands`
//! - `migration_count = max(1, round(sub_population_size * migration_rate))`,
//!   or 0 when `migration_rate` is 0 (migration disabled).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{GeneticError, Result};

/// Which islands exchange individuals with which.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MigrationTopology {
    /// Island `r` sends to `r + 1` and receives from `r - 1` (mod size).
    #[default]
    Ring,
    /// Island `r` sends to a random other island and receives from every
    /// island that picked it.
    Random,
}

impl fmt::Display for MigrationTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationTopology::Ring => write!(f, "RING"),
            MigrationTopology::Random => write!(f, "RANDOM"),
        }
    }
}

impl FromStr for MigrationTopology {
    type Err = GeneticError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RING" => Ok(MigrationTopology::Ring),
            "RANDOM" => Ok(MigrationTopology::Random),
            other => Err(GeneticError::Configuration(format!(
                "Unknown migration topology '{}', expected RING or RANDOM",
                other
            ))),
        }
    }
}

/// Makespan caching used by each island's evaluator.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheType {
    #[default]
    None,
    /// One cache per island shared by its evaluation threads.
    Global,
    /// One cache per evaluation thread.
    ThreadLocal,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct IslandOptions {
    num_islands: usize,
    total_population_size: usize,
    num_generations: usize,
    crossover_rate: f64,
    mutation_rate: f64,
    tournament_size: usize,
    elitism_count: usize,
    migration_frequency: usize,
    migration_rate: f64,
    migration_topology: MigrationTopology,
    /// Island `r` seeds its generator with `seed + r`.
    seed: u64,
    /// Minimum population size evaluated in parallel
    parallel_threshold: usize,
    cache_type: CacheType,
    /// Upper bound on waiting for a migration peer; `None` waits forever.
    migration_timeout: Option<Duration>,
}

impl IslandOptions {
    /// Creates validated options with the core GA parameters; the remaining
    /// fields take their defaults.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        num_islands: usize,
        total_population_size: usize,
        num_generations: usize,
        crossover_rate: f64,
        mutation_rate: f64,
        tournament_size: usize,
        elitism_count: usize,
        migration_frequency: usize,
        migration_rate: f64,
        migration_topology: MigrationTopology,
    ) -> Result<Self> {
        Self::builder()
            .num_islands(num_islands)
            .total_population_size(total_population_size)
            .num_generations(num_generations)
            .crossover_rate(crossover_rate)
            .mutation_rate(mutation_rate)
            .tournament_size(tournament_size)
            .elitism_count(elitism_count)
            .migration_frequency(migration_frequency)
            .migration_rate(migration_rate)
            .migration_topology(migration_topology)
            .build()
    }

    /// Returns a builder for creating an `IslandOptions` instance.
    pub fn builder() -> IslandOptionsBuilder {
        IslandOptionsBuilder::default()
    }

    /// Checks every constraint the island model relies on.
    pub fn validate(&self) -> Result<()> {
        let config_err = |msg: String| Err(GeneticError::Configuration(msg));

        if self.num_islands == 0 {
            return config_err("Number of islands must be at least 1".to_string());
        }
        if self.total_population_size % self.num_islands != 0 {
            return config_err(format!(
                "Total population size ({}) must be divisible by the number of islands ({})",
                self.total_population_size, self.num_islands
            ));
        }
        let sub = self.sub_population_size();
        if sub < 2 {
            return config_err(format!(
                "Each island needs at least 2 individuals, got {}",
                sub
            ));
        }
        for (name, rate) in [
            ("Crossover rate", self.crossover_rate),
            ("Mutation rate", self.mutation_rate),
            ("Migration rate", self.migration_rate),
        ] {
            if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
                return config_err(format!("{} must be within [0, 1], got {}", name, rate));
            }
        }
        if self.tournament_size < 1 || self.tournament_size > sub {
            return config_err(format!(
                "Tournament size ({}) must be within [1, {}]",
                self.tournament_size, sub
            ));
        }
        if self.elitism_count > sub {
            return config_err(format!(
                "Elitism count ({}) exceeds the sub-population size ({})",
                self.elitism_count, sub
            ));
        }
        if self.migration_frequency == 0 {
            return config_err("Migration frequency must be at least 1".to_string());
        }
        if self.migration_count() > sub {
            return config_err(format!(
                "Migration count ({}) exceeds the sub-population size ({})",
                self.migration_count(),
                sub
            ));
        }
        Ok(())
    }

    pub fn get_num_islands(&self) -> usize {
        self.num_islands
    }

    pub fn get_total_population_size(&self) -> usize {
        self.total_population_size
    }

    pub fn get_num_generations(&self) -> usize {
        self.num_generations
    }

    pub fn get_crossover_rate(&self) -> f64 {
        self.crossover_rate
    }

    pub fn get_mutation_rate(&self) -> f64 {
        self.mutation_rate
    }

    pub fn get_tournament_size(&self) -> usize {
        self.tournament_size
    }

    pub fn get_elitism_count(&self) -> usize {
        self.elitism_count
    }

    pub fn get_migration_frequency(&self) -> usize {
        self.migration_frequency
    }

    pub fn get_migration_rate(&self) -> f64 {
        self.migration_rate
    }

    pub fn get_migration_topology(&self) -> MigrationTopology {
        self.migration_topology
    }

    pub fn get_seed(&self) -> u64 {
        self.seed
    }

    /// Returns the minimum number of chromosomes evaluated in parallel.
    pub fn get_parallel_threshold(&self) -> usize {
        self.parallel_threshold
    }

    pub fn get_cache_type(&self) -> CacheType {
        self.cache_type
    }

    pub fn get_migration_timeout(&self) -> Option<Duration> {
        self.migration_timeout
    }

    /// Individuals per island.
    pub fn sub_population_size(&self) -> usize {
        if self.num_islands == 0 {
            return 0;
        }
        self.total_population_size / self.num_islands
    }

    /// Emigrants sent per migration.
    pub fn migration_count(&self) -> usize {
        if self.migration_rate <= 0.0 {
            return 0;
        }
        let raw = (self.sub_population_size() as f64 * self.migration_rate).round() as usize;
        raw.max(1)
    }

    /// Generator seed of island `rank`.
    pub fn island_seed(&self, rank: usize) -> u64 {
        self.seed.wrapping_add(rank as u64)
    }

    /// Whether migration happens after evolving `generation`.
    pub fn is_migration_generation(&self, generation: usize) -> bool {
        generation > 0
            && self.migration_frequency > 0
            && generation % self.migration_frequency == 0
    }
}

impl Default for IslandOptions {
    fn default() -> Self {
        Self {
            num_islands: 4,
            total_population_size: 512,
            num_generations: 200,
            crossover_rate: 0.8,
            mutation_rate: 0.2,
            tournament_size: 3,
            elitism_count: 2,
            migration_frequency: 25,
            migration_rate: 0.10,
            migration_topology: MigrationTopology::Ring,
            seed: 0,
            parallel_threshold: 1000,
            cache_type: CacheType::None,
            migration_timeout: None,
        }
    }
}

/// Builder for `IslandOptions`.
///
/// Unset fields fall back to [`IslandOptions::default`]; `build` validates.
#[derive(Debug, Clone, Default)]
pub struct IslandOptionsBuilder {
    num_islands: Option<usize>,
    total_population_size: Option<usize>,
    num_generations: Option<usize>,
    crossover_rate: Option<f64>,
    mutation_rate: Option<f64>,
    tournament_size: Option<usize>,
    elitism_count: Option<usize>,
    migration_frequency: Option<usize>,
    migration_rate: Option<f64>,
    migration_topology: Option<MigrationTopology>,
    seed: Option<u64>,
    parallel_threshold: Option<usize>,
    cache_type: Option<CacheType>,
    migration_timeout: Option<Duration>,
}

impl IslandOptionsBuilder {
    pub fn num_islands(mut self, value: usize) -> Self {
        self.num_islands = Some(value);
        self
    }

    pub fn total_population_size(mut self, value: usize) -> Self {
        self.total_population_size = Some(value);
        self
    }

    pub fn num_generations(mut self, value: usize) -> Self {
        self.num_generations = Some(value);
        self
    }

    pub fn crossover_rate(mut self, value: f64) -> Self {
        self.crossover_rate = Some(value);
        self
    }

    pub fn mutation_rate(mut self, value: f64) -> Self {
        self.mutation_rate = Some(value);
        self
    }

    pub fn tournament_size(mut self, value: usize) -> Self {
        self.tournament_size = Some(value);
        self
    }

    pub fn elitism_count(mut self, value: usize) -> Self {
        self.elitism_count = Some(value);
        self
    }

    pub fn migration_frequency(mut self, value: usize) -> Self {
        self.migration_frequency = Some(value);
        self
    }

    pub fn migration_rate(mut self, value: f64) -> Self {
        self.migration_rate = Some(value);
        self
    }

    pub fn migration_topology(mut self, value: MigrationTopology) -> Self {
        self.migration_topology = Some(value);
        self
    }

    pub fn seed(mut self, value: u64) -> Self {
        self.seed = Some(value);
        self
    }

    pub fn parallel_threshold(mut self, value: usize) -> Self {
        self.parallel_threshold = Some(value);
        self
    }

    pub fn cache_type(mut self, value: CacheType) -> Self {
        self.cache_type = Some(value);
        self
    }

    pub fn migration_timeout(mut self, value: Duration) -> Self {
        self.migration_timeout = Some(value);
        self
    }

    /// Builds and validates the `IslandOptions` instance.
    pub fn build(self) -> Result<IslandOptions> {
        let default = IslandOptions::default();
        let options = IslandOptions {
            num_islands: self.num_islands.unwrap_or(default.num_islands),
            total_population_size: self
                .total_population_size
                .unwrap_or(default.total_population_size),
            num_generations: self.num_generations.unwrap_or(default.num_generations),
            crossover_rate: self.crossover_rate.unwrap_or(default.crossover_rate),
            mutation_rate: self.mutation_rate.unwrap_or(default.mutation_rate),
            tournament_size: self.tournament_size.unwrap_or(default.tournament_size),
            elitism_count: self.elitism_count.unwrap_or(default.elitism_count),
            migration_frequency: self
                .migration_frequency
                .unwrap_or(default.migration_frequency),
            migration_rate: self.migration_rate.unwrap_or(default.migration_rate),
            migration_topology: self
                .migration_topology
                .unwrap_or(default.migration_topology),
            seed: self.seed.unwrap_or(default.seed),
            parallel_threshold: self
                .parallel_threshold
                .unwrap_or(default.parallel_threshold),
            cache_type: self.cache_type.unwrap_or(default.cache_type),
            migration_timeout: self.migration_timeout.or(default.migration_timeout),
        };
        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let options = IslandOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.sub_population_size(), 128);
        // round(128 * 0.1) = 13
        assert_eq!(options.migration_count(), 13);
    }

    #[test]
    fn test_migration_count_clamped_to_one() {
        let options = IslandOptions::builder()
            .num_islands(2)
            .total_population_size(8)
            .migration_rate(0.01)
            .build()
            .unwrap();
        assert_eq!(options.migration_count(), 1);
    }

    #[test]
    fn test_zero_migration_rate_disables_migration() {
        let options = IslandOptions::builder().migration_rate(0.0).build().unwrap();
        assert_eq!(options.migration_count(), 0);
    }

    #[test]
    fn test_rejects_indivisible_population() {
        let result = IslandOptions::builder()
            .num_islands(3)
            .total_population_size(512)
            .build();
        match result {
            Err(GeneticError::Configuration(msg)) => assert!(msg.contains("divisible")),
            other => panic!("Expected Configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(IslandOptions::builder().num_islands(0).build().is_err());
        assert!(IslandOptions::builder().crossover_rate(1.5).build().is_err());
        assert!(IslandOptions::builder().mutation_rate(f64::NAN).build().is_err());
        assert!(IslandOptions::builder().tournament_size(0).build().is_err());
        assert!(IslandOptions::builder().tournament_size(129).build().is_err());
        assert!(IslandOptions::builder().elitism_count(129).build().is_err());
        assert!(IslandOptions::builder().migration_frequency(0).build().is_err());
        assert!(IslandOptions::builder()
            .num_islands(4)
            .total_population_size(4)
            .build()
            .is_err());
    }

    #[test]
    fn test_new_validates() {
        let options = IslandOptions::new(2, 20, 10, 0.9, 0.1, 2, 1, 5, 0.2, MigrationTopology::Random)
            .unwrap();
        assert_eq!(options.sub_population_size(), 10);
        assert_eq!(options.migration_count(), 2);
        assert_eq!(options.get_migration_topology(), MigrationTopology::Random);
    }

    #[test]
    fn test_topology_parsing() {
        assert_eq!("RING".parse::<MigrationTopology>().unwrap(), MigrationTopology::Ring);
        assert_eq!("random".parse::<MigrationTopology>().unwrap(), MigrationTopology::Random);
        assert!(matches!(
            "STAR".parse::<MigrationTopology>(),
            Err(GeneticError::Configuration(_))
        ));
        assert_eq!(MigrationTopology::Random.to_string(), "RANDOM");
    }

    #[test]
    fn test_migration_schedule() {
        let options = IslandOptions::builder().migration_frequency(25).build().unwrap();
        assert!(!options.is_migration_generation(0));
        assert!(!options.is_migration_generation(24));
        assert!(options.is_migration_generation(25));
        assert!(options.is_migration_generation(50));
    }

    #[test]
    fn test_island_seeds_are_distinct() {
        let options = IslandOptions::builder().seed(100).build().unwrap();
        assert_eq!(options.island_seed(0), 100);
        assert_eq!(options.island_seed(3), 103);
    }
}
