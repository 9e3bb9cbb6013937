//! # Migration
//!
//! Every `migration_frequency` generations each island sends copies of its best
//! individuals to a peer and replaces its worst individuals with what it
//! receives.
//!
//! - `RING`: island `r` sends to `r + 1` and receives from `r - 1` through one
//!   combined exchange.
//! - `RANDOM`: every island first announces its randomly chosen destination to
//!   all peers, so each one knows exactly which islands will send to it. It
//!   then receives from those islands, in rank order, and keeps the best
//!   `migration_count` immigrants.

use std::time::Duration;

use tracing::{debug, warn};

use super::options::{IslandOptions, MigrationTopology};
use crate::chromosome::{sort_ascending, sort_descending, EvaluatedIndividual};
use crate::comm::{Communicator, Payload, Source, Tag, TagKind};
use crate::error::Result;
use crate::rng::RandomNumberGenerator;

/// Who an island sends to and receives from in one migration round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPartners {
    pub destination: usize,
    /// Senders in rank order; empty when nobody picked this island.
    pub sources: Vec<usize>,
}

/// Returns `(destination, source)` of `rank` on a ring of `size` islands.
pub fn ring_neighbors(rank: usize, size: usize) -> (usize, usize) {
    ((rank + 1) % size, (rank + size - 1) % size)
}

#[derive(Debug, Clone)]
pub struct MigrationCoordinator {
    topology: MigrationTopology,
    migration_count: usize,
    timeout: Option<Duration>,
    options: IslandOptions,
}

impl MigrationCoordinator {
    pub fn new(options: &IslandOptions) -> Self {
        Self {
            topology: options.get_migration_topology(),
            migration_count: options.migration_count(),
            timeout: options.get_migration_timeout(),
            options: options.clone(),
        }
    }

    pub fn topology(&self) -> MigrationTopology {
        self.topology
    }

    pub fn migration_count(&self) -> usize {
        self.migration_count
    }

    /// Whether an island of a `size`-island run migrates after `generation`.
    pub fn should_migrate(&self, generation: usize, size: usize) -> bool {
        self.migration_count > 0 && size > 1 && self.options.is_migration_generation(generation)
    }

    /// The best `migration_count` individuals of a population sorted ascending.
    pub fn emigrants(&self, sorted: &[EvaluatedIndividual]) -> Vec<EvaluatedIndividual> {
        sorted.iter().take(self.migration_count).cloned().collect()
    }

    /// Resolves this round's partners, announcing the destination to every
    /// peer under `RANDOM`.
    pub fn resolve_partners<C: Communicator + ?Sized>(
        &self,
        comm: &mut C,
        epoch: usize,
        rng: &mut RandomNumberGenerator,
    ) -> Result<MigrationPartners> {
        let (rank, size) = (comm.rank(), comm.size());
        match self.topology {
            MigrationTopology::Ring => {
                let (destination, source) = ring_neighbors(rank, size);
                Ok(MigrationPartners {
                    destination,
                    sources: vec![source],
                })
            }
            MigrationTopology::Random => {
                let destination = rng
                    .index_other_than(size, rank)
                    .unwrap_or_else(|| ring_neighbors(rank, size).0);
                let tag = Tag::new(TagKind::Announce, epoch);

                for peer in (0..size).filter(|&peer| peer != rank) {
                    comm.send(peer, tag, Payload::Destination(destination))?;
                }

                let mut sources = Vec::new();
                for peer in (0..size).filter(|&peer| peer != rank) {
                    if let Some(payload) = self.receive_from(comm, peer, tag)? {
                        if payload.into_destination()? == rank {
                            sources.push(peer);
                        }
                    }
                }

                Ok(MigrationPartners {
                    destination,
                    sources,
                })
            }
        }
    }

    /// Sends `emigrants` to the destination and collects immigrants from every
    /// source, best first, capped at `migration_count`.
    pub fn exchange<C: Communicator + ?Sized>(
        &self,
        comm: &mut C,
        epoch: usize,
        partners: &MigrationPartners,
        emigrants: Vec<EvaluatedIndividual>,
    ) -> Result<Vec<EvaluatedIndividual>> {
        let tag = Tag::new(TagKind::Migration, epoch);

        let mut immigrants = match (partners.sources.as_slice(), self.timeout) {
            // The ring case is one symmetric exchange.
            ([source], None) => comm
                .exchange(partners.destination, *source, tag, Payload::Migrants(emigrants))?
                .into_migrants()?,
            _ => {
                comm.send(partners.destination, tag, Payload::Migrants(emigrants))?;
                let mut received = Vec::new();
                for &source in &partners.sources {
                    if let Some(payload) = self.receive_from(comm, source, tag)? {
                        received.extend(payload.into_migrants()?);
                    }
                }
                received
            }
        };

        if immigrants.len() > self.migration_count {
            sort_ascending(&mut immigrants);
            immigrants.truncate(self.migration_count);
        }
        Ok(immigrants)
    }

    /// Replaces the worst individuals with the immigrants.
    ///
    /// The population is left sorted worst first with the immigrants in front;
    /// its size never changes.
    pub fn integrate(
        &self,
        population: &mut [EvaluatedIndividual],
        immigrants: Vec<EvaluatedIndividual>,
    ) -> usize {
        sort_descending(population);
        let replaced = immigrants.len().min(population.len());
        for (slot, immigrant) in population.iter_mut().zip(immigrants) {
            *slot = immigrant;
        }
        replaced
    }

    /// Runs a full migration round on an evaluated population.
    ///
    /// Returns the number of individuals replaced.
    pub fn migrate<C: Communicator + ?Sized>(
        &self,
        comm: &mut C,
        generation: usize,
        population: &mut [EvaluatedIndividual],
        rng: &mut RandomNumberGenerator,
    ) -> Result<usize> {
        sort_ascending(population);
        let emigrants = self.emigrants(population);

        let partners = self.resolve_partners(comm, generation, rng)?;
        let immigrants = self.exchange(comm, generation, &partners, emigrants)?;
        let received = immigrants.len();
        let replaced = self.integrate(population, immigrants);

        debug!(
            generation,
            destination = partners.destination,
            sources = ?partners.sources,
            received,
            replaced,
            "Migration completed"
        );
        Ok(replaced)
    }

    fn receive_from<C: Communicator + ?Sized>(
        &self,
        comm: &mut C,
        source: usize,
        tag: Tag,
    ) -> Result<Option<Payload>> {
        match self.timeout {
            None => comm.receive(Source::Rank(source), tag).map(|(_, p)| Some(p)),
            Some(timeout) => {
                let received = comm.receive_timeout(Source::Rank(source), tag, timeout)?;
                if received.is_none() {
                    warn!(
                        rank = comm.rank(),
                        peer = source,
                        epoch = tag.epoch,
                        ?timeout,
                        "Migration peer did not answer in time, skipping it"
                    );
                }
                Ok(received.map(|(_, payload)| payload))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chromosome::Chromosome;
    use crate::comm::local_cluster;
    use std::thread;

    fn individual(gene: usize, makespan: u64) -> EvaluatedIndividual {
        EvaluatedIndividual::new(Chromosome::new(vec![gene]), makespan)
    }

    fn options(islands: usize, topology: MigrationTopology) -> IslandOptions {
        IslandOptions::builder()
            .num_islands(islands)
            .total_population_size(islands * 10)
            .migration_frequency(5)
            .migration_rate(0.2)
            .migration_topology(topology)
            .build()
            .unwrap()
    }

    #[test]
    fn test_ring_neighbors() {
        assert_eq!(ring_neighbors(0, 4), (1, 3));
        assert_eq!(ring_neighbors(3, 4), (0, 2));
        assert_eq!(ring_neighbors(0, 1), (0, 0));
    }

    #[test]
    fn test_should_migrate() {
        let coordinator = MigrationCoordinator::new(&options(2, MigrationTopology::Ring));
        assert!(!coordinator.should_migrate(0, 2));
        assert!(!coordinator.should_migrate(3, 2));
        assert!(coordinator.should_migrate(5, 2));
        assert!(!coordinator.should_migrate(5, 1));
    }

    #[test]
    fn test_emigrants_are_best() {
        let coordinator = MigrationCoordinator::new(&options(2, MigrationTopology::Ring));
        let mut population: Vec<_> = (0..10).map(|i| individual(i, 100 - i as u64)).collect();
        sort_ascending(&mut population);
        let emigrants = coordinator.emigrants(&population);
        assert_eq!(coordinator.migration_count(), 2);
        assert_eq!(emigrants.iter().map(|e| e.makespan).collect::<Vec<_>>(), vec![91, 92]);
    }

    #[test]
    fn test_integrate_replaces_worst() {
        let coordinator = MigrationCoordinator::new(&options(2, MigrationTopology::Ring));
        let mut population: Vec<_> = (0..5).map(|i| individual(i, 10 + i as u64)).collect();
        let replaced =
            coordinator.integrate(&mut population, vec![individual(90, 1), individual(91, 2)]);

        assert_eq!(replaced, 2);
        assert_eq!(population.len(), 5);
        let makespans: Vec<_> = population.iter().map(|p| p.makespan).collect();
        assert_eq!(makespans, vec![1, 2, 12, 11, 10]);
    }

    #[test]
    fn test_integrate_more_immigrants_than_population() {
        let coordinator = MigrationCoordinator::new(&options(2, MigrationTopology::Ring));
        let mut population = vec![individual(0, 5)];
        let replaced =
            coordinator.integrate(&mut population, vec![individual(1, 1), individual(2, 2)]);
        assert_eq!(replaced, 1);
        assert_eq!(population, vec![individual(1, 1)]);
    }

    fn run_round(topology: MigrationTopology, islands: usize) -> Vec<(usize, Vec<EvaluatedIndividual>)> {
        let opts = options(islands, topology);
        let handles: Vec<_> = local_cluster(islands)
            .into_iter()
            .map(|mut comm| {
                let coordinator = MigrationCoordinator::new(&opts);
                thread::spawn(move || {
                    let rank = comm.rank();
                    let mut rng = RandomNumberGenerator::from_seed(rank as u64);
                    let mut population: Vec<_> = (0..10)
                        .map(|i| individual(rank, (rank * 100 + i) as u64))
                        .collect();
                    coordinator.migrate(&mut comm, 5, &mut population, &mut rng).unwrap();
                    (rank, population)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    }

    #[test]
    fn test_ring_round_with_odd_island_count() {
        for (rank, population) in run_round(MigrationTopology::Ring, 3) {
            let source = (rank + 2) % 3;
            assert_eq!(population.len(), 10);
            let foreign: Vec<_> = population.iter().filter(|p| p.chromosome.genes() != [rank]).collect();
            assert_eq!(foreign.len(), 2);
            assert!(foreign.iter().all(|p| p.chromosome.genes() == [source]));
        }
    }

    #[test]
    fn test_random_round_replaces_at_most_count() {
        for (rank, population) in run_round(MigrationTopology::Random, 5) {
            assert_eq!(population.len(), 10);
            let foreign = population.iter().filter(|p| p.chromosome.genes() != [rank]).count();
            assert!(foreign <= 2);
        }
    }
}
