use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{error, info};

use super::aggregate::GlobalBest;
use super::island::{Island, IslandOutcome, IslandReport};
use super::options::IslandOptions;
use crate::comm::{local_cluster, AbortHandle};
use crate::error::{GeneticError, OptionExt, Result};
use crate::instance::ProblemInstance;

/// Represents the result of a run across all islands.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// The global best, `None` if no island evaluated anything.
    pub best: Option<GlobalBest>,
    /// One report per island, in rank order.
    pub islands: Vec<IslandReport>,
    pub elapsed: Duration,
}

/// Runs one island per OS thread over an in-process message-passing cluster.
#[derive(Debug, Clone)]
pub struct IslandLauncher {
    options: IslandOptions,
    instance: ProblemInstance,
}

impl IslandLauncher {
    pub fn new(options: IslandOptions, instance: ProblemInstance) -> Self {
        Self { options, instance }
    }

    pub fn options(&self) -> &IslandOptions {
        &self.options
    }

    pub fn instance(&self) -> &ProblemInstance {
        &self.instance
    }

    /// Evolves every island to completion and reduces their results.
    ///
    /// # Errors
    ///
    /// - `Configuration` if the options are invalid.
    /// - `Island { .. }` wrapping the first failure that was not merely a
    ///   reaction to another island aborting.
    /// - `Io` if an island thread cannot be spawned.
    pub fn launch(&self) -> Result<RunSummary> {
        self.options.validate()?;

        let num_islands = self.options.get_num_islands();
        info!(
            islands = num_islands,
            population = self.options.get_total_population_size(),
            generations = self.options.get_num_generations(),
            topology = %self.options.get_migration_topology(),
            jobs = self.instance.num_jobs(),
            machines = self.instance.num_machines(),
            "Starting island model"
        );

        let start = Instant::now();
        let islands = local_cluster(num_islands)
            .into_iter()
            .map(|comm| {
                let abort = comm.abort_handle();
                Island::new(&self.options, &self.instance, comm).map(|island| (island, abort))
            })
            .collect::<Result<Vec<_>>>()?;

        let results = thread::scope(|scope| -> Result<Vec<Result<IslandOutcome>>> {
            let mut handles = Vec::with_capacity(islands.len());
            for (island, abort) in islands {
                let rank = island.rank();
                let handle = thread::Builder::new()
                    .name(format!("island-{}", rank))
                    .spawn_scoped(scope, move || run_guarded(&abort, move || island.run()))?;
                handles.push((rank, handle));
            }
            Ok(handles
                .into_iter()
                .map(|(rank, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        Err(GeneticError::Other(format!("island {} panicked", rank)))
                    })
                })
                .collect())
        })?;

        let outcomes = collect_outcomes(results)?;
        let elapsed = start.elapsed();

        let best = outcomes
            .iter()
            .find_map(|outcome| outcome.global.clone())
            .ok_or_else_genetic(|| {
                GeneticError::Other("Root island returned no aggregated result".to_string())
            })?;

        match &best {
            Some(global) => info!(
                makespan = global.individual.makespan,
                island = global.island,
                ?elapsed,
                "Run finished"
            ),
            None => info!(?elapsed, "Run finished without a solution"),
        }

        Ok(RunSummary {
            best,
            islands: outcomes.into_iter().map(|outcome| outcome.report).collect(),
            elapsed,
        })
    }
}

/// Runs one island, aborting its peers if it panics so none of them waits on
/// it forever.
fn run_guarded<F>(abort: &AbortHandle, run: F) -> Result<IslandOutcome>
where
    F: FnOnce() -> Result<IslandOutcome>,
{
    panic::catch_unwind(AssertUnwindSafe(run)).unwrap_or_else(|_| {
        error!(rank = abort.rank(), "Island panicked, aborting its peers");
        abort.abort();
        Err(GeneticError::Other(format!("island {} panicked", abort.rank())))
    })
}

/// Returns every outcome, or the most relevant error if any island failed.
fn collect_outcomes(results: Vec<Result<IslandOutcome>>) -> Result<Vec<IslandOutcome>> {
    let mut outcomes = Vec::with_capacity(results.len());
    let mut root_cause: Option<GeneticError> = None;
    let mut secondary: Option<GeneticError> = None;

    for result in results {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) if e.is_secondary() => {
                secondary.get_or_insert(e);
            }
            Err(e) => {
                root_cause.get_or_insert(e);
            }
        }
    }

    match root_cause.or(secondary) {
        Some(e) => {
            error!(error = %e, "Island run failed");
            Err(e)
        }
        None => Ok(outcomes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(rank: usize) -> IslandOutcome {
        IslandOutcome {
            report: IslandReport {
                rank,
                best: None,
                history: vec![],
                migrations: 0,
            },
            global: None,
        }
    }

    fn island_error(rank: usize, source: GeneticError) -> GeneticError {
        GeneticError::Island {
            rank,
            generation: 4,
            source: Box::new(source),
        }
    }

    #[test]
    fn test_root_cause_preferred_over_peer_aborts() {
        let results = vec![
            Err(island_error(0, GeneticError::PeerAborted(2))),
            Ok(outcome(1)),
            Err(island_error(
                2,
                GeneticError::CrossoverUnderflow {
                    position: 3,
                    parent1: vec![0, 1, 0, 1],
                    parent2: vec![0, 1, 0, 0],
                },
            )),
        ];
        match collect_outcomes(results) {
            Err(GeneticError::Island { rank, source, .. }) => {
                assert_eq!(rank, 2);
                assert!(matches!(*source, GeneticError::CrossoverUnderflow { position: 3, .. }));
            }
            other => panic!("Expected island error, got {:?}", other),
        }
    }

    #[test]
    fn test_secondary_error_returned_when_alone() {
        let results = vec![Ok(outcome(0)), Err(island_error(1, GeneticError::PeerAborted(0)))];
        assert!(matches!(
            collect_outcomes(results),
            Err(GeneticError::Island { rank: 1, .. })
        ));
    }

    #[test]
    fn test_panicking_island_aborts_peers() {
        use crate::comm::{Communicator, Source, Tag, TagKind};

        let mut cluster = local_cluster(2);
        let mut peer = cluster.pop().unwrap();
        let failing = cluster.pop().unwrap();
        let abort = failing.abort_handle();

        let waiter = std::thread::spawn(move || {
            peer.receive(Source::Rank(0), Tag::new(TagKind::Migration, 1))
        });
        let result = run_guarded(&abort, move || {
            let _comm = failing;
            panic!("decoder bug")
        });

        assert!(matches!(&result, Err(GeneticError::Other(msg)) if msg == "island 0 panicked"));
        assert!(!result.unwrap_err().is_secondary());
        assert!(matches!(waiter.join().unwrap(), Err(GeneticError::PeerAborted(0))));
    }

    #[test]
    fn test_guarded_run_passes_results_through() {
        let cluster = local_cluster(1);
        let abort = cluster[0].abort_handle();
        assert_eq!(run_guarded(&abort, || Ok(outcome(0))).unwrap().report.rank, 0);
        assert!(matches!(
            run_guarded(&abort, || Err(GeneticError::EmptyPopulation)),
            Err(GeneticError::EmptyPopulation)
        ));
    }

    #[test]
    fn test_all_ok() {
        let outcomes = collect_outcomes(vec![Ok(outcome(0)), Ok(outcome(1))]).unwrap();
        assert_eq!(outcomes.len(), 2);
    }
}
