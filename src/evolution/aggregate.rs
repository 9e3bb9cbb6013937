//! Final reduction of the islands' best individuals.

use crate::chromosome::EvaluatedIndividual;
use crate::comm::{Communicator, Payload};
use crate::error::Result;

/// Rank that receives the gathered results.
pub const ROOT: usize = 0;

/// The overall best individual and the island that found it.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalBest {
    pub island: usize,
    pub individual: EvaluatedIndividual,
}

/// Picks the minimum makespan; the first one wins ties.
///
/// Returns `None` when no island produced an individual.
pub fn reduce_best(bests: &[Option<EvaluatedIndividual>]) -> Option<GlobalBest> {
    let mut global: Option<GlobalBest> = None;
    for (island, candidate) in bests.iter().enumerate() {
        let Some(candidate) = candidate else { continue };
        let better = global
            .as_ref()
            .map_or(true, |current| candidate.makespan < current.individual.makespan);
        if better {
            global = Some(GlobalBest {
                island,
                individual: candidate.clone(),
            });
        }
    }
    global
}

/// Synchronizes all islands, then gathers every best at [`ROOT`].
///
/// The root gets `Some(result)`, every other island `None`.
pub fn aggregate<C: Communicator + ?Sized>(
    comm: &mut C,
    epoch: usize,
    best: Option<EvaluatedIndividual>,
) -> Result<Option<Option<GlobalBest>>> {
    comm.barrier(epoch)?;
    let Some(gathered) = comm.gather(ROOT, epoch, Payload::Best(best))? else {
        return Ok(None);
    };
    let bests = gathered
        .into_iter()
        .map(Payload::into_best)
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(reduce_best(&bests)))
}
