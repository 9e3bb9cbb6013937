use crate::chromosome::Chromosome;
use crate::rng::RandomNumberGenerator;

/// Swap mutation: exchanges the genes at two distinct random positions.
///
/// Job multiplicities are untouched, so a valid chromosome stays valid.
/// Chromosomes with fewer than two genes are left as they are.
pub fn swap_mutation(chromosome: &mut Chromosome, rng: &mut RandomNumberGenerator) {
    if chromosome.len() < 2 {
        return;
    }
    let positions = rng.sample_indices(chromosome.len(), 2);
    chromosome.swap(positions[0], positions[1]);
}
