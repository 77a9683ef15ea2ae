//! Candidate pair list.
//!
//! Reference implementation of the neighbor-list contract: all unordered
//! particle pairs within the cutoff where at least one endpoint is owned by
//! this rank. A production host would plug in a cell-list or Verlet scheme;
//! the engine only consumes `pairs()`.

use super::particle::ParticleId;
use super::storage::ParticleStorage;

/// Pairs within `cutoff`, rebuilt by the caller before each reaction step.
#[derive(Debug)]
pub struct NeighborList {
    cutoff: f64,
    pairs: Vec<(ParticleId, ParticleId)>,
}

impl NeighborList {
    pub fn new(cutoff: f64) -> Self {
        Self {
            cutoff,
            pairs: Vec::new(),
        }
    }

    /// The caller guarantees this is at least the largest reaction cutoff.
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Quadratic rebuild over local particles.
    ///
    /// Ghost-ghost pairs are skipped: neither endpoint can be mutated here
    /// and the owning ranks see the pair themselves.
    pub fn rebuild(&mut self, storage: &ParticleStorage) {
        self.pairs.clear();
        let cutoff_sqr = self.cutoff * self.cutoff;

        let mut local: Vec<_> = storage.iter_local().collect();
        local.sort_by_key(|p| p.id);

        for (i, p1) in local.iter().enumerate() {
            for p2 in local.iter().skip(i + 1) {
                if p1.ghost && p2.ghost {
                    continue;
                }
                if p1.position.distance_squared(p2.position) <= cutoff_sqr {
                    self.pairs.push((p1.id, p2.id));
                }
            }
        }
        log::trace!("neighbor list rebuilt: {} pairs", self.pairs.len());
    }

    pub fn pairs(&self) -> &[(ParticleId, ParticleId)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
