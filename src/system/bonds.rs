//! Fixed pair list of bonded particles.
//!
//! Each reaction owns one of these; association inserts product bonds and
//! dissociation removes reactant bonds. Bonds are stored once per rank in
//! the orientation they were inserted with; membership checks and removal
//! accept either orientation so callers can key removal by whichever
//! endpoint they hold.

use super::particle::ParticleId;

/// Owner-partitioned set of bonded pairs, persisted across steps.
#[derive(Debug, Default, Clone)]
pub struct BondList {
    pairs: Vec<(ParticleId, ParticleId)>,
}

impl BondList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a bond. Returns false if it is already present.
    pub fn add(&mut self, a: ParticleId, b: ParticleId) -> bool {
        self.iadd(a, b)
    }

    /// Insert-or-ignore. Returns true iff the bond was actually inserted.
    pub fn iadd(&mut self, a: ParticleId, b: ParticleId) -> bool {
        if self.contains(a, b) {
            log::debug!("bond {}-{} already present, ignored", a, b);
            return false;
        }
        self.pairs.push((a, b));
        true
    }

    /// Remove a bond, matching either orientation. Returns true iff removed.
    pub fn remove(&mut self, a: ParticleId, b: ParticleId) -> bool {
        let before = self.pairs.len();
        self.pairs
            .retain(|&(x, y)| !((x == a && y == b) || (x == b && y == a)));
        before != self.pairs.len()
    }

    pub fn contains(&self, a: ParticleId, b: ParticleId) -> bool {
        self.pairs
            .iter()
            .any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
    }

    /// Bonds in insertion order.
    pub fn pairs(&self) -> &[(ParticleId, ParticleId)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    /// Refresh hook invoked after a batch of removals.
    ///
    /// The in-memory list needs no rebuild; the hook is kept so callers can
    /// signal the end of a mutation batch in one place.
    pub fn update_particles_storage(&mut self) {
        log::trace!("bond list storage refreshed, {} bonds", self.pairs.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iadd_ignores_duplicates() {
        let mut bonds = BondList::new();
        assert!(bonds.iadd(1, 2));
        assert!(!bonds.iadd(1, 2));
        assert!(!bonds.iadd(2, 1), "reversed orientation is the same bond");
        assert_eq!(bonds.len(), 1);
    }

    #[test]
    fn test_remove_either_orientation() {
        let mut bonds = BondList::new();
        bonds.iadd(3, 9);
        assert!(bonds.remove(9, 3));
        assert!(bonds.is_empty());
        assert!(!bonds.remove(3, 9), "already gone");
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut bonds = BondList::new();
        bonds.iadd(1, 2);
        bonds.iadd(3, 4);
        bonds.iadd(5, 6);
        assert_eq!(bonds.pairs(), &[(1, 2), (3, 4), (5, 6)]);
    }
}
