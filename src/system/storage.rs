//! Per-rank particle storage.
//!
//! Each rank stores the particles it owns plus ghost replicas of particles
//! owned by neighboring ranks. Lookups mirror the two visibility levels the
//! engine needs: owner-only (`lookup_real`) and owner-or-ghost
//! (`lookup_local`).

use std::collections::HashMap;

use super::particle::{Particle, ParticleId};

/// In-memory particle store for one rank.
#[derive(Debug, Default)]
pub struct ParticleStorage {
    particles: HashMap<ParticleId, Particle>,
}

impl ParticleStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a particle (real or ghost).
    pub fn insert(&mut self, particle: Particle) {
        self.particles.insert(particle.id, particle);
    }

    /// Owner-only lookup: returns the particle iff this rank owns it.
    pub fn lookup_real(&self, pid: ParticleId) -> Option<&Particle> {
        self.particles.get(&pid).filter(|p| !p.ghost)
    }

    /// Local lookup including ghost replicas.
    pub fn lookup_local(&self, pid: ParticleId) -> Option<&Particle> {
        self.particles.get(&pid)
    }

    /// Mutable local lookup including ghost replicas.
    pub fn lookup_local_mut(&mut self, pid: ParticleId) -> Option<&mut Particle> {
        self.particles.get_mut(&pid)
    }

    /// Iterate over owned (non-ghost) particles.
    pub fn iter_real(&self) -> impl Iterator<Item = &Particle> {
        self.particles.values().filter(|p| !p.ghost)
    }

    /// Iterate over everything this rank can see, ghosts included.
    pub fn iter_local(&self) -> impl Iterator<Item = &Particle> {
        self.particles.values()
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    #[test]
    fn test_real_vs_local_lookup() {
        let mut storage = ParticleStorage::new();
        storage.insert(Particle::new(1, 0, DVec3::ZERO));
        storage.insert(Particle::new(2, 0, DVec3::ONE).as_ghost());

        assert!(storage.lookup_real(1).is_some());
        assert!(storage.lookup_real(2).is_none(), "ghosts are not real particles");
        assert!(storage.lookup_local(2).is_some());
        assert!(storage.lookup_local(3).is_none());
    }

    #[test]
    fn test_mutation_through_local_lookup() {
        let mut storage = ParticleStorage::new();
        storage.insert(Particle::new(1, 0, DVec3::ZERO));

        storage.lookup_local_mut(1).unwrap().state += 3;
        assert_eq!(storage.lookup_real(1).unwrap().state, 3);
    }

    #[test]
    fn test_iter_real_skips_ghosts() {
        let mut storage = ParticleStorage::new();
        storage.insert(Particle::new(1, 0, DVec3::ZERO));
        storage.insert(Particle::new(2, 0, DVec3::ONE).as_ghost());

        assert_eq!(storage.iter_real().count(), 1);
        assert_eq!(storage.iter_local().count(), 2);
    }
}
