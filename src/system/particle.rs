//! Particle record.

use glam::DVec3;

/// Particle identifier, unique across all ranks.
pub type ParticleId = i64;

/// Particle type tag.
pub type ParticleType = u32;

/// A particle as seen by one rank.
///
/// The owning rank holds the authoritative copy (`ghost == false`);
/// neighbor ranks may hold read-mostly ghost replicas that are refreshed
/// after every mutation phase.
#[derive(Debug, Clone)]
pub struct Particle {
    pub id: ParticleId,
    pub ptype: ParticleType,
    /// Chemical state, advanced by reaction deltas
    pub state: i64,
    pub mass: f64,
    pub charge: f64,
    pub res_id: i64,
    /// Coupling weight carried along with the other mutable attributes
    pub lambda: f64,
    pub position: DVec3,
    pub ghost: bool,
}

impl Particle {
    pub fn new(id: ParticleId, ptype: ParticleType, position: DVec3) -> Self {
        Self {
            id,
            ptype,
            state: 0,
            mass: 1.0,
            charge: 0.0,
            res_id: id,
            lambda: 1.0,
            position,
            ghost: false,
        }
    }

    /// Ghost replica of the same particle for a neighboring rank
    pub fn as_ghost(&self) -> Self {
        let mut ghost = self.clone();
        ghost.ghost = true;
        ghost
    }

    pub fn with_state(mut self, state: i64) -> Self {
        self.state = state;
        self
    }

    pub fn with_res_id(mut self, res_id: i64) -> Self {
        self.res_id = res_id;
        self
    }
}
