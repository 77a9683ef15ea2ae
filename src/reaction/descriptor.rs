//! Reaction descriptors.
//!
//! A descriptor captures one curing channel
//! `A^a + B^b -> A^(a+deltaA) - B^(b+deltaB)`: which particle types may
//! react, in which state window, at what kinetic rate and geometric range,
//! and what happens to the pair on success. Descriptors are immutable after
//! registration; the engine owns them for its lifetime.

use crate::error::{EngineError, Result};
use crate::rng::ReactionRng;
use crate::system::bonds::BondList;
use crate::system::particle::{Particle, ParticleId, ParticleType};

/// Hook run on a reacted particle; may touch further particles and must
/// report their ids so the ghost sync picks them up.
pub trait PostProcess: Send {
    fn apply(&self, target: &mut Particle, partner: &Particle) -> Vec<ParticleId>;
}

/// Registration parameters for one reaction.
#[derive(Debug, Clone)]
pub struct ReactionParams {
    pub type_a: ParticleType,
    pub type_b: ParticleType,
    /// Eligibility window for the A side: `min <= state < max`
    pub min_state_a: i64,
    pub max_state_a: i64,
    /// Eligibility window for the B side
    pub min_state_b: i64,
    pub max_state_b: i64,
    /// State increment applied to the A side on success
    pub delta_a: i64,
    /// State increment applied to the B side on success
    pub delta_b: i64,
    /// Kinetic rate k; a pair is accepted when u < k * dt * interval
    pub rate: f64,
    /// Geometric range; pairs beyond this distance never react
    pub cutoff: f64,
    /// Allow both endpoints to share a residue
    pub intra_residual: bool,
    /// Allow both endpoints to share a molecule
    pub intra_molecular: bool,
    /// Change states without inserting a bond
    pub virtual_reaction: bool,
    /// Dissociation: iterate the bond list instead of the neighbor list
    pub reverse: bool,
}

impl Default for ReactionParams {
    fn default() -> Self {
        Self {
            type_a: 0,
            type_b: 0,
            min_state_a: 0,
            max_state_a: 1,
            min_state_b: 0,
            max_state_b: 1,
            delta_a: 1,
            delta_b: 1,
            rate: 0.0,
            cutoff: 0.0,
            intra_residual: false,
            intra_molecular: false,
            virtual_reaction: false,
            reverse: false,
        }
    }
}

/// A pair accepted by [`ReactionDescriptor::is_valid_pair`], reordered so
/// `first` carries type A.
#[derive(Debug, Clone, Copy)]
pub struct ReactedPair {
    pub first: ParticleId,
    pub second: ParticleId,
    pub rate: f64,
    pub r_sqr: f64,
}

/// One registered reaction, with its product bond list and optional hooks.
pub struct ReactionDescriptor {
    params: ReactionParams,
    active: bool,
    pub bond_list: BondList,
    pub post_process_a: Option<Box<dyn PostProcess>>,
    pub post_process_b: Option<Box<dyn PostProcess>>,
}

impl ReactionDescriptor {
    pub fn new(params: ReactionParams) -> Result<Self> {
        if !params.cutoff.is_finite() || params.cutoff <= 0.0 {
            return Err(EngineError::config(format!(
                "reaction needs a positive cutoff, got {}",
                params.cutoff
            )));
        }
        if !params.rate.is_finite() || params.rate < 0.0 {
            return Err(EngineError::config(format!(
                "reaction rate must be finite and non-negative, got {}",
                params.rate
            )));
        }
        if params.min_state_a > params.max_state_a || params.min_state_b > params.max_state_b {
            return Err(EngineError::config("reaction state window is inverted"));
        }

        Ok(Self {
            params,
            active: true,
            bond_list: BondList::new(),
            post_process_a: None,
            post_process_b: None,
        })
    }

    pub fn params(&self) -> &ReactionParams {
        &self.params
    }

    pub fn cutoff(&self) -> f64 {
        self.params.cutoff
    }

    pub fn reverse(&self) -> bool {
        self.params.reverse
    }

    pub fn active(&self) -> bool {
        self.active
    }

    /// Deactivated reactions are skipped by both proposal and dissociation.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn with_post_process_a(mut self, hook: Box<dyn PostProcess>) -> Self {
        self.post_process_a = Some(hook);
        self
    }

    pub fn with_post_process_b(mut self, hook: Box<dyn PostProcess>) -> Self {
        self.post_process_b = Some(hook);
        self
    }

    /// A-side eligibility: type matches and state is inside the window.
    pub fn is_valid_state_a(&self, p: &Particle) -> bool {
        p.ptype == self.params.type_a
            && p.state >= self.params.min_state_a
            && p.state < self.params.max_state_a
    }

    /// B-side eligibility.
    pub fn is_valid_state_b(&self, p: &Particle) -> bool {
        p.ptype == self.params.type_b
            && p.state >= self.params.min_state_b
            && p.state < self.params.max_state_b
    }

    /// Full pair predicate: typing, state windows, geometry, then the
    /// stochastic rate test. The random draw is the only source of
    /// randomness in candidate proposal and happens strictly after the
    /// deterministic predicates, so a zero effective rate consumes no
    /// stream state for ineligible pairs.
    ///
    /// `prob_factor` is `dt * interval` from the engine.
    pub fn is_valid_pair(
        &self,
        p1: &Particle,
        p2: &Particle,
        prob_factor: f64,
        rng: &mut dyn ReactionRng,
    ) -> Option<ReactedPair> {
        let (first, second) = if self.is_valid_state_a(p1) && self.is_valid_state_b(p2) {
            (p1, p2)
        } else if self.is_valid_state_a(p2) && self.is_valid_state_b(p1) {
            (p2, p1)
        } else {
            return None;
        };

        let r_sqr = first.position.distance_squared(second.position);
        if r_sqr > self.params.cutoff * self.params.cutoff {
            return None;
        }

        if rng.uniform() >= self.params.rate * prob_factor {
            return None;
        }

        Some(ReactedPair {
            first: first.id,
            second: second.id,
            rate: self.params.rate,
            r_sqr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SeededRng;
    use glam::DVec3;

    fn descriptor(rate: f64, cutoff: f64) -> ReactionDescriptor {
        ReactionDescriptor::new(ReactionParams {
            type_a: 1,
            type_b: 2,
            rate,
            cutoff,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_registration_rejects_missing_cutoff() {
        let err = ReactionDescriptor::new(ReactionParams {
            cutoff: 0.0,
            rate: 1.0,
            ..Default::default()
        });
        assert!(err.is_err());
    }

    #[test]
    fn test_registration_rejects_inverted_window() {
        let err = ReactionDescriptor::new(ReactionParams {
            cutoff: 1.0,
            min_state_a: 3,
            max_state_a: 1,
            ..Default::default()
        });
        assert!(err.is_err());
    }

    #[test]
    fn test_pair_reordered_by_type() {
        let r = descriptor(1e9, 2.0);
        let mut rng = SeededRng::new(1, 0);

        let a = Particle::new(10, 1, DVec3::ZERO);
        let b = Particle::new(5, 2, DVec3::new(1.0, 0.0, 0.0));

        // Pass them B-first; the reacted pair still leads with type A.
        let pair = r.is_valid_pair(&b, &a, 1.0, &mut rng).unwrap();
        assert_eq!(pair.first, 10);
        assert_eq!(pair.second, 5);
        assert!((pair.r_sqr - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cutoff_excludes_distant_pairs() {
        let r = descriptor(1e9, 2.0);
        let mut rng = SeededRng::new(1, 0);

        let a = Particle::new(1, 1, DVec3::ZERO);
        let b = Particle::new(2, 2, DVec3::new(3.0, 0.0, 0.0));
        assert!(r.is_valid_pair(&a, &b, 1.0, &mut rng).is_none());
    }

    #[test]
    fn test_state_window_is_half_open() {
        let r = ReactionDescriptor::new(ReactionParams {
            type_a: 1,
            type_b: 2,
            min_state_a: 0,
            max_state_a: 2,
            rate: 1e9,
            cutoff: 2.0,
            ..Default::default()
        })
        .unwrap();
        let mut rng = SeededRng::new(1, 0);

        let a = Particle::new(1, 1, DVec3::ZERO).with_state(2);
        let b = Particle::new(2, 2, DVec3::new(1.0, 0.0, 0.0));
        assert!(
            r.is_valid_pair(&a, &b, 1.0, &mut rng).is_none(),
            "state == max must be outside the window"
        );
    }

    #[test]
    fn test_zero_rate_never_accepts() {
        let r = descriptor(0.0, 2.0);
        let mut rng = SeededRng::new(1, 0);

        let a = Particle::new(1, 1, DVec3::ZERO);
        let b = Particle::new(2, 2, DVec3::new(1.0, 0.0, 0.0));
        for _ in 0..100 {
            assert!(r.is_valid_pair(&a, &b, 1.0, &mut rng).is_none());
        }
    }

    #[test]
    fn test_saturated_rate_always_accepts() {
        let r = descriptor(1.0, 2.0);
        let mut rng = SeededRng::new(1, 0);

        let a = Particle::new(1, 1, DVec3::ZERO);
        let b = Particle::new(2, 2, DVec3::new(1.0, 0.0, 0.0));
        for _ in 0..100 {
            assert!(r.is_valid_pair(&a, &b, 1.0, &mut rng).is_some());
        }
    }
}
