//! The curing engine.
//!
//! `ReactionEngine::react` runs one full invocation: survey the neighbor
//! list, exchange and prune candidates, serialize the matching globally,
//! dissociate, associate, and refresh ghosts. Each rank runs the same
//! sequence in lockstep; the transport is the only coupling between ranks.

pub mod ghosts;
pub mod mutate;
pub mod resolve;
pub mod stats;

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Instant;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::parallel::grid::NodeGrid;
use crate::parallel::halo::halo_exchange;
use crate::parallel::transport::{CommTag, Transport};
use crate::reaction::candidates::{CandidateDef, CandidateMap, PairOrder};
use crate::reaction::descriptor::ReactionDescriptor;
use crate::rng::ReactionRng;
use crate::system::System;

pub use stats::{PhaseTimers, ReactionStats, StepCounts};

/// Observer hook the host integrator drives after velocity integration.
pub trait IntegratorObserver {
    fn on_after_integrate(&mut self, step: u64, dt: f64, system: &mut System) -> Result<()>;
}

/// One rank's reaction engine.
pub struct ReactionEngine {
    config: EngineConfig,
    grid: NodeGrid,
    comm: Box<dyn Transport>,
    rng: Box<dyn ReactionRng>,
    reactions: Vec<ReactionDescriptor>,
    reverse_reactions: Vec<ReactionDescriptor>,
    potential: CandidateMap,
    effective: CandidateMap,
    stats: ReactionStats,
    max_cutoff: f64,
}

impl ReactionEngine {
    pub fn new(
        config: EngineConfig,
        grid: NodeGrid,
        comm: Box<dyn Transport>,
        rng: Box<dyn ReactionRng>,
    ) -> Result<Self> {
        if config.interval == 0 {
            return Err(EngineError::config("reaction interval must be nonzero"));
        }
        if grid.size() != comm.size() {
            return Err(EngineError::config(format!(
                "node grid has {} ranks but transport has {}",
                grid.size(),
                comm.size()
            )));
        }
        if grid.rank() != comm.rank() {
            return Err(EngineError::config("node grid and transport disagree on rank"));
        }

        log::info!(
            "reaction engine ready on rank {}/{}",
            comm.rank(),
            comm.size()
        );

        Ok(Self {
            config,
            grid,
            comm,
            rng,
            reactions: Vec::new(),
            reverse_reactions: Vec::new(),
            potential: CandidateMap::new(),
            effective: CandidateMap::new(),
            stats: ReactionStats::new(),
            max_cutoff: 0.0,
        })
    }

    /// Register a reaction. Forward reactions feed off the neighbor list,
    /// reverse ones off their own bond list; the two are indexed
    /// separately. Returns the index within the respective list.
    pub fn add_reaction(&mut self, reaction: ReactionDescriptor) -> usize {
        if reaction.reverse() {
            log::info!("registered reverse reaction {}", self.reverse_reactions.len());
            self.reverse_reactions.push(reaction);
            self.reverse_reactions.len() - 1
        } else {
            if reaction.cutoff() > self.max_cutoff {
                self.max_cutoff = reaction.cutoff();
            }
            log::info!("registered reaction {}", self.reactions.len());
            self.reactions.push(reaction);
            self.reactions.len() - 1
        }
    }

    pub fn reaction(&self, index: usize) -> Result<&ReactionDescriptor> {
        self.reactions.get(index).ok_or(EngineError::BadIndex {
            index,
            len: self.reactions.len(),
        })
    }

    pub fn reaction_mut(&mut self, index: usize) -> Result<&mut ReactionDescriptor> {
        let len = self.reactions.len();
        self.reactions
            .get_mut(index)
            .ok_or(EngineError::BadIndex { index, len })
    }

    pub fn reverse_reaction(&self, index: usize) -> Result<&ReactionDescriptor> {
        self.reverse_reactions.get(index).ok_or(EngineError::BadIndex {
            index,
            len: self.reverse_reactions.len(),
        })
    }

    pub fn reverse_reaction_mut(&mut self, index: usize) -> Result<&mut ReactionDescriptor> {
        let len = self.reverse_reactions.len();
        self.reverse_reactions
            .get_mut(index)
            .ok_or(EngineError::BadIndex { index, len })
    }

    /// Largest forward cutoff; the caller must size the neighbor list to at
    /// least this.
    pub fn max_cutoff(&self) -> f64 {
        self.max_cutoff
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> &ReactionStats {
        &self.stats
    }

    pub fn rank(&self) -> usize {
        self.comm.rank()
    }

    /// The transport endpoint, for collective observables run next to the
    /// engine.
    pub fn transport(&self) -> &dyn Transport {
        self.comm.as_ref()
    }

    pub fn timers(&self) -> Vec<(&'static str, f64)> {
        self.stats.timers.named()
    }

    pub fn reset_timers(&mut self) {
        self.stats.timers.reset();
    }

    /// Collective: merged counter rows at rank 0, empty elsewhere.
    pub fn collect_reaction_counters(&self) -> Result<Vec<Vec<u64>>> {
        self.stats.collect_reaction_counters(self.comm.as_ref())
    }

    /// Collective: merged `[step, intra, inter]` rows at rank 0.
    pub fn collect_intra_inter_counters(&self) -> Result<Vec<[u64; 3]>> {
        self.stats.collect_intra_inter_counters(self.comm.as_ref())
    }

    /// Collective: dump gathered pair distances and clear the local log.
    pub fn save_pair_distances(&mut self, path: &Path) -> Result<()> {
        let Self { stats, comm, .. } = self;
        stats.save_pair_distances(comm.as_ref(), path)
    }

    /// One full reaction invocation. No-op on steps that are not a multiple
    /// of the configured interval.
    pub fn react(&mut self, step: u64, dt: f64, system: &mut System) -> Result<()> {
        if step % self.config.interval != 0 {
            return Ok(());
        }

        let prob_factor = dt * self.config.interval as f64;

        let Self {
            config,
            grid,
            comm,
            rng,
            reactions,
            reverse_reactions,
            potential,
            effective,
            stats,
            ..
        } = self;
        let comm = comm.as_ref();
        let rng = rng.as_mut();

        log::trace!("rank {}: reaction step {}", comm.rank(), step);

        potential.clear();
        effective.clear();

        // Survey the neighbor list for candidate pairs.
        let t = Instant::now();
        for &(pid1, pid2) in system.neighbors.pairs() {
            let (Some(p1), Some(p2)) = (
                system.storage.lookup_local(pid1),
                system.storage.lookup_local(pid2),
            ) else {
                continue;
            };

            for (idx, reaction) in reactions.iter().enumerate() {
                if !reaction.active() {
                    continue;
                }
                if let Some(pair) = reaction.is_valid_pair(p1, p2, prob_factor, rng) {
                    let (mut low, mut high) = (pair.first, pair.second);
                    let mut order = PairOrder::AB;
                    if low > high {
                        std::mem::swap(&mut low, &mut high);
                        order = PairOrder::BA;
                    }
                    potential.insert(
                        low,
                        high,
                        CandidateDef {
                            reaction: idx as u32,
                            rate: pair.rate,
                            r_sqr: pair.r_sqr,
                            order,
                        },
                    );
                }
            }
        }
        stats.timers.pair_loop += t.elapsed();
        log::debug!(
            "rank {}: {} potential pairs to react",
            comm.rank(),
            potential.len()
        );

        // Pass A: consolidate halos, one partner per owned A-side id.
        let t = Instant::now();
        exchange_candidates(comm, grid, potential)?;
        stats.timers.comm += t.elapsed();

        resolve::unique_a(potential, &system.storage, rng, config.nearest_mode);

        // Pass B: same from the B side, producing the effective map.
        let t = Instant::now();
        exchange_candidates(comm, grid, potential)?;
        stats.timers.comm += t.elapsed();

        *effective = resolve::unique_b(potential, &system.storage, rng, config.nearest_mode);

        let t = Instant::now();
        exchange_candidates(comm, grid, effective)?;
        stats.timers.comm += t.elapsed();

        // Pass C: global serialization through rank 0.
        let t = Instant::now();
        resolve::resolve_global(
            effective,
            &system.topology,
            reactions,
            comm,
            config.max_per_interval,
        )?;
        stats.timers.comm += t.elapsed();

        let mut modified = BTreeSet::new();

        // Dissociation first, then everyone syncs before association.
        let t = Instant::now();
        mutate::apply_dr(
            reverse_reactions,
            &mut system.storage,
            rng,
            prob_factor,
            &mut modified,
        );
        stats.timers.apply_dr += t.elapsed();

        comm.barrier()?;

        let t = Instant::now();
        let counts = mutate::apply_ar(
            effective,
            reactions,
            &mut system.storage,
            &system.topology,
            config.pair_distance_filename.is_some(),
            &mut modified,
        )?;
        stats.timers.apply_ar += t.elapsed();
        stats.record_step(step, counts);

        comm.barrier()?;

        let t = Instant::now();
        ghosts::update_ghost(comm, grid, &mut system.storage, &modified)?;
        stats.timers.update_ghost += t.elapsed();

        if let Some(path) = config.pair_distance_filename.clone() {
            stats.save_pair_distances(comm, &path)?;
        }

        log::trace!("rank {}: leaving reaction step {}", comm.rank(), step);
        Ok(())
    }
}

impl IntegratorObserver for ReactionEngine {
    fn on_after_integrate(&mut self, step: u64, dt: f64, system: &mut System) -> Result<()> {
        self.react(step, dt, system)
    }
}

/// Serialize a candidate map once and merge everything the grid neighbors
/// send back.
fn exchange_candidates(
    comm: &dyn Transport,
    grid: &NodeGrid,
    map: &mut CandidateMap,
) -> Result<()> {
    let payload = map.encode();
    halo_exchange(comm, grid, CommTag::Candidates, &payload, |buf| {
        map.merge_wire(buf)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::transport::LocalCluster;
    use crate::rng::SeededRng;

    fn single_rank_engine(config: EngineConfig) -> ReactionEngine {
        let mut endpoints = LocalCluster::new(1);
        let comm = endpoints.pop().unwrap();
        let grid = NodeGrid::new([1, 1, 1], 0).unwrap();
        ReactionEngine::new(config, grid, Box::new(comm), Box::new(SeededRng::new(1, 0)))
            .unwrap()
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut endpoints = LocalCluster::new(1);
        let comm = endpoints.pop().unwrap();
        let grid = NodeGrid::new([1, 1, 1], 0).unwrap();
        let config = EngineConfig {
            interval: 0,
            ..Default::default()
        };
        let err = ReactionEngine::new(config, grid, Box::new(comm), Box::new(SeededRng::new(1, 0)));
        assert!(err.is_err());
    }

    #[test]
    fn test_grid_transport_size_mismatch_rejected() {
        let mut endpoints = LocalCluster::new(1);
        let comm = endpoints.pop().unwrap();
        let grid = NodeGrid::new([2, 1, 1], 0).unwrap();
        let err = ReactionEngine::new(
            EngineConfig::default(),
            grid,
            Box::new(comm),
            Box::new(SeededRng::new(1, 0)),
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_bad_reaction_lookup() {
        let engine = single_rank_engine(EngineConfig::default());
        assert!(matches!(
            engine.reaction(0),
            Err(EngineError::BadIndex { .. })
        ));
    }

    #[test]
    fn test_max_cutoff_tracks_forward_reactions() {
        use crate::reaction::descriptor::{ReactionDescriptor, ReactionParams};

        let mut engine = single_rank_engine(EngineConfig::default());
        engine.add_reaction(
            ReactionDescriptor::new(ReactionParams {
                cutoff: 1.5,
                rate: 1.0,
                ..Default::default()
            })
            .unwrap(),
        );
        engine.add_reaction(
            ReactionDescriptor::new(ReactionParams {
                cutoff: 9.0,
                rate: 1.0,
                reverse: true,
                ..Default::default()
            })
            .unwrap(),
        );

        assert_eq!(engine.max_cutoff(), 1.5, "reverse cutoffs do not extend the neighbor range");
    }
}
