//! Crosslink - distributed stochastic curing engine
//!
//! Rate-controlled bond formation and breaking on top of a spatially
//! decomposed particle simulation: candidate pairs come from a neighbor
//! list, acceptance is stochastic, conflicts are resolved across ranks so
//! every particle enters at most one reaction per step, and mutated
//! attributes are pushed back out to ghost copies. Runs are deterministic
//! given a seed and a rank layout.

pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod parallel;
pub mod reaction;
pub mod rng;
pub mod system;

pub use config::EngineConfig;
pub use engine::{IntegratorObserver, ReactionEngine};
pub use error::{EngineError, Result};
pub use parallel::{CommTag, LocalCluster, LocalTransport, NodeGrid, Transport};
pub use reaction::{PostProcess, ReactionDescriptor, ReactionParams};
pub use rng::{ReactionRng, SeededRng};
pub use system::{
    BondList, NeighborList, Particle, ParticleId, ParticleStorage, StaticTopology, System,
    Topology,
};
