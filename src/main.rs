//! Crosslink demo - entry point
//!
//! Headless single-rank curing run: a melt of A and B monomers crosslinks
//! under a rate-controlled reaction until the A side is consumed. Progress
//! and final counters go to the log and to a CSV export.

use anyhow::{Context, Result};
use glam::DVec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crosslink::analysis::ChemicalConversionTypeState;
use crosslink::{
    export, EngineConfig, IntegratorObserver, LocalCluster, NodeGrid, Particle,
    ReactionDescriptor, ReactionEngine, ReactionParams, SeededRng, System,
};

const MONOMERS_PER_TYPE: usize = 200;
const BOX_SIZE: f64 = 12.0;
const STEPS: u64 = 200;
const DT: f64 = 0.01;

fn main() -> Result<()> {
    env_logger::init();
    log::info!("Crosslink demo starting...");

    let config = EngineConfig::load_or_default("data/engine.json");

    let mut endpoints = LocalCluster::new(1);
    let comm = endpoints.pop().context("cluster of one")?;
    let grid = NodeGrid::new([1, 1, 1], 0)?;
    let rng = SeededRng::new(2024, 0);

    let mut engine = ReactionEngine::new(config, grid, Box::new(comm), Box::new(rng))?;
    let reaction_idx = engine.add_reaction(ReactionDescriptor::new(ReactionParams {
        type_a: 1,
        type_b: 2,
        rate: 5.0,
        cutoff: 1.2,
        ..Default::default()
    })?);

    // A melt of unreacted A and B monomers, uniformly placed.
    let mut system = System::new(engine.max_cutoff().max(1.5));
    let mut placement = StdRng::seed_from_u64(7);
    for i in 0..(2 * MONOMERS_PER_TYPE) as i64 {
        let position = DVec3::new(
            placement.gen::<f64>() * BOX_SIZE,
            placement.gen::<f64>() * BOX_SIZE,
            placement.gen::<f64>() * BOX_SIZE,
        );
        let ptype = if i % 2 == 0 { 1 } else { 2 };
        system.storage.insert(Particle::new(i, ptype, position));
        system.topology.assign(i, i, i);
    }
    log::info!(
        "System ready: {} monomers, neighbor cutoff {}",
        system.storage.len(),
        system.neighbors.cutoff()
    );

    let conversion = ChemicalConversionTypeState::new(Some(MONOMERS_PER_TYPE as u64)).count_type(1, 1);

    for step in 0..STEPS {
        system.neighbors.rebuild(&system.storage);
        engine.on_after_integrate(step, DT, &mut system)?;

        if step % 20 == 0 {
            let reacted = conversion.compute(&system.storage, engine.transport())?;
            log::info!("step {}: conversion {:.3}", step, reacted);
        }
    }

    let bonds = engine.reaction(reaction_idx)?.bond_list.len();
    let reacted = conversion.compute(&system.storage, engine.transport())?;
    log::info!(
        "Finished after {} steps: {} bonds, conversion {:.3}",
        STEPS,
        bonds,
        reacted
    );
    for (name, seconds) in engine.timers() {
        log::info!("  {}: {:.6}s", name, seconds);
    }

    let rows = engine.collect_reaction_counters()?;
    let path = export::export_reaction_counters_timestamped("exports", &rows)?;
    log::info!("Counters written to {}", path.display());

    Ok(())
}
