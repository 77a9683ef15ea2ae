//! Ghost synchronization.
//!
//! After mutation, owners broadcast the changed attributes to their grid
//! neighbors. Receivers overwrite only ghost copies; a record about a
//! particle the receiver owns is ignored, because the owner is
//! authoritative and already applied the change itself.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::parallel::grid::NodeGrid;
use crate::parallel::halo::halo_exchange;
use crate::parallel::transport::{CommTag, Transport};
use crate::parallel::wire::{WireReader, WireWriter};
use crate::system::particle::ParticleId;
use crate::system::storage::ParticleStorage;

/// Push the attributes of every locally visible modified particle to all
/// grid neighbors and fold received records into local ghost copies.
pub fn update_ghost(
    comm: &dyn Transport,
    grid: &NodeGrid,
    storage: &mut ParticleStorage,
    modified: &BTreeSet<ParticleId>,
) -> Result<()> {
    let records: Vec<_> = modified
        .iter()
        .filter_map(|&pid| storage.lookup_local(pid).cloned())
        .collect();

    let mut w = WireWriter::new();
    w.put_u64(records.len() as u64);
    for p in &records {
        w.put_i64(p.id);
        w.put_u32(p.ptype);
        w.put_f64(p.mass);
        w.put_f64(p.charge);
        w.put_i64(p.res_id);
        w.put_f64(p.lambda);
        w.put_i64(p.state);
    }
    let payload = w.into_vec();

    halo_exchange(comm, grid, CommTag::Ghosts, &payload, |buf| {
        let mut r = WireReader::new(buf);
        let count = r.get_u64()?;
        for _ in 0..count {
            let id = r.get_i64()?;
            let ptype = r.get_u32()?;
            let mass = r.get_f64()?;
            let charge = r.get_f64()?;
            let res_id = r.get_i64()?;
            let lambda = r.get_f64()?;
            let state = r.get_i64()?;

            if let Some(p) = storage.lookup_local_mut(id) {
                if p.ghost {
                    p.ptype = ptype;
                    p.mass = mass;
                    p.charge = charge;
                    p.res_id = res_id;
                    p.lambda = lambda;
                    p.state = state;
                    log::trace!("ghost {} refreshed", id);
                }
            }
        }
        Ok(())
    })
}
