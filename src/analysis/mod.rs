//! Conversion observables.
//!
//! Small collective measurements used to track curing progress: how much of
//! a species has reacted, and how many bonds a list holds across all ranks.
//! Every rank must call these together; the result is broadcast so every
//! rank receives the same value.

use crate::error::Result;
use crate::parallel::transport::Transport;
use crate::parallel::wire::{WireReader, WireWriter};
use crate::system::bonds::BondList;
use crate::system::particle::ParticleType;
use crate::system::storage::ParticleStorage;

/// Sum a per-rank count over all ranks; everyone gets the total.
fn global_sum(comm: &dyn Transport, value: u64) -> Result<u64> {
    let mut w = WireWriter::new();
    w.put_u64(value);

    let total = match comm.gather(0, w.into_vec())? {
        Some(buffers) => {
            let mut sum = 0u64;
            for buf in buffers {
                sum += WireReader::new(&buf).get_u64()?;
            }
            let mut w = WireWriter::new();
            w.put_u64(sum);
            Some(w.into_vec())
        }
        None => None,
    };

    let data = comm.broadcast(0, total)?;
    WireReader::new(&data).get_u64()
}

/// Fraction (or absolute count) of owned particles with a given type.
#[derive(Debug, Clone)]
pub struct ChemicalConversion {
    p_type: ParticleType,
    /// Reference total; `None` reports the absolute count instead
    total: Option<u64>,
}

impl ChemicalConversion {
    pub fn new(p_type: ParticleType, total: Option<u64>) -> Self {
        Self { p_type, total }
    }

    pub fn compute(&self, storage: &ParticleStorage, comm: &dyn Transport) -> Result<f64> {
        let local = storage
            .iter_real()
            .filter(|p| p.ptype == self.p_type)
            .count() as u64;
        let global = global_sum(comm, local)?;

        Ok(match self.total {
            Some(total) => global as f64 / total as f64,
            None => global as f64,
        })
    }
}

/// Like [`ChemicalConversion`], but counting (type, state) combinations.
#[derive(Debug, Clone)]
pub struct ChemicalConversionTypeState {
    type_states: Vec<(ParticleType, i64)>,
    total: Option<u64>,
}

impl ChemicalConversionTypeState {
    pub fn new(total: Option<u64>) -> Self {
        Self {
            type_states: Vec::new(),
            total,
        }
    }

    /// Add a (type, state) combination to count.
    pub fn count_type(mut self, p_type: ParticleType, state: i64) -> Self {
        self.type_states.push((p_type, state));
        self
    }

    pub fn compute(&self, storage: &ParticleStorage, comm: &dyn Transport) -> Result<f64> {
        let local = storage
            .iter_real()
            .filter(|p| self.type_states.contains(&(p.ptype, p.state)))
            .count() as u64;
        let global = global_sum(comm, local)?;

        Ok(match self.total {
            Some(total) => global as f64 / total as f64,
            None => global as f64,
        })
    }
}

/// Global number of entries in a bond list.
pub fn bond_list_entries(bonds: &BondList, comm: &dyn Transport) -> Result<u64> {
    global_sum(comm, bonds.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::transport::LocalCluster;
    use crate::system::particle::Particle;
    use glam::DVec3;

    #[test]
    fn test_conversion_fraction() {
        let mut endpoints = LocalCluster::new(1);
        let comm = endpoints.pop().unwrap();

        let mut storage = ParticleStorage::new();
        storage.insert(Particle::new(1, 1, DVec3::ZERO));
        storage.insert(Particle::new(2, 1, DVec3::ZERO));
        storage.insert(Particle::new(3, 2, DVec3::ZERO));
        storage.insert(Particle::new(4, 1, DVec3::ZERO).as_ghost());

        let obs = ChemicalConversion::new(1, Some(4));
        let value = obs.compute(&storage, &comm).unwrap();
        assert!((value - 0.5).abs() < 1e-12, "ghosts must not be counted");
    }

    #[test]
    fn test_type_state_count() {
        let mut endpoints = LocalCluster::new(1);
        let comm = endpoints.pop().unwrap();

        let mut storage = ParticleStorage::new();
        storage.insert(Particle::new(1, 1, DVec3::ZERO).with_state(1));
        storage.insert(Particle::new(2, 1, DVec3::ZERO));

        let obs = ChemicalConversionTypeState::new(None).count_type(1, 1);
        let value = obs.compute(&storage, &comm).unwrap();
        assert!((value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_bond_list_entries() {
        let mut endpoints = LocalCluster::new(1);
        let comm = endpoints.pop().unwrap();

        let mut bonds = BondList::new();
        bonds.iadd(1, 2);
        bonds.iadd(3, 4);

        assert_eq!(bond_list_entries(&bonds, &comm).unwrap(), 2);
    }
}
