//! Candidate map: proposed pair reactions in transit between passes.
//!
//! A vector of records with a stable insertion order stands in for the
//! multi-map of the conflict-resolution passes. Insertion order is the only
//! ordering the resolver relies on, so merges from the wire simply append.

use crate::error::{EngineError, Result};
use crate::parallel::wire::{WireReader, WireWriter};
use crate::system::particle::ParticleId;

/// Which side of the record carried type A when the candidate was proposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairOrder {
    /// The key id is the A-side particle
    AB = 1,
    /// The partner id is the A-side particle
    BA = 2,
}

impl PairOrder {
    pub fn flip(self) -> Self {
        match self {
            PairOrder::AB => PairOrder::BA,
            PairOrder::BA => PairOrder::AB,
        }
    }

    pub fn to_wire(self) -> u8 {
        self as u8
    }

    pub fn from_wire(v: u8) -> Result<Self> {
        match v {
            1 => Ok(PairOrder::AB),
            2 => Ok(PairOrder::BA),
            other => Err(EngineError::comm(format!(
                "invalid pair order {} on the wire",
                other
            ))),
        }
    }
}

/// Per-candidate payload carried next to the pair ids.
#[derive(Debug, Clone, Copy)]
pub struct CandidateDef {
    /// Index into the engine's forward reaction list
    pub reaction: u32,
    pub rate: f64,
    pub r_sqr: f64,
    pub order: PairOrder,
}

/// One proposed reaction between `key` and `partner`, with `key < partner`.
#[derive(Debug, Clone, Copy)]
pub struct CandidateEntry {
    pub key: ParticleId,
    pub partner: ParticleId,
    pub def: CandidateDef,
}

/// Insertion-ordered multi-keyed candidate container.
#[derive(Debug, Default, Clone)]
pub struct CandidateMap {
    entries: Vec<CandidateEntry>,
}

impl CandidateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: ParticleId, partner: ParticleId, def: CandidateDef) {
        self.entries.push(CandidateEntry { key, partner, def });
    }

    pub fn iter(&self) -> impl Iterator<Item = &CandidateEntry> {
        self.entries.iter()
    }

    /// All candidates sharing `key`, in insertion order.
    pub fn candidates_for(&self, key: ParticleId) -> impl Iterator<Item = &CandidateEntry> {
        self.entries.iter().filter(move |e| e.key == key)
    }

    /// Distinct keys, ordered by first appearance.
    pub fn keys_first_seen(&self) -> Vec<ParticleId> {
        let mut seen = std::collections::HashSet::new();
        let mut keys = Vec::new();
        for entry in &self.entries {
            if seen.insert(entry.key) {
                keys.push(entry.key);
            }
        }
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Count-prefixed record stream for halo exchange, gather and broadcast.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = WireWriter::new();
        w.put_u64(self.entries.len() as u64);
        for e in &self.entries {
            w.put_i64(e.key);
            w.put_i64(e.partner);
            w.put_u32(e.def.reaction);
            w.put_f64(e.def.rate);
            w.put_f64(e.def.r_sqr);
            w.put_u8(e.def.order.to_wire());
        }
        w.into_vec()
    }

    /// Append every record from a received buffer.
    pub fn merge_wire(&mut self, buf: &[u8]) -> Result<()> {
        let mut r = WireReader::new(buf);
        let count = r.get_u64()?;
        for _ in 0..count {
            let key = r.get_i64()?;
            let partner = r.get_i64()?;
            let reaction = r.get_u32()?;
            let rate = r.get_f64()?;
            let r_sqr = r.get_f64()?;
            let order = PairOrder::from_wire(r.get_u8()?)?;
            self.insert(
                key,
                partner,
                CandidateDef {
                    reaction,
                    rate,
                    r_sqr,
                    order,
                },
            );
        }
        Ok(())
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut map = Self::new();
        map.merge_wire(buf)?;
        Ok(map)
    }
}
