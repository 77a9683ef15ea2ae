//! Per-step counters, pair-distance log and phase timers.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::parallel::transport::Transport;
use crate::parallel::wire::{WireReader, WireWriter};

/// Wall time spent in each phase of the reaction loop.
#[derive(Debug, Default, Clone)]
pub struct PhaseTimers {
    pub pair_loop: Duration,
    pub comm: Duration,
    pub apply_dr: Duration,
    pub apply_ar: Duration,
    pub update_ghost: Duration,
}

impl PhaseTimers {
    /// Named seconds, ending with the sum.
    pub fn named(&self) -> Vec<(&'static str, f64)> {
        let total =
            self.pair_loop + self.comm + self.apply_dr + self.apply_ar + self.update_ghost;
        vec![
            ("pair_loop", self.pair_loop.as_secs_f64()),
            ("comm", self.comm.as_secs_f64()),
            ("apply_dr", self.apply_dr.as_secs_f64()),
            ("apply_ar", self.apply_ar.as_secs_f64()),
            ("update_ghost", self.update_ghost.as_secs_f64()),
            ("total", total.as_secs_f64()),
        ]
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// What one association pass produced on this rank.
#[derive(Debug, Clone, Default)]
pub struct StepCounts {
    /// Accepted bonds per forward reaction index
    pub per_reaction: Vec<u64>,
    /// Accepted bonds whose endpoints share a molecule
    pub intra: u64,
    /// Accepted bonds across molecules
    pub inter: u64,
    /// Squared distances of accepted bonds, when logging is enabled
    pub r_sqr: Vec<f64>,
}

/// Rank-local statistics store.
///
/// Counter collection is a collective operation: every rank must call it,
/// and only rank 0 receives the merged rows (matching the gather
/// underneath).
#[derive(Debug, Default)]
pub struct ReactionStats {
    reaction_counters: BTreeMap<u64, Vec<u64>>,
    intra_inter: BTreeMap<u64, [u64; 2]>,
    pair_distances: Vec<f64>,
    pub timers: PhaseTimers,
}

impl ReactionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_step(&mut self, step: u64, counts: StepCounts) {
        self.reaction_counters.insert(step, counts.per_reaction);
        self.intra_inter
            .insert(step, [counts.intra, counts.inter]);
        self.pair_distances.extend(counts.r_sqr);
    }

    /// Squared distances logged on this rank since the last dump.
    pub fn pair_distances(&self) -> &[f64] {
        &self.pair_distances
    }

    pub fn clear_pair_distances(&mut self) {
        self.pair_distances.clear();
    }

    /// Merge per-step reaction counters across ranks.
    ///
    /// Returns rows `[step, count_r0, count_r1, ...]` on rank 0 and an
    /// empty vector elsewhere.
    pub fn collect_reaction_counters(&self, comm: &dyn Transport) -> Result<Vec<Vec<u64>>> {
        let gathered = comm.gather(0, encode_counter_map(&self.reaction_counters))?;

        let Some(buffers) = gathered else {
            return Ok(Vec::new());
        };

        let mut merged: BTreeMap<u64, Vec<u64>> = BTreeMap::new();
        for buf in buffers {
            for (step, counts) in decode_counter_map(&buf)? {
                let slot = merged.entry(step).or_default();
                if slot.len() < counts.len() {
                    slot.resize(counts.len(), 0);
                }
                for (i, c) in counts.iter().enumerate() {
                    slot[i] += c;
                }
            }
        }

        Ok(merged
            .into_iter()
            .map(|(step, counts)| {
                let mut row = Vec::with_capacity(counts.len() + 1);
                row.push(step);
                row.extend(counts);
                row
            })
            .collect())
    }

    /// Merge intra/inter molecular counters across ranks.
    ///
    /// Returns rows `[step, intra, inter]` on rank 0, empty elsewhere.
    pub fn collect_intra_inter_counters(&self, comm: &dyn Transport) -> Result<Vec<[u64; 3]>> {
        let map: BTreeMap<u64, Vec<u64>> = self
            .intra_inter
            .iter()
            .map(|(&step, v)| (step, v.to_vec()))
            .collect();
        let gathered = comm.gather(0, encode_counter_map(&map))?;

        let Some(buffers) = gathered else {
            return Ok(Vec::new());
        };

        let mut merged: BTreeMap<u64, [u64; 2]> = BTreeMap::new();
        for buf in buffers {
            for (step, counts) in decode_counter_map(&buf)? {
                let slot = merged.entry(step).or_insert([0, 0]);
                slot[0] += counts.first().copied().unwrap_or(0);
                slot[1] += counts.get(1).copied().unwrap_or(0);
            }
        }

        Ok(merged
            .into_iter()
            .map(|(step, [intra, inter])| [step, intra, inter])
            .collect())
    }

    /// Gather all ranks' pair distances, append them to `path` at rank 0
    /// (one r-squared per line) and clear the local vector everywhere.
    pub fn save_pair_distances(&mut self, comm: &dyn Transport, path: &Path) -> Result<()> {
        let mut w = WireWriter::new();
        w.put_u64(self.pair_distances.len() as u64);
        for &d in &self.pair_distances {
            w.put_f64(d);
        }

        if let Some(buffers) = comm.gather(0, w.into_vec())? {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            for buf in buffers {
                let mut r = WireReader::new(&buf);
                let n = r.get_u64()?;
                for _ in 0..n {
                    writeln!(file, "{}", r.get_f64()?)?;
                }
            }
        }

        self.pair_distances.clear();
        Ok(())
    }
}

fn encode_counter_map(map: &BTreeMap<u64, Vec<u64>>) -> Vec<u8> {
    let mut w = WireWriter::new();
    w.put_u64(map.len() as u64);
    for (&step, counts) in map {
        w.put_u64(step);
        w.put_u64(counts.len() as u64);
        for &c in counts {
            w.put_u64(c);
        }
    }
    w.into_vec()
}

fn decode_counter_map(buf: &[u8]) -> Result<Vec<(u64, Vec<u64>)>> {
    let mut r = WireReader::new(buf);
    let entries = r.get_u64()?;
    let mut out = Vec::with_capacity(entries as usize);
    for _ in 0..entries {
        let step = r.get_u64()?;
        let len = r.get_u64()?;
        let mut counts = Vec::with_capacity(len as usize);
        for _ in 0..len {
            counts.push(r.get_u64()?);
        }
        out.push((step, counts));
    }
    Ok(out)
}
