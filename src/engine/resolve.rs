//! Conflict resolution: reduce the candidate set to a conflict-free
//! matching.
//!
//! Three passes. unique-A and unique-B run rank-locally and prune the
//! many-to-many candidate graph to at most one partner per owned particle
//! on each side. The global pass serializes what cannot be decided locally
//! (intra-residue / intra-molecule exclusions and the global acceptance
//! cap) through rank 0 and broadcasts the final matching.
//!
//! Every selection draws from the candidate bucket in map insertion order;
//! that order is the only ordering assumption behind the engine's
//! determinism guarantee.

use std::collections::{HashMap, HashSet};

use crate::error::{EngineError, Result};
use crate::reaction::candidates::{CandidateEntry, CandidateMap};
use crate::reaction::descriptor::ReactionDescriptor;
use crate::rng::ReactionRng;
use crate::system::storage::ParticleStorage;
use crate::system::topology::Topology;
use crate::parallel::transport::Transport;

/// Pick one candidate out of a non-empty bucket.
///
/// Nearest mode collects the sub-bucket tying exactly with the minimal
/// squared distance and draws over `len - 1` when there is more than one,
/// matching the established partner-choice convention. Random mode draws
/// uniformly over the whole bucket.
fn select<'a>(
    bucket: &[&'a CandidateEntry],
    rng: &mut dyn ReactionRng,
    nearest: bool,
) -> &'a CandidateEntry {
    if nearest {
        let mut min_r_sqr = f64::INFINITY;
        for e in bucket {
            if e.def.r_sqr < min_r_sqr {
                min_r_sqr = e.def.r_sqr;
            }
        }
        let ties: Vec<&CandidateEntry> = bucket
            .iter()
            .copied()
            .filter(|e| e.def.r_sqr == min_r_sqr)
            .collect();
        let pick = if ties.len() > 1 {
            rng.uniform_int(ties.len() - 1)
        } else {
            0
        };
        ties[pick]
    } else {
        bucket[rng.uniform_int(bucket.len())]
    }
}

/// Pass A: keep exactly one candidate per key id owned on this rank.
///
/// Keys whose particle is not owned here (ghost or absent) are dropped;
/// neighbor ranks resolve those themselves.
pub fn unique_a(
    map: &mut CandidateMap,
    storage: &ParticleStorage,
    rng: &mut dyn ReactionRng,
    nearest: bool,
) {
    let keys: Vec<_> = map
        .keys_first_seen()
        .into_iter()
        .filter(|&k| storage.lookup_real(k).is_some())
        .collect();

    let mut out = CandidateMap::new();
    for key in keys {
        let bucket: Vec<&CandidateEntry> = map.candidates_for(key).collect();
        let chosen = select(&bucket, rng, nearest);
        out.insert(key, chosen.partner, chosen.def);
    }
    *map = out;
}

/// Pass B: re-key by the partner id, keep one candidate per owned partner,
/// and emit entries keyed back to `(id_low, id_high)`.
pub fn unique_b(
    map: &CandidateMap,
    storage: &ParticleStorage,
    rng: &mut dyn ReactionRng,
    nearest: bool,
) -> CandidateMap {
    let mut reverse = CandidateMap::new();
    for e in map.iter() {
        if storage.lookup_real(e.partner).is_some() {
            reverse.insert(e.partner, e.key, e.def);
        }
    }

    let mut out = CandidateMap::new();
    for b in reverse.keys_first_seen() {
        let bucket: Vec<&CandidateEntry> = reverse.candidates_for(b).collect();
        let chosen = select(&bucket, rng, nearest);
        // chosen.partner is the original key id, i.e. the lower id.
        out.insert(chosen.partner, b, chosen.def);
    }
    out
}

/// Pass C: global serialization through rank 0.
///
/// Each rank first normalizes its surviving entries (lower id first, order
/// flipped using the value read before the swap) and drops entries whose
/// particle or residue is already taken on this rank. Rank 0 then walks
/// the gathered maps in rank order, entry order within each rank, applying
/// the first-in-first-served acceptance rules, and broadcasts the final
/// matching to everyone.
pub fn resolve_global(
    effective: &mut CandidateMap,
    topology: &dyn Topology,
    reactions: &[ReactionDescriptor],
    comm: &dyn Transport,
    max_per_interval: u64,
) -> Result<()> {
    let mut local = CandidateMap::new();
    let mut used_particles = HashSet::new();
    let mut used_residues = HashSet::new();

    for e in effective.iter() {
        let (mut a, mut b) = (e.key, e.partner);

        if used_particles.contains(&a) || used_particles.contains(&b) {
            log::debug!("skip pair {}-{}: particle already taken", a, b);
            continue;
        }

        let (res_a, res_b) = (topology.res_id(a), topology.res_id(b));
        if used_residues.contains(&res_a) || used_residues.contains(&res_b) {
            log::debug!("skip pair {}-{}: residue already taken", a, b);
            continue;
        }

        let mut def = e.def;
        if a > b {
            def.order = def.order.flip();
            std::mem::swap(&mut a, &mut b);
        }

        local.insert(a, b, def);
        used_particles.insert(a);
        used_particles.insert(b);
        used_residues.insert(res_a);
        used_residues.insert(res_b);
    }

    let resolved = match comm.gather(0, local.encode())? {
        Some(buffers) => {
            let mut out = CandidateMap::new();
            let mut used_p = HashSet::new();
            let mut used_r = HashSet::new();
            let mut residue_adj: HashMap<i64, HashSet<i64>> = HashMap::new();
            let mut molecule_adj: HashMap<i64, HashSet<i64>> = HashMap::new();
            let mut accepted: u64 = 0;

            for buf in buffers {
                let rank_map = CandidateMap::decode(&buf)?;
                for e in rank_map.iter() {
                    if accepted >= max_per_interval {
                        break;
                    }

                    let reaction = reactions.get(e.def.reaction as usize).ok_or(
                        EngineError::BadIndex {
                            index: e.def.reaction as usize,
                            len: reactions.len(),
                        },
                    )?;

                    let (a, b) = (e.key, e.partner);
                    let (res_a, res_b) = (topology.res_id(a), topology.res_id(b));
                    let (mol_a, mol_b) = (topology.molecule_id(a), topology.molecule_id(b));

                    let mut valid = true;
                    if !reaction.params().intra_residual {
                        valid = !residue_adj
                            .get(&res_a)
                            .is_some_and(|adj| adj.contains(&res_b));
                    }
                    if valid && !reaction.params().intra_molecular {
                        valid &= !molecule_adj
                            .get(&mol_a)
                            .is_some_and(|adj| adj.contains(&mol_b));
                        valid &= !topology.same_molecule(a, b);
                    }
                    if valid {
                        valid &= !used_p.contains(&a) && !used_p.contains(&b);
                        valid &= !used_r.contains(&res_a) && !used_r.contains(&res_b);
                    }

                    if valid {
                        used_p.insert(a);
                        used_p.insert(b);
                        used_r.insert(res_a);
                        used_r.insert(res_b);
                        residue_adj.entry(res_a).or_default().insert(res_b);
                        residue_adj.entry(res_b).or_default().insert(res_a);
                        molecule_adj.entry(mol_a).or_default().insert(mol_b);
                        molecule_adj.entry(mol_b).or_default().insert(mol_a);
                        out.insert(a, b, e.def);
                        accepted += 1;
                    }
                }
            }

            log::debug!("resolved {} reactions globally", accepted);
            Some(out.encode())
        }
        None => None,
    };

    let data = comm.broadcast(0, resolved)?;
    *effective = CandidateMap::decode(&data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reaction::candidates::{CandidateDef, PairOrder};
    use crate::reaction::descriptor::ReactionParams;
    use crate::rng::SeededRng;
    use crate::system::particle::Particle;
    use crate::system::topology::StaticTopology;
    use crate::parallel::transport::LocalCluster;
    use glam::DVec3;

    fn def(r_sqr: f64) -> CandidateDef {
        CandidateDef {
            reaction: 0,
            rate: 1.0,
            r_sqr,
            order: PairOrder::AB,
        }
    }

    fn storage_with_real(ids: &[i64]) -> ParticleStorage {
        let mut storage = ParticleStorage::new();
        for &id in ids {
            storage.insert(Particle::new(id, 0, DVec3::ZERO));
        }
        storage
    }

    #[test]
    fn test_unique_a_keeps_one_partner_per_key() {
        let mut map = CandidateMap::new();
        map.insert(1, 5, def(2.0));
        map.insert(1, 6, def(1.0));
        map.insert(2, 7, def(3.0));

        let storage = storage_with_real(&[1, 2]);
        let mut rng = SeededRng::new(7, 0);

        unique_a(&mut map, &storage, &mut rng, true);

        assert_eq!(map.len(), 2);
        let for_1: Vec<_> = map.candidates_for(1).collect();
        assert_eq!(for_1.len(), 1);
        assert_eq!(for_1[0].partner, 6, "nearest mode keeps the closer partner");
    }

    #[test]
    fn test_unique_a_drops_unowned_keys() {
        let mut map = CandidateMap::new();
        map.insert(1, 5, def(1.0));
        map.insert(9, 10, def(1.0));

        let storage = storage_with_real(&[1]); // 9 not owned here
        let mut rng = SeededRng::new(7, 0);

        unique_a(&mut map, &storage, &mut rng, false);

        assert_eq!(map.len(), 1);
        assert_eq!(map.iter().next().unwrap().key, 1);
    }

    #[test]
    fn test_unique_b_resolves_shared_partner() {
        // Both 1 and 2 won particle 9 in pass A; pass B must keep one.
        let mut map = CandidateMap::new();
        map.insert(1, 9, def(1.0));
        map.insert(2, 9, def(4.0));

        let storage = storage_with_real(&[9]);
        let mut rng = SeededRng::new(7, 0);

        let out = unique_b(&map, &storage, &mut rng, true);

        assert_eq!(out.len(), 1);
        let e = out.iter().next().unwrap();
        assert_eq!((e.key, e.partner), (1, 9), "nearest candidate wins");
    }

    #[test]
    fn test_normalization_flips_order_before_swap() {
        // An entry arriving with key > partner must come out reordered with
        // the order flag flipped from its pre-swap value.
        let mut map = CandidateMap::new();
        map.insert(
            9,
            1,
            CandidateDef {
                reaction: 0,
                rate: 1.0,
                r_sqr: 1.0,
                order: PairOrder::AB,
            },
        );

        let reactions = vec![ReactionDescriptor::new(ReactionParams {
            rate: 1.0,
            cutoff: 1.0,
            intra_residual: true,
            intra_molecular: true,
            ..Default::default()
        })
        .unwrap()];
        let topology = StaticTopology::new();
        let mut endpoints = LocalCluster::new(1);
        let comm = endpoints.pop().unwrap();

        resolve_global(&mut map, &topology, &reactions, &comm, u64::MAX).unwrap();

        assert_eq!(map.len(), 1);
        let e = map.iter().next().unwrap();
        assert_eq!((e.key, e.partner), (1, 9));
        assert_eq!(e.def.order, PairOrder::BA);
    }

    #[test]
    fn test_max_per_interval_caps_acceptance() {
        let mut map = CandidateMap::new();
        map.insert(1, 2, def(1.0));
        map.insert(3, 4, def(1.0));
        map.insert(5, 6, def(1.0));

        let reactions = vec![ReactionDescriptor::new(ReactionParams {
            rate: 1.0,
            cutoff: 1.0,
            ..Default::default()
        })
        .unwrap()];
        let topology = StaticTopology::new();
        let mut endpoints = LocalCluster::new(1);
        let comm = endpoints.pop().unwrap();

        resolve_global(&mut map, &topology, &reactions, &comm, 1).unwrap();

        assert_eq!(map.len(), 1);
        let e = map.iter().next().unwrap();
        assert_eq!((e.key, e.partner), (1, 2), "first in iteration order wins");
    }

    #[test]
    fn test_same_molecule_pairs_rejected() {
        let mut map = CandidateMap::new();
        map.insert(1, 2, def(1.0)); // same molecule
        map.insert(3, 4, def(1.0)); // across molecules

        let mut topology = StaticTopology::new();
        topology.assign(1, 1, 100);
        topology.assign(2, 2, 100);
        topology.assign(3, 3, 200);
        topology.assign(4, 4, 300);

        let reactions = vec![ReactionDescriptor::new(ReactionParams {
            rate: 1.0,
            cutoff: 1.0,
            intra_molecular: false,
            ..Default::default()
        })
        .unwrap()];
        let mut endpoints = LocalCluster::new(1);
        let comm = endpoints.pop().unwrap();

        resolve_global(&mut map, &topology, &reactions, &comm, u64::MAX).unwrap();

        assert_eq!(map.len(), 1);
        let e = map.iter().next().unwrap();
        assert_eq!((e.key, e.partner), (3, 4));
    }

    #[test]
    fn test_bad_reaction_index_is_fatal() {
        let mut map = CandidateMap::new();
        map.insert(1, 2, CandidateDef { reaction: 5, rate: 1.0, r_sqr: 1.0, order: PairOrder::AB });

        let reactions = Vec::new();
        let topology = StaticTopology::new();
        let mut endpoints = LocalCluster::new(1);
        let comm = endpoints.pop().unwrap();

        let err = resolve_global(&mut map, &topology, &reactions, &comm, u64::MAX);
        assert!(matches!(err, Err(EngineError::BadIndex { .. })));
    }
}
