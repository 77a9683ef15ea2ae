//! Mutation phases: dissociation over bond lists and association over the
//! resolved matching.
//!
//! All mutations are rank-local; ghost copies are reconciled afterwards by
//! the ghost sync. Endpoints that migrated away between proposal and
//! application are skipped silently, which is why the accepted count can be
//! smaller than the resolved matching.

use std::collections::BTreeSet;

use super::stats::StepCounts;
use crate::error::Result;
use crate::reaction::candidates::{CandidateMap, PairOrder};
use crate::reaction::descriptor::{PostProcess, ReactionDescriptor};
use crate::rng::ReactionRng;
use crate::system::particle::{Particle, ParticleId};
use crate::system::storage::ParticleStorage;
use crate::system::topology::Topology;

/// Apply a state delta and the matching post-process hook to one endpoint.
fn mutate_endpoint(
    storage: &mut ParticleStorage,
    id: ParticleId,
    delta: i64,
    hook: Option<&dyn PostProcess>,
    partner: &Particle,
    modified: &mut BTreeSet<ParticleId>,
) {
    if let Some(p) = storage.lookup_local_mut(id) {
        p.state += delta;
        modified.insert(id);
        if let Some(hook) = hook {
            modified.extend(hook.apply(p, partner));
        }
    }
}

/// Dissociation: walk every active reverse reaction's bond list and remove
/// the bonds that pass the acceptance predicate, reverting states.
pub fn apply_dr(
    reverse_reactions: &mut [ReactionDescriptor],
    storage: &mut ParticleStorage,
    rng: &mut dyn ReactionRng,
    prob_factor: f64,
    modified: &mut BTreeSet<ParticleId>,
) {
    for reaction in reverse_reactions.iter_mut() {
        if !reaction.active() {
            continue;
        }

        let mut removed_any = false;
        let bonds: Vec<_> = reaction.bond_list.pairs().to_vec();

        for (id1, id2) in bonds {
            let (Some(p1), Some(p2)) = (
                storage.lookup_local(id1).cloned(),
                storage.lookup_local(id2).cloned(),
            ) else {
                continue;
            };

            let Some(pair) = reaction.is_valid_pair(&p1, &p2, prob_factor, rng) else {
                continue;
            };

            // Remove under the id the bond is keyed by on this rank: the
            // stored first id when both are local, else the non-ghost one.
            if !p1.ghost && !p2.ghost {
                reaction.bond_list.remove(id1, id2);
            } else if p2.ghost {
                reaction.bond_list.remove(id1, id2);
            } else {
                reaction.bond_list.remove(id2, id1);
            }
            removed_any = true;

            let params = reaction.params().clone();
            let partner_before = if pair.second == p2.id { p2.clone() } else { p1.clone() };
            mutate_endpoint(
                storage,
                pair.first,
                params.delta_a,
                reaction.post_process_a.as_deref(),
                &partner_before,
                modified,
            );
            // The B-side hook sees the A side as already mutated.
            if let Some(first_now) = storage.lookup_local(pair.first).cloned() {
                mutate_endpoint(
                    storage,
                    pair.second,
                    params.delta_b,
                    reaction.post_process_b.as_deref(),
                    &first_now,
                    modified,
                );
            }
            log::debug!("dissociated bond {}-{}", id1, id2);
        }

        if removed_any {
            reaction.bond_list.update_particles_storage();
        }
    }
}

/// Association: apply the resolved matching to local particles and bond
/// lists, counting what actually happened.
pub fn apply_ar(
    effective: &CandidateMap,
    reactions: &mut [ReactionDescriptor],
    storage: &mut ParticleStorage,
    topology: &dyn Topology,
    log_distances: bool,
    modified: &mut BTreeSet<ParticleId>,
) -> Result<StepCounts> {
    let mut counts = StepCounts {
        per_reaction: vec![0; reactions.len()],
        ..Default::default()
    };

    for entry in effective.iter() {
        let idx = entry.def.reaction as usize;
        let Some(reaction) = reactions.get(idx) else {
            return Err(crate::error::EngineError::BadIndex {
                index: idx,
                len: reactions.len(),
            });
        };

        let (a_id, b_id) = match entry.def.order {
            PairOrder::AB => (entry.key, entry.partner),
            PairOrder::BA => (entry.partner, entry.key),
        };

        // Neither owner nor ghost here: the endpoint migrated, skip.
        let (Some(pa), Some(pb)) = (
            storage.lookup_local(a_id).cloned(),
            storage.lookup_local(b_id).cloned(),
        ) else {
            log::debug!("pair {}-{} not present locally, skipped", a_id, b_id);
            continue;
        };

        let params = reaction.params().clone();

        if pa.ptype != params.type_a || pb.ptype != params.type_b {
            log::warn!(
                "candidate {}-{} no longer matches reaction {} type assignment \
                 ({} vs {}, {} vs {}), skipped",
                a_id, b_id, idx, pa.ptype, params.type_a, pb.ptype, params.type_b
            );
            continue;
        }
        if !reaction.is_valid_state_a(&pa) || !reaction.is_valid_state_b(&pb) {
            log::debug!("pair {}-{} left the state window, skipped", a_id, b_id);
            continue;
        }

        let reaction = &mut reactions[idx];
        mutate_endpoint(
            storage,
            a_id,
            params.delta_a,
            reaction.post_process_a.as_deref(),
            &pb,
            modified,
        );
        if let Some(pa_now) = storage.lookup_local(a_id).cloned() {
            mutate_endpoint(
                storage,
                b_id,
                params.delta_b,
                reaction.post_process_b.as_deref(),
                &pa_now,
                modified,
            );
        }

        // Both endpoints ghosted here means some other rank owns the bond.
        if !params.virtual_reaction && !(pa.ghost && pb.ghost) {
            if reaction.bond_list.iadd(entry.key, entry.partner) {
                counts.per_reaction[idx] += 1;
                if log_distances {
                    counts.r_sqr.push(entry.def.r_sqr);
                }
                if topology.molecule_id(entry.key) == topology.molecule_id(entry.partner) {
                    counts.intra += 1;
                } else {
                    counts.inter += 1;
                }
                log::debug!("associated bond {}-{}", entry.key, entry.partner);
            }
        }
    }

    Ok(counts)
}
