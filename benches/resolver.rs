//! Conflict-resolver benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::DVec3;

use crosslink::engine::resolve;
use crosslink::reaction::candidates::{CandidateDef, CandidateMap, PairOrder};
use crosslink::{Particle, ParticleStorage, SeededRng};

/// A dense candidate map: 512 owned keys with four partners each.
fn dense_map(storage: &mut ParticleStorage) -> CandidateMap {
    let mut map = CandidateMap::new();
    for key in 0..512i64 {
        storage.insert(Particle::new(key, 1, DVec3::ZERO));
        for p in 0..4i64 {
            let partner = 1000 + key * 4 + p;
            map.insert(
                key,
                partner,
                CandidateDef {
                    reaction: 0,
                    rate: 1.0,
                    r_sqr: 1.0 + p as f64,
                    order: PairOrder::AB,
                },
            );
        }
    }
    map
}

fn bench_unique_a_nearest(c: &mut Criterion) {
    let mut storage = ParticleStorage::new();
    let map = dense_map(&mut storage);

    c.bench_function("unique_a_nearest", |b| {
        b.iter(|| {
            let mut m = map.clone();
            let mut rng = SeededRng::new(1, 0);
            resolve::unique_a(black_box(&mut m), &storage, &mut rng, true);
            m
        })
    });
}

fn bench_unique_a_random(c: &mut Criterion) {
    let mut storage = ParticleStorage::new();
    let map = dense_map(&mut storage);

    c.bench_function("unique_a_random", |b| {
        b.iter(|| {
            let mut m = map.clone();
            let mut rng = SeededRng::new(1, 0);
            resolve::unique_a(black_box(&mut m), &storage, &mut rng, false);
            m
        })
    });
}

fn bench_candidate_wire_roundtrip(c: &mut Criterion) {
    let mut storage = ParticleStorage::new();
    let map = dense_map(&mut storage);

    c.bench_function("candidate_wire_roundtrip", |b| {
        b.iter(|| {
            let encoded = black_box(&map).encode();
            CandidateMap::decode(&encoded).unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_unique_a_nearest,
    bench_unique_a_random,
    bench_candidate_wire_roundtrip
);
criterion_main!(benches);
