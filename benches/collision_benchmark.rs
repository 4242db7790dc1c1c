// benches/collision_benchmark.rs
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use glam::Vec3;
use portal_engine::engine_lib::physics::{aabb_overlap, minimal_push};
use portal_engine::engine_lib::scene_types::Aabb;
use rand::Rng;

fn create_box_pair(rng: &mut impl Rng) -> (Aabb, Aabb) {
    let center = Vec3::new(
        rng.gen_range(-10.0..10.0),
        rng.gen_range(-10.0..10.0),
        rng.gen_range(-10.0..10.0),
    );
    let half_a = Vec3::new(
        rng.gen_range(0.2..2.0),
        rng.gen_range(0.2..2.0),
        rng.gen_range(0.2..2.0),
    );
    // Second box near the first so a good share of pairs actually overlap.
    let offset = Vec3::new(
        rng.gen_range(-2.0..2.0),
        rng.gen_range(-2.0..2.0),
        rng.gen_range(-2.0..2.0),
    );
    let half_b = Vec3::new(
        rng.gen_range(0.2..2.0),
        rng.gen_range(0.2..2.0),
        rng.gen_range(0.2..2.0),
    );
    (
        Aabb::new(center - half_a, center + half_a),
        Aabb::new(center + offset - half_b, center + offset + half_b),
    )
}

fn collision_benchmark_fn(c: &mut Criterion) {
    let mut rng = rand::thread_rng();

    const NUM_BENCH_PAIRS: usize = 100;
    let mut pairs: Vec<(Aabb, Aabb)> = Vec::with_capacity(NUM_BENCH_PAIRS);
    for _ in 0..NUM_BENCH_PAIRS {
        pairs.push(create_box_pair(&mut rng));
    }

    let mut group = c.benchmark_group("CollisionOperations");

    group.bench_function("aabb_overlap_100_pairs", |b| {
        let mut pair_iter = pairs.iter().cycle();
        b.iter(|| {
            let (box_a, box_b) = pair_iter.next().unwrap();
            aabb_overlap(black_box(box_a), black_box(box_b))
        })
    });

    group.bench_function("minimal_push_100_pairs", |b| {
        let mut pair_iter = pairs.iter().cycle();
        b.iter(|| {
            let (box_a, box_b) = pair_iter.next().unwrap();
            minimal_push(black_box(box_a), black_box(box_b))
        })
    });

    group.finish();
}

criterion_group!(benches, collision_benchmark_fn);
criterion_main!(benches);
