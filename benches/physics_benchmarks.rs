//! Benchmarks for the rigid body engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rigid3d::prelude::*;

fn falling_stack(count: usize) -> World<()> {
    let mut world = World::empty().with_gravity(9.81, Vec3::new(0.0, 0.0, -1.0));
    world.add(Body::plane(()));
    for i in 0..count {
        world.add(
            Body::block(Vec3::new(0.5, 0.5, 0.5), ())
                .with_behavior(Behavior::Dynamic(1.0))
                .move_to(Vec3::new(0.0, 0.0, 1.2 + 1.1 * i as f64)),
        );
    }
    world
}

fn simulate_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulate");

    group.bench_function("single_falling_sphere", |b| {
        let mut world = World::empty().with_gravity(9.81, Vec3::new(0.0, 0.0, -1.0));
        world.add(Body::plane(()));
        world.add(
            Body::sphere(0.5, ())
                .with_behavior(Behavior::Dynamic(1.0))
                .move_to(Vec3::new(0.0, 0.0, 5.0)),
        );
        b.iter(|| {
            world.simulate(black_box(1.0 / 60.0));
        });
    });

    for &count in &[4usize, 16, 64] {
        group.bench_with_input(BenchmarkId::new("box_stack", count), &count, |b, &count| {
            let mut world = falling_stack(count);
            b.iter(|| {
                world.simulate(black_box(1.0 / 60.0));
            });
        });
    }

    group.finish();
}

fn broad_phase_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("broad_phase");

    for &count in &[8usize, 64, 256] {
        group.bench_with_input(BenchmarkId::new("candidate_pairs", count), &count, |b, &count| {
            let world = falling_stack(count);
            let bodies: Vec<_> = world.bodies().cloned().collect();
            b.iter(|| {
                black_box(rigid3d::collision::broad_phase::candidate_pairs(&bodies));
            });
        });
    }

    group.finish();
}

fn narrow_phase_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("narrow_phase");

    group.bench_function("sphere_sphere_overlap", |b| {
        let body_a = Body::sphere(1.0, ())
            .with_behavior(Behavior::Dynamic(1.0))
            .move_to(Vec3::new(-0.5, 0.0, 0.0));
        let body_b = Body::sphere(1.0, ())
            .with_behavior(Behavior::Dynamic(1.0))
            .move_to(Vec3::new(0.5, 0.0, 0.0));
        b.iter(|| {
            black_box(rigid3d::collision::narrow_phase::generate_contacts(&body_a, &body_b));
        });
    });

    group.bench_function("box_box_overlap", |b| {
        let body_a = Body::block(Vec3::new(1.0, 1.0, 1.0), ())
            .with_behavior(Behavior::Dynamic(1.0))
            .move_to(Vec3::new(-0.5, 0.0, 0.0));
        let body_b = Body::block(Vec3::new(1.0, 1.0, 1.0), ())
            .with_behavior(Behavior::Dynamic(1.0))
            .move_to(Vec3::new(0.5, 0.0, 0.0));
        b.iter(|| {
            black_box(rigid3d::collision::narrow_phase::generate_contacts(&body_a, &body_b));
        });
    });

    group.finish();
}

fn raycast_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("raycast");

    group.bench_function("stack_of_boxes", |b| {
        let world = falling_stack(64);
        b.iter(|| {
            black_box(world.raycast(Vec3::new(0.0, 0.0, 100.0), Vec3::new(0.0, 0.0, -1.0)));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    simulate_benchmarks,
    broad_phase_benchmarks,
    narrow_phase_benchmarks,
    raycast_benchmarks
);

criterion_main!(benches);
