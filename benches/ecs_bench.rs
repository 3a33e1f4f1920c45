#![allow(dead_code)]
//! Benchmarks for core ECS operations
//!
//! Run with: cargo bench
//!
//! Measures entity churn, attach/detach throughput, and cached view
//! iteration, with hecs as a comparison baseline.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hecs::World as HecsWorld;
use sparse_ecs::World;

#[derive(Debug, Copy, Clone)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Debug, Copy, Clone)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Debug, Copy, Clone)]
struct Health(u32);

// Bench: entity creation with components attached
fn bench_spawn(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn");

    group.bench_function("sparse_spawn_1k_two_components", |b| {
        b.iter(|| {
            let mut world = World::new();
            for i in 0..1_000 {
                let e = world.create_entity().unwrap();
                world
                    .attach(
                        e,
                        Position {
                            x: i as f32,
                            y: 0.0,
                            z: 0.0,
                        },
                    )
                    .unwrap();
                world
                    .attach(
                        e,
                        Velocity {
                            x: 1.0,
                            y: 1.0,
                            z: 1.0,
                        },
                    )
                    .unwrap();
            }
            black_box(world.entity_count())
        });
    });
    group.bench_function("hecs_spawn_1k_two_components", |b| {
        b.iter(|| {
            let mut world = HecsWorld::new();
            for i in 0..1_000 {
                world.spawn((
                    Position {
                        x: i as f32,
                        y: 0.0,
                        z: 0.0,
                    },
                    Velocity {
                        x: 1.0,
                        y: 1.0,
                        z: 1.0,
                    },
                ));
            }
            black_box(world.len())
        });
    });

    group.finish();
}

// Bench: attach/detach churn on a fixed entity set
fn bench_attach_detach(c: &mut Criterion) {
    let mut group = c.benchmark_group("attach_detach");

    group.bench_function("sparse_toggle_1k", |b| {
        let mut world = World::new();
        let entities: Vec<_> = (0..1_000)
            .map(|_| world.create_entity().unwrap())
            .collect();
        b.iter(|| {
            for &e in &entities {
                world.attach(e, Health(100)).unwrap();
            }
            for &e in &entities {
                world.detach::<Health>(e).unwrap();
            }
        });
    });

    group.finish();
}

// Bench: cached view iteration, warm cache vs rebuild every pass
fn bench_view_iter(c: &mut Criterion) {
    let mut group = c.benchmark_group("view_iter");

    let mut world = World::new();
    for i in 0..10_000 {
        let e = world.create_entity().unwrap();
        world
            .attach(
                e,
                Position {
                    x: i as f32,
                    y: 0.0,
                    z: 0.0,
                },
            )
            .unwrap();
        if i % 2 == 0 {
            world
                .attach(
                    e,
                    Velocity {
                        x: 1.0,
                        y: 0.0,
                        z: 0.0,
                    },
                )
                .unwrap();
        }
    }

    group.bench_function("sparse_view_10k_warm", |b| {
        // First pass builds the cache; timed passes reuse it
        world.view::<(Position, Velocity)>().each(|_, _, _| {});
        b.iter(|| {
            let mut sum = 0.0f32;
            world.view::<(Position, Velocity)>().each(|_, pos, vel| {
                pos.x += vel.x;
                sum += pos.x;
            });
            black_box(sum)
        });
    });

    let mut hecs_world = HecsWorld::new();
    for i in 0..10_000 {
        if i % 2 == 0 {
            hecs_world.spawn((
                Position {
                    x: i as f32,
                    y: 0.0,
                    z: 0.0,
                },
                Velocity {
                    x: 1.0,
                    y: 0.0,
                    z: 0.0,
                },
            ));
        } else {
            hecs_world.spawn((Position {
                x: i as f32,
                y: 0.0,
                z: 0.0,
            },));
        }
    }

    group.bench_function("hecs_query_10k", |b| {
        b.iter(|| {
            let mut sum = 0.0f32;
            for (_, (pos, vel)) in hecs_world.query_mut::<(&mut Position, &Velocity)>() {
                pos.x += vel.x;
                sum += pos.x;
            }
            black_box(sum)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_spawn, bench_attach_detach, bench_view_iter);
criterion_main!(benches);
