use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use spark_fountain::my_math::Vector3;
use spark_fountain::particles::kernel::step_partition;
use spark_fountain::{ParticleStore, ParticleSystem, PhysicsParams, SimulationSettings};

use rand::rngs::StdRng;
use rand::SeedableRng;

fn bench_kernel(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel_single_thread");
    let params = PhysicsParams::default();
    let frame = params.frame_params(1, 1. / 60., 0.);

    let mut wide = ParticleStore::<8>::allocate(100_000).unwrap();
    wide.initialize(Vector3::new(1.1, 0.85, 0.), 10., &mut StdRng::seed_from_u64(0));
    let mut scalar = ParticleStore::<1>::allocate(100_000).unwrap();
    scalar.initialize(Vector3::new(1.1, 0.85, 0.), 10., &mut StdRng::seed_from_u64(0));
    let mut rng = StdRng::seed_from_u64(1);

    group.bench_function("lanes_8", |bencher| {
        bencher.iter(|| black_box(step_partition(&mut wide.columns_mut(), &frame, &params, &mut rng)))
    });
    group.bench_function("lanes_1", |bencher| {
        bencher.iter(|| black_box(step_partition(&mut scalar.columns_mut(), &frame, &params, &mut rng)))
    });

    group.finish();
}

fn bench_system_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("system_step");

    for workers in [1, 2, num_cpus::get()] {
        let settings = SimulationSettings {
            particle_count: 500_000,
            worker_count: workers,
            seed: 9,
            ..SimulationSettings::default()
        };
        let mut system: ParticleSystem = ParticleSystem::new(&settings).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |bencher, _| {
            bencher.iter(|| black_box(system.step(1. / 60.).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_kernel, bench_system_step);
criterion_main!(benches);
