use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use proptest::prelude::*;

use spark_fountain::my_math::Vector3;
use spark_fountain::render::{HeadlessRenderer, Renderer};
use spark_fountain::{ParticleSystem, PhysicsParams, SimulationError, SimulationSettings};

fn scenario_settings(initial_y: f32, workers: usize) -> SimulationSettings {
    SimulationSettings {
        particle_count: 8,
        worker_count: workers,
        seed: 11,
        physics: PhysicsParams {
            gravity: 1.,
            air_resistance: 0.1,
            ground_level: 1.,
            ..PhysicsParams::default()
        },
        initial_position: Vector3::new(1.1, initial_y, 0.),
        initial_height_spread: 0.,
    }
}

#[test]
fn one_lane_group_falls_one_step() {
    let mut system: ParticleSystem<8> = ParticleSystem::new(&scenario_settings(-5., 2)).unwrap();
    let stats = system.step(2.).unwrap();

    assert_eq!(stats.frame, 1);
    assert_eq!(stats.respawned, 0);
    for i in 0..8 {
        let p = system.particle(i).unwrap();
        assert_eq!(p.velocity.y, 1.);
        assert_eq!(p.position.y, -4.);
        assert_eq!(p.position.x, 1.1);
    }
}

#[test]
fn crossing_the_ground_respawns_at_exact_height() {
    let mut system: ParticleSystem<8> = ParticleSystem::new(&scenario_settings(0.99, 1)).unwrap();
    let stats = system.step(2.).unwrap();

    assert_eq!(stats.respawned, 8);
    let respawn_y = system.physics().respawn_point.y;
    for i in 0..8 {
        let p = system.particle(i).unwrap();
        assert_eq!(p.position.y, respawn_y);
        assert!(p.position.y < system.physics().ground_level);
    }
}

#[test]
fn shutdown_of_parked_workers_does_not_hang() {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let settings = SimulationSettings {
            particle_count: 8 * 64,
            worker_count: 6,
            seed: 1,
            ..SimulationSettings::default()
        };
        let system: ParticleSystem = ParticleSystem::new(&settings).unwrap();
        tx.send(system.shutdown()).unwrap();
    });

    let result = rx
        .recv_timeout(Duration::from_secs(10))
        .expect("workers did not shut down");
    assert!(result.is_ok());
}

#[test]
fn dropping_a_running_system_joins_its_workers() {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let settings = SimulationSettings {
            particle_count: 8 * 64,
            worker_count: 3,
            seed: 2,
            ..SimulationSettings::default()
        };
        let mut system: ParticleSystem = ParticleSystem::new(&settings).unwrap();
        for _ in 0..20 {
            system.step(1. / 60.).unwrap();
        }
        drop(system);
        tx.send(()).unwrap();
    });
    rx.recv_timeout(Duration::from_secs(10))
        .expect("drop did not join workers");
}

#[test]
fn misaligned_population_is_refused() {
    let settings = SimulationSettings {
        particle_count: 1_001,
        worker_count: 2,
        ..SimulationSettings::default()
    };
    let result: Result<ParticleSystem<8>, _> = ParticleSystem::new(&settings);
    assert!(matches!(
        result,
        Err(SimulationError::LaneMisaligned { count: 1_001, lanes: 8 })
    ));
}

#[test]
fn same_seed_gives_same_state_for_same_worker_count() {
    let settings = SimulationSettings {
        particle_count: 4_096,
        worker_count: 4,
        seed: 1234,
        ..SimulationSettings::default()
    };
    let mut a: ParticleSystem = ParticleSystem::new(&settings).unwrap();
    let mut b: ParticleSystem = ParticleSystem::new(&settings).unwrap();
    for _ in 0..200 {
        a.step(1. / 60.).unwrap();
        b.step(1. / 60.).unwrap();
    }
    assert_eq!(a.store().export_render_view().y, b.store().export_render_view().y);
}

#[test]
fn long_run_keeps_every_particle_above_ground_and_finite() {
    let settings = SimulationSettings {
        particle_count: 8 * 1_000,
        worker_count: 5,
        seed: 77,
        ..SimulationSettings::default()
    };
    let mut system: ParticleSystem = ParticleSystem::new(&settings).unwrap();
    let mut renderer = HeadlessRenderer::new();
    let mut respawned = 0;

    for frame in 1..=600 {
        let stats = system.step(1. / 60.).unwrap();
        assert_eq!(stats.frame, frame);
        respawned += stats.respawned;
        renderer.upload_and_render(&system.render_view()).unwrap();
    }

    let ground = system.physics().ground_level;
    for i in 0..system.len() {
        let p = system.particle(i).unwrap();
        assert!(p.position.y <= ground);
        assert!(p.position.is_finite() && p.velocity.is_finite());
        assert!((0. ..1.).contains(&p.brightness));
    }
    assert!(respawned > 0);
    assert_eq!(renderer.frames(), 600);
    assert_eq!(renderer.uploaded_bytes().len(), system.len() * 16);
}

#[test]
fn reads_between_steps_are_stable() {
    let settings = SimulationSettings {
        particle_count: 8 * 32,
        worker_count: 3,
        seed: 5,
        ..SimulationSettings::default()
    };
    let mut system: ParticleSystem = ParticleSystem::new(&settings).unwrap();
    system.step(0.5).unwrap();

    let first: Vec<_> = (0..system.len()).map(|i| system.particle(i)).collect();
    let second: Vec<_> = (0..system.len()).map(|i| system.particle(i)).collect();
    assert_eq!(first, second);

    let view = system.render_view();
    for (i, p) in first.iter().enumerate() {
        let p = p.unwrap();
        assert_eq!(view.vertex(i).position, <[f32; 3]>::from(p.position));
        assert_eq!(view.vertex(i).brightness, p.brightness);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn partitions_cover_the_population_once(groups in 1usize..300, workers in 1usize..12) {
        let settings = SimulationSettings {
            particle_count: groups * 8,
            worker_count: workers,
            seed: 3,
            ..SimulationSettings::default()
        };
        let system: ParticleSystem = ParticleSystem::new(&settings).unwrap();
        let mut owners = vec![0u8; system.len()];
        for range in system.partitions() {
            for i in range.clone() {
                owners[i] += 1;
            }
        }
        prop_assert!(owners.iter().all(|&n| n == 1));
    }
}
