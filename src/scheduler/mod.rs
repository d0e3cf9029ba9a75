/*
    spark_fountain - A multithreaded particle fountain streamed to a point renderer.
    Copyright (C) 2022,2023  Ryan Andersen

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU General Public License as published by
    the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU General Public License for more details.

    You should have received a copy of the GNU General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

//! Fixed worker pool that advances a `ParticleStore` one frame at a time.

use std::ops::Range;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error, info, trace};

pub mod barrier;
pub mod partition;

use self::barrier::{FrameBarrier, WorkerEndpoint};
use crate::error::SimulationError;
use crate::my_math::Vector3;
use crate::particles::kernel;
use crate::particles::store::RawColumns;
use crate::particles::{FrameParams, ParticleSnapshot, ParticleStore, PhysicsParams, RenderView, LANE_WIDTH};

// Hardcoded default values
const DEFAULT_PARTICLE_COUNT: usize = 500_000;
const DEFAULT_INITIAL_POSITION: Vector3 = Vector3::new(1.1, 0.85, 0.);
const DEFAULT_INITIAL_HEIGHT_SPREAD: f32 = 10.;

/// Everything needed to build a `ParticleSystem`.
#[derive(Clone, Debug)]
pub struct SimulationSettings {
    pub particle_count: usize,
    pub worker_count: usize,
    pub seed: u64,
    pub physics: PhysicsParams,

    // Where particles wait before their first fall
    pub initial_position: Vector3,
    pub initial_height_spread: f32,
}
impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            particle_count: DEFAULT_PARTICLE_COUNT,
            worker_count: num_cpus::get(),
            seed: 0,
            physics: PhysicsParams::default(),
            initial_position: DEFAULT_INITIAL_POSITION,
            initial_height_spread: DEFAULT_INITIAL_HEIGHT_SPREAD,
        }
    }
}

/// Summary of one completed step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    pub respawned: usize,
    pub step_time: Duration,
}

// Sent to every worker to start a frame
#[derive(Copy, Clone)]
struct StepCommand<const W: usize> {
    frame: FrameParams,
    columns: RawColumns<W>,
}

enum WorkerReport {
    Finished {
        worker: usize,
        frame: u64,
        respawned: usize,
    },
    Panicked {
        worker: usize,
    },
}

/// A particle population together with the threads that update it.
///
/// Workers are spawned once, each owning a fixed contiguous range of lane groups, and park between
/// frames. `step` releases all of them and returns only after every one has reported back, so the
/// store is never observable mid-update. Dropping the system shuts the workers down and joins them.
pub struct ParticleSystem<const W: usize = LANE_WIDTH> {
    store: ParticleStore<W>,
    barrier: FrameBarrier<StepCommand<W>, WorkerReport>,
    workers: Vec<JoinHandle<()>>,
    partitions: Vec<Range<usize>>,
    physics: PhysicsParams,
    rng: StdRng,
    frame: u64,
    elapsed: f64,
}

// Body of each pool thread
type WorkerFn<const W: usize> =
    fn(usize, WorkerEndpoint<StepCommand<W>, WorkerReport>, Range<usize>, PhysicsParams, StdRng);

impl<const W: usize> ParticleSystem<W> {
    pub fn new(settings: &SimulationSettings) -> Result<Self, SimulationError> {
        Self::with_workers(settings, worker_loop::<W>)
    }

    fn with_workers(
        settings: &SimulationSettings,
        work: WorkerFn<W>,
    ) -> Result<Self, SimulationError> {
        if settings.worker_count == 0 {
            return Err(SimulationError::NoWorkers);
        }
        let physics = settings.physics;
        // A NaN height compares false and is refused too
        let respawns_below_ground = physics.respawn_point.y < physics.ground_level;
        if !respawns_below_ground {
            return Err(SimulationError::RespawnPastGround {
                respawn_y: physics.respawn_point.y,
                ground_level: physics.ground_level,
            });
        }

        let mut store = ParticleStore::<W>::allocate(settings.particle_count)?;
        let mut rng = StdRng::seed_from_u64(settings.seed);
        store.initialize(
            settings.initial_position,
            settings.initial_height_spread,
            &mut rng,
        );

        let group_ranges = partition::partition_ranges(store.groups(), settings.worker_count);
        let (barrier, endpoints) = FrameBarrier::new(settings.worker_count);
        let mut system = Self {
            store,
            barrier,
            workers: Vec::with_capacity(settings.worker_count),
            partitions: group_ranges
                .iter()
                .map(|groups| partition::groups_to_particles(groups, W))
                .collect(),
            physics,
            rng,
            frame: 0,
            elapsed: 0.,
        };

        // Workers that did spawn are stopped by `Drop` if a later one fails
        for (worker, (endpoint, groups)) in endpoints.into_iter().zip(group_ranges).enumerate() {
            let rng = StdRng::seed_from_u64(worker_seed(settings.seed, worker));
            let handle = thread::Builder::new()
                .name(format!("particle-worker-{worker}"))
                .spawn(move || work(worker, endpoint, groups, physics, rng))
                .map_err(|source| SimulationError::WorkerSpawn { worker, source })?;
            system.workers.push(handle);
        }

        info!(
            particles = system.len(),
            workers = system.workers.len(),
            lanes = W,
            "particle system started"
        );
        Ok(system)
    }

    /// Advance the whole population by one frame of `delta_time` seconds.
    ///
    /// The respawn point for this frame is derived from the accumulated elapsed time before any
    /// worker is released.
    pub fn step(&mut self, delta_time: f32) -> Result<FrameStats, SimulationError> {
        let started = Instant::now();
        self.frame += 1;
        self.elapsed += f64::from(delta_time);

        let expected = self.frame;
        let command = StepCommand {
            frame: self.physics.frame_params(expected, delta_time, self.elapsed),
            columns: self.store.raw_columns(),
        };

        // Always collect whatever was released, even on failure, so no worker is still writing
        // once this returns.
        let released = self.barrier.release(command);
        let mut respawned = 0;
        let mut failure = None;
        let collected = self.barrier.wait_all(|report| match report {
            WorkerReport::Finished {
                worker,
                frame,
                respawned: count,
            } => {
                if frame == expected {
                    respawned += count;
                } else {
                    failure.get_or_insert(SimulationError::BarrierViolation {
                        worker,
                        reported: frame,
                        expected,
                    });
                }
            }
            WorkerReport::Panicked { worker } => {
                failure.get_or_insert(SimulationError::WorkerPanicked { worker });
            }
        });
        released?;
        collected?;
        if let Some(err) = failure {
            return Err(err);
        }

        let stats = FrameStats {
            frame: expected,
            respawned,
            step_time: started.elapsed(),
        };
        trace!(
            frame = stats.frame,
            respawned = stats.respawned,
            step_us = stats.step_time.as_micros() as u64,
            "frame stepped"
        );
        Ok(stats)
    }

    pub fn render_view(&self) -> RenderView<'_> {
        self.store.export_render_view()
    }
    pub fn store(&self) -> &ParticleStore<W> {
        &self.store
    }

    pub fn particle(&self, index: usize) -> Option<ParticleSnapshot> {
        self.store.particle(index)
    }

    /// Respawn one particle at the current respawn point from the coordinator's random stream.
    pub fn respawn(&mut self, index: usize) {
        let point = self.physics.respawn_point_at(self.elapsed);
        self.store.respawn(index, point, &self.physics, &mut self.rng);
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
    pub fn frame(&self) -> u64 {
        self.frame
    }
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
    pub fn physics(&self) -> &PhysicsParams {
        &self.physics
    }
    pub fn worker_count(&self) -> usize {
        self.barrier.workers()
    }

    /// Particle index range owned by each worker, in worker order.
    pub fn partitions(&self) -> &[Range<usize>] {
        &self.partitions
    }

    /// Stop and join every worker.
    pub fn shutdown(mut self) -> Result<(), SimulationError> {
        self.stop_workers()
    }

    fn stop_workers(&mut self) -> Result<(), SimulationError> {
        if self.workers.is_empty() {
            return Ok(());
        }
        self.barrier.shutdown();

        let mut result = Ok(());
        for (worker, handle) in self.workers.drain(..).enumerate() {
            if handle.join().is_err() {
                error!(worker, "particle worker panicked");
                if result.is_ok() {
                    result = Err(SimulationError::WorkerPanicked { worker });
                }
            }
        }
        info!(frames = self.frame, "particle system shut down");
        result
    }
}

impl<const W: usize> Drop for ParticleSystem<W> {
    fn drop(&mut self) {
        let _ = self.stop_workers();
    }
}

// Distinct, reproducible stream per worker
fn worker_seed(seed: u64, worker: usize) -> u64 {
    seed ^ (worker as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

// Reports a panic to the coordinator so it is not left waiting for this worker
struct PanicNotice {
    worker: usize,
    done: Sender<WorkerReport>,
}
impl Drop for PanicNotice {
    fn drop(&mut self) {
        if thread::panicking() {
            let _ = self.done.send(WorkerReport::Panicked {
                worker: self.worker,
            });
        }
    }
}

fn worker_loop<const W: usize>(
    worker: usize,
    endpoint: WorkerEndpoint<StepCommand<W>, WorkerReport>,
    groups: Range<usize>,
    physics: PhysicsParams,
    mut rng: StdRng,
) {
    let _notice = PanicNotice {
        worker,
        done: endpoint.done_sender(),
    };
    debug!(worker, ?groups, "particle worker parked");

    let mut last_frame = 0;
    while let Some(StepCommand { frame, columns }) = endpoint.wait_start() {
        assert_eq!(
            frame.frame,
            last_frame + 1,
            "worker {worker} woke for frame {} after frame {last_frame}",
            frame.frame
        );
        last_frame = frame.frame;

        let respawned = if groups.is_empty() {
            0
        } else {
            // SAFETY: `step` keeps the store mutably borrowed until this worker reports back, and
            // partitions are disjoint, so these columns alias nothing else.
            let mut columns = unsafe { columns.slice(groups.clone()) };
            kernel::step_partition(&mut columns, &frame, &physics, &mut rng)
        };

        endpoint.post_done(WorkerReport::Finished {
            worker,
            frame: frame.frame,
            respawned,
        });
    }

    debug!(worker, frames = last_frame, "particle worker exiting");
}
