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

use rand::Rng;

use crate::my_math::Vector3;

// Hardcoded default values
const DEFAULT_GRAVITY: f32 = 1.;
const DEFAULT_AIR_RESISTANCE: f32 = 0.1;
const DEFAULT_GROUND_LEVEL: f32 = 1.;
const DEFAULT_STEP_SCALE: f32 = 0.5; // Half-step integration reads smoother than a full step
const DEFAULT_RESPAWN_POINT: Vector3 = Vector3::new(-0.8, -0.1, 0.95);
const DEFAULT_RESPAWN_SWAY: f32 = 0.1;
const DEFAULT_SPAWN_VELOCITY_BASE: Vector3 = Vector3::new(0.4, -1., -0.1);
const DEFAULT_SPAWN_VELOCITY_JITTER: f32 = 0.3;

/// Fixed physical constants of one simulation, chosen at construction.
///
/// Heights grow downward: gravity pulls `y` towards positive values and a particle whose `y`
/// exceeds `ground_level` has hit the ground.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PhysicsParams {
    pub gravity: f32,
    pub air_resistance: f32,
    pub ground_level: f32,

    /// Fraction of the frame's delta time used as the integration step.
    pub step_scale: f32,

    /// Respawn point at elapsed time zero. Its `x` sways sinusoidally as time passes.
    pub respawn_point: Vector3,
    pub respawn_sway: f32,

    pub spawn_velocity_base: Vector3,
    pub spawn_velocity_jitter: f32,
}
impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            air_resistance: DEFAULT_AIR_RESISTANCE,
            ground_level: DEFAULT_GROUND_LEVEL,
            step_scale: DEFAULT_STEP_SCALE,
            respawn_point: DEFAULT_RESPAWN_POINT,
            respawn_sway: DEFAULT_RESPAWN_SWAY,
            spawn_velocity_base: DEFAULT_SPAWN_VELOCITY_BASE,
            spawn_velocity_jitter: DEFAULT_SPAWN_VELOCITY_JITTER,
        }
    }
}

impl PhysicsParams {
    /// Build the shared inputs for one frame. Computed once by the coordinator, read by every worker.
    pub fn frame_params(&self, frame: u64, delta_time: f32, elapsed: f64) -> FrameParams {
        FrameParams {
            frame,
            step_size: delta_time * self.step_scale,
            respawn_point: self.respawn_point_at(elapsed),
        }
    }

    pub fn respawn_point_at(&self, elapsed: f64) -> Vector3 {
        Vector3 {
            x: self.respawn_point.x + (elapsed as f32).sin() * self.respawn_sway,
            ..self.respawn_point
        }
    }

    // Exponential damping factor applied to every velocity component once per step
    pub fn velocity_multiplier(&self, step_size: f32) -> f32 {
        1. - step_size * self.air_resistance
    }

    /// Draw a fresh launch velocity: the base vector plus a perturbation of random direction whose
    /// magnitude lies in `[0.05, 1.0] * spawn_velocity_jitter`.
    pub fn spawn_velocity<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector3 {
        let direction = Vector3::new(
            rng.gen::<f32>() - 0.5,
            rng.gen::<f32>() - 0.5,
            rng.gen::<f32>() - 0.5,
        )
        .norm();
        let magnitude = self.spawn_velocity_jitter * (0.05 + 0.95 * rng.gen::<f32>());
        self.spawn_velocity_base + magnitude * direction
    }
}

/// Per-frame inputs shared read-only by all workers during a step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameParams {
    pub frame: u64,
    pub step_size: f32,
    pub respawn_point: Vector3,
}
