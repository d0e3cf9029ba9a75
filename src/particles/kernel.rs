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

//! The per-frame numeric kernel, applied by each worker to its own partition.

use rand::Rng;

use super::lanes;
use super::physics::{FrameParams, PhysicsParams};
use super::store::Columns;

/// Advance every particle in `columns` by one step and respawn those that passed the ground.
/// Returns the number of respawned particles.
///
/// Each sub-step is a separate streaming pass over one or two columns:
/// damping, gravity, explicit Euler integration, then a masked respawn scan.
pub fn step_partition<R: Rng + ?Sized, const W: usize>(
    columns: &mut Columns<'_, W>,
    frame: &FrameParams,
    params: &PhysicsParams,
    rng: &mut R,
) -> usize {
    let step = frame.step_size;

    let damping = params.velocity_multiplier(step);
    lanes::scale(columns.vel_x, damping);
    lanes::scale(columns.vel_y, damping);
    lanes::scale(columns.vel_z, damping);

    lanes::add_scalar(columns.vel_y, params.gravity * step);

    lanes::add_scaled(columns.pos_x, columns.vel_x, step);
    lanes::add_scaled(columns.pos_y, columns.vel_y, step);
    lanes::add_scaled(columns.pos_z, columns.vel_z, step);

    let mut respawned = 0;
    for group in 0..columns.groups() {
        let mask = lanes::above_mask(&columns.pos_y[group], params.ground_level);
        if mask != 0 {
            respawned += columns.respawn_masked(group, mask, frame.respawn_point, params, rng);
        }
    }
    respawned
}
