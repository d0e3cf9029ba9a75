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

//! Structure-of-arrays particle storage and the per-partition update kernel.
//!
//! Every component lives in its own column of `[f32; W]` lane groups, where `W` is the lane width
//! the kernel processes together. The population size must be a whole number of lane groups.

pub mod kernel;
pub mod lanes;
pub mod physics;
pub mod store;
pub mod vertex;

pub use physics::{FrameParams, PhysicsParams};
pub use store::{Columns, ParticleSnapshot, ParticleStore};
pub use vertex::{ParticleVertex, RenderView};

/// Default number of particles processed together by one lane-group operation.
/// Eight `f32`s fill one 256-bit vector register.
pub const LANE_WIDTH: usize = 8;
