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

//! Multithreaded CPU particle fountain.
//!
//! A [`ParticleSystem`] owns a structure-of-arrays [`ParticleStore`] and a fixed pool of worker
//! threads. Each frame the caller invokes [`ParticleSystem::step`], which releases every worker on its
//! own partition and returns once all of them are done; the caller then hands
//! [`ParticleSystem::render_view`] to a [`render::Renderer`].

pub mod app_config;
pub mod error;
pub mod my_math;
pub mod particles;
pub mod render;
pub mod scheduler;

pub use error::SimulationError;
pub use particles::{ParticleStore, PhysicsParams, RenderView, LANE_WIDTH};
pub use scheduler::{FrameStats, ParticleSystem, SimulationSettings};
