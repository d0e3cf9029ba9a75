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

use thiserror::Error;

use crate::scheduler::barrier::BarrierError;

/// Failures surfaced by the particle core. None of these are recoverable mid-run; callers are
/// expected to report them and exit.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("particle count must be non-zero")]
    EmptyPopulation,

    #[error("particle count {count} is not a multiple of the lane width {lanes}")]
    LaneMisaligned { count: usize, lanes: usize },

    #[error("worker count must be at least one")]
    NoWorkers,

    #[error("respawn height {respawn_y} must lie below the ground level {ground_level}")]
    RespawnPastGround { respawn_y: f32, ground_level: f32 },

    #[error("failed to spawn particle worker {worker}")]
    WorkerSpawn {
        worker: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("particle worker {worker} panicked")]
    WorkerPanicked { worker: usize },

    #[error("particle worker {worker} reported frame {reported} while frame {expected} was in flight")]
    BarrierViolation {
        worker: usize,
        reported: u64,
        expected: u64,
    },

    #[error(transparent)]
    Barrier(#[from] BarrierError),
}
