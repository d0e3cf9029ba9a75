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

use bytemuck::{Pod, Zeroable};

/// Interleaved vertex for renderers that bind one stream: 16 bytes per particle.
#[repr(C)]
#[derive(Default, Copy, Clone, Debug, PartialEq, Zeroable, Pod)]
pub struct ParticleVertex {
    pub position: [f32; 3],
    pub brightness: f32,
}

/// Renderer-facing view of the population: one contiguous buffer per attribute, index aligned.
/// Borrowed straight out of the particle columns, so building one never copies.
#[derive(Copy, Clone, Debug)]
pub struct RenderView<'a> {
    pub x: &'a [f32],
    pub y: &'a [f32],
    pub z: &'a [f32],
    pub brightness: &'a [f32],
}

impl<'a> RenderView<'a> {
    pub fn len(&self) -> usize {
        self.x.len()
    }
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    // Attribute buffers in binding order (x, y, z, brightness)
    pub fn attributes(&self) -> [&'a [f32]; 4] {
        [self.x, self.y, self.z, self.brightness]
    }

    pub fn vertex(&self, index: usize) -> ParticleVertex {
        ParticleVertex {
            position: [self.x[index], self.y[index], self.z[index]],
            brightness: self.brightness[index],
        }
    }

    /// Pack the view into `out` as interleaved vertices, reusing its allocation.
    pub fn write_interleaved(&self, out: &mut Vec<ParticleVertex>) {
        out.clear();
        out.extend(
            self.x
                .iter()
                .zip(self.y)
                .zip(self.z)
                .zip(self.brightness)
                .map(|(((&x, &y), &z), &brightness)| ParticleVertex {
                    position: [x, y, z],
                    brightness,
                }),
        );
    }
}
