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

use super::{summarize, FrameSummary, Renderer};
use crate::particles::{ParticleVertex, RenderView};

/// Renderer without a display. Packs each frame into an interleaved vertex buffer, copies it out
/// as raw bytes the way a GPU upload would, and keeps a summary of what was on screen.
#[derive(Default)]
pub struct HeadlessRenderer {
    staging: Vec<ParticleVertex>,
    uploaded: Vec<u8>,
    summary: Option<FrameSummary>,
    frames: u64,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    // Bytes of the most recent upload
    pub fn uploaded_bytes(&self) -> &[u8] {
        &self.uploaded
    }
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Renderer for HeadlessRenderer {
    fn upload_and_render(&mut self, view: &RenderView<'_>) -> anyhow::Result<()> {
        // Every bound attribute buffer feeds the same vertex count
        for (binding, attribute) in view.attributes().iter().enumerate() {
            if attribute.len() != view.len() {
                anyhow::bail!(
                    "attribute binding {} holds {} values but the frame has {} particles",
                    binding,
                    attribute.len(),
                    view.len()
                );
            }
        }

        view.write_interleaved(&mut self.staging);
        self.uploaded.clear();
        self.uploaded
            .extend_from_slice(bytemuck::cast_slice(&self.staging));

        self.summary = Some(summarize(view));
        self.frames += 1;
        Ok(())
    }

    fn last_summary(&self) -> Option<FrameSummary> {
        self.summary
    }
}
