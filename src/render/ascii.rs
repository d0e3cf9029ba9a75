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

use std::io::Write;

use super::{in_clip_space, summarize, FrameSummary, Renderer};
use crate::particles::RenderView;

// Darkest to brightest
const RAMP: &[u8] = b" .:-=+*#%@";

/// Orthographic point rasterizer onto a character grid. Each cell accumulates the brightness of the
/// particles that land in it; the frame is then shaded relative to its brightest cell.
pub struct AsciiRenderer<Out: Write> {
    out: Out,
    width: usize,
    height: usize,
    cells: Vec<f32>,
    frame: Vec<u8>,
    summary: Option<FrameSummary>,
}

impl<Out: Write> AsciiRenderer<Out> {
    pub fn new(out: Out, width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0, "ascii surface must not be empty");
        Self {
            out,
            width,
            height,
            cells: vec![0.; width * height],
            frame: Vec::with_capacity((width + 1) * height + 8),
            summary: None,
        }
    }

    pub fn into_inner(self) -> Out {
        self.out
    }

    fn rasterize(&mut self, view: &RenderView<'_>) {
        self.cells.fill(0.);
        let (w, h) = (self.width as f32, self.height as f32);
        for ((&x, &y), &b) in view.x.iter().zip(view.y).zip(view.brightness) {
            if !in_clip_space(x, y) {
                continue;
            }
            let col = (((x + 1.) * 0.5 * w) as usize).min(self.width - 1);
            let row = (((y + 1.) * 0.5 * h) as usize).min(self.height - 1);
            self.cells[row * self.width + col] += b;
        }
    }

    fn shade(&mut self) {
        let peak = self.cells.iter().copied().fold(0., f32::max);
        let top = (RAMP.len() - 1) as f32;

        self.frame.clear();
        self.frame.extend_from_slice(b"\x1b[H"); // Cursor home, draw over the previous frame
        for row in self.cells.chunks_exact(self.width) {
            for &cell in row {
                let level = if peak > 0. { (cell / peak).sqrt() } else { 0. };
                self.frame.push(RAMP[(level * top).round() as usize]);
            }
            self.frame.push(b'\n');
        }
    }
}

impl<Out: Write> Renderer for AsciiRenderer<Out> {
    fn upload_and_render(&mut self, view: &RenderView<'_>) -> anyhow::Result<()> {
        self.rasterize(view);
        self.shade();
        self.out.write_all(&self.frame)?;
        self.out.flush()?;

        self.summary = Some(summarize(view));
        Ok(())
    }

    fn last_summary(&self) -> Option<FrameSummary> {
        self.summary
    }
}
