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

//! Consumers of the particle render view.
//!
//! A renderer receives the four attribute buffers once per frame and must be finished reading them
//! when `upload_and_render` returns, since the next step overwrites them in place.

pub mod ascii;
pub mod headless;

use crate::particles::RenderView;

pub use ascii::AsciiRenderer;
pub use headless::HeadlessRenderer;

pub trait Renderer {
    fn upload_and_render(&mut self, view: &RenderView<'_>) -> anyhow::Result<()>;

    /// What the most recent frame looked like, if the renderer tracks it.
    fn last_summary(&self) -> Option<FrameSummary> {
        None
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FrameSummary {
    pub particles: usize,
    pub visible: usize,
    pub mean_brightness: f32,
}

// Clip space spans [-1, 1] in x and y, with +y pointing down the screen
pub(crate) fn in_clip_space(x: f32, y: f32) -> bool {
    (-1. ..=1.).contains(&x) && (-1. ..=1.).contains(&y)
}

pub fn summarize(view: &RenderView<'_>) -> FrameSummary {
    let mut visible = 0;
    let mut brightness = 0.;
    for ((&x, &y), &b) in view.x.iter().zip(view.y).zip(view.brightness) {
        if in_clip_space(x, y) {
            visible += 1;
            brightness += f64::from(b);
        }
    }

    FrameSummary {
        particles: view.len(),
        visible,
        mean_brightness: if visible == 0 {
            0.
        } else {
            (brightness / visible as f64) as f32
        },
    }
}
