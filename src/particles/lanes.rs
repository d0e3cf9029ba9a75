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

//! Streaming arithmetic over columns of lane groups.
//!
//! Each helper walks one column front to back with a fixed-width inner loop, which the compiler
//! lowers to packed vector instructions for the common widths.

/// One lane group of a single component.
pub type Lane<const W: usize> = [f32; W];

/// Compile-time guard for lane widths the kernel supports. Bit masks are tracked in a `u64`.
pub(crate) struct LaneWidth<const W: usize>;
impl<const W: usize> LaneWidth<W> {
    pub(crate) const VALID: () = assert!(W > 0 && W <= 64, "lane width must be within 1..=64");
}

#[inline]
pub fn scale<const W: usize>(column: &mut [Lane<W>], k: f32) {
    for lane in column {
        for v in lane.iter_mut() {
            *v *= k;
        }
    }
}

#[inline]
pub fn add_scalar<const W: usize>(column: &mut [Lane<W>], k: f32) {
    for lane in column {
        for v in lane.iter_mut() {
            *v += k;
        }
    }
}

/// `dst += src * k`, lane by lane.
#[inline]
pub fn add_scaled<const W: usize>(dst: &mut [Lane<W>], src: &[Lane<W>], k: f32) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.iter_mut().zip(src) {
        for l in 0..W {
            d[l] += s[l] * k;
        }
    }
}

/// Bit `l` is set when lane `l` is strictly greater than `threshold`.
#[inline]
pub fn above_mask<const W: usize>(lane: &Lane<W>, threshold: f32) -> u64 {
    let mut mask = 0;
    for (l, v) in lane.iter().enumerate() {
        mask |= u64::from(*v > threshold) << l;
    }
    mask
}
