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

use std::ops::Range;

/// Split `0..len` into `parts` contiguous, non-overlapping ranges whose sizes differ by at most one.
/// When `parts > len` the surplus ranges are empty.
pub fn partition_ranges(len: usize, parts: usize) -> Vec<Range<usize>> {
    assert!(parts > 0, "cannot partition into zero ranges");
    (0..parts)
        .map(|i| (i * len) / parts..((i + 1) * len) / parts)
        .collect()
}

/// Scale a range of lane groups to the particle indices it covers.
pub fn groups_to_particles(groups: &Range<usize>, lanes: usize) -> Range<usize> {
    groups.start * lanes..groups.end * lanes
}
