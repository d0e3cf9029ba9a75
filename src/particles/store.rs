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

use rand::Rng;

use super::lanes::{Lane, LaneWidth};
use super::physics::PhysicsParams;
use super::vertex::RenderView;
use super::LANE_WIDTH;
use crate::error::SimulationError;
use crate::my_math::Vector3;

/// Mutable borrow of a contiguous run of lane groups across all seven columns.
/// The store hands out one spanning everything; each worker gets one covering its partition.
pub struct Columns<'a, const W: usize> {
    pub pos_x: &'a mut [Lane<W>],
    pub pos_y: &'a mut [Lane<W>],
    pub pos_z: &'a mut [Lane<W>],
    pub brightness: &'a mut [Lane<W>],
    pub vel_x: &'a mut [Lane<W>],
    pub vel_y: &'a mut [Lane<W>],
    pub vel_z: &'a mut [Lane<W>],
}

impl<'a, const W: usize> Columns<'a, W> {
    pub fn groups(&self) -> usize {
        self.pos_x.len()
    }

    /// Respawn every lane of `group` whose bit is set in `mask`, lowest lane first.
    /// Returns the number of particles respawned.
    pub fn respawn_masked<R: Rng + ?Sized>(
        &mut self,
        group: usize,
        mask: u64,
        point: Vector3,
        params: &PhysicsParams,
        rng: &mut R,
    ) -> usize {
        let mut remaining = mask;
        while remaining != 0 {
            let lane = remaining.trailing_zeros() as usize;
            self.respawn_lane(group, lane, point, params, rng);
            remaining &= remaining - 1;
        }
        mask.count_ones() as usize
    }

    pub fn respawn_lane<R: Rng + ?Sized>(
        &mut self,
        group: usize,
        lane: usize,
        point: Vector3,
        params: &PhysicsParams,
        rng: &mut R,
    ) {
        self.pos_x[group][lane] = point.x;
        self.pos_y[group][lane] = point.y;
        self.pos_z[group][lane] = point.z;
        self.brightness[group][lane] = rng.gen();

        let velocity = params.spawn_velocity(rng);
        self.vel_x[group][lane] = velocity.x;
        self.vel_y[group][lane] = velocity.y;
        self.vel_z[group][lane] = velocity.z;
    }
}

/// Base pointers of every column, captured from a mutably borrowed store so that worker threads
/// can each rebuild a `Columns` over their own partition.
#[derive(Copy, Clone)]
pub(crate) struct RawColumns<const W: usize> {
    pos_x: *mut Lane<W>,
    pos_y: *mut Lane<W>,
    pos_z: *mut Lane<W>,
    brightness: *mut Lane<W>,
    vel_x: *mut Lane<W>,
    vel_y: *mut Lane<W>,
    vel_z: *mut Lane<W>,
    groups: usize,
}

// SAFETY: the pointers are only dereferenced through `RawColumns::slice`, whose contract requires
// the store to stay borrowed and the requested ranges to be disjoint between threads.
unsafe impl<const W: usize> Send for RawColumns<W> {}

impl<const W: usize> RawColumns<W> {
    /// Rebuild mutable columns over `groups`.
    ///
    /// # Safety
    /// The store these pointers came from must remain exclusively borrowed, unmoved and unresized
    /// for all of `'a`, and no other live `Columns` may overlap `groups` during that time.
    pub(crate) unsafe fn slice<'a>(&self, groups: Range<usize>) -> Columns<'a, W> {
        assert!(
            groups.start <= groups.end && groups.end <= self.groups,
            "partition {groups:?} exceeds the {} available lane groups",
            self.groups
        );
        let start = groups.start;
        let len = groups.end - groups.start;
        // SAFETY: range checked above, exclusivity upheld by the caller.
        unsafe {
            Columns {
                pos_x: column(self.pos_x, start, len),
                pos_y: column(self.pos_y, start, len),
                pos_z: column(self.pos_z, start, len),
                brightness: column(self.brightness, start, len),
                vel_x: column(self.vel_x, start, len),
                vel_y: column(self.vel_y, start, len),
                vel_z: column(self.vel_z, start, len),
            }
        }
    }
}

unsafe fn column<'a, const W: usize>(base: *mut Lane<W>, start: usize, len: usize) -> &'a mut [Lane<W>] {
    std::slice::from_raw_parts_mut(base.add(start), len)
}

/// A copy of one particle's fields, gathered from the columns.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ParticleSnapshot {
    pub position: Vector3,
    pub brightness: f32,
    pub velocity: Vector3,
}

/// Authoritative particle state in structure-of-arrays layout.
///
/// Allocated once with a fixed population; the columns are never resized afterwards, which is what
/// lets the scheduler hand raw column pointers to its workers.
#[derive(Clone, Debug)]
pub struct ParticleStore<const W: usize = LANE_WIDTH> {
    pos_x: Vec<Lane<W>>,
    pos_y: Vec<Lane<W>>,
    pos_z: Vec<Lane<W>>,
    brightness: Vec<Lane<W>>,
    vel_x: Vec<Lane<W>>,
    vel_y: Vec<Lane<W>>,
    vel_z: Vec<Lane<W>>,
}

impl<const W: usize> ParticleStore<W> {
    /// Reserve zeroed columns for `count` particles. `count` must be a non-zero multiple of `W`;
    /// anything else is refused rather than padded.
    pub fn allocate(count: usize) -> Result<Self, SimulationError> {
        #[allow(clippy::let_unit_value)]
        let () = LaneWidth::<W>::VALID;

        if count == 0 {
            return Err(SimulationError::EmptyPopulation);
        }
        if count % W != 0 {
            return Err(SimulationError::LaneMisaligned { count, lanes: W });
        }

        let groups = count / W;
        let column = || vec![[0.; W]; groups];
        Ok(Self {
            pos_x: column(),
            pos_y: column(),
            pos_z: column(),
            brightness: column(),
            vel_x: column(),
            vel_y: column(),
            vel_z: column(),
        })
    }

    pub fn len(&self) -> usize {
        self.pos_x.len() * W
    }
    pub fn is_empty(&self) -> bool {
        self.pos_x.is_empty()
    }
    pub fn groups(&self) -> usize {
        self.pos_x.len()
    }

    /// Place every particle at rest above the frame so the population trickles into view.
    /// `x` and `z` come from `origin`; heights are spread uniformly over `(origin.y - height_spread, origin.y]`.
    pub fn initialize<R: Rng + ?Sized>(&mut self, origin: Vector3, height_spread: f32, rng: &mut R) {
        self.pos_x.iter_mut().flatten().for_each(|x| *x = origin.x);
        for y in self.pos_y.iter_mut().flatten() {
            *y = origin.y - rng.gen::<f32>() * height_spread;
        }
        self.pos_z.iter_mut().flatten().for_each(|z| *z = origin.z);

        self.brightness.fill([0.; W]);
        self.vel_x.fill([0.; W]);
        self.vel_y.fill([0.; W]);
        self.vel_z.fill([0.; W]);
    }

    /// Reset particle `index` to `point` with a fresh brightness and launch velocity.
    ///
    /// # Panics
    /// If `index` is out of range.
    pub fn respawn<R: Rng + ?Sized>(
        &mut self,
        index: usize,
        point: Vector3,
        params: &PhysicsParams,
        rng: &mut R,
    ) {
        let (group, lane) = self.locate(index);
        self.columns_mut()
            .respawn_lane(group, lane, point, params, rng);
    }

    /// Respawn the lanes of one group selected by `mask`. Returns how many were respawned.
    pub fn respawn_group<R: Rng + ?Sized>(
        &mut self,
        group: usize,
        mask: u64,
        point: Vector3,
        params: &PhysicsParams,
        rng: &mut R,
    ) -> usize {
        self.columns_mut()
            .respawn_masked(group, mask, point, params, rng)
    }

    pub fn export_render_view(&self) -> RenderView<'_> {
        RenderView {
            x: bytemuck::cast_slice(&self.pos_x),
            y: bytemuck::cast_slice(&self.pos_y),
            z: bytemuck::cast_slice(&self.pos_z),
            brightness: bytemuck::cast_slice(&self.brightness),
        }
    }

    pub fn particle(&self, index: usize) -> Option<ParticleSnapshot> {
        if index >= self.len() {
            return None;
        }
        let (g, l) = (index / W, index % W);
        Some(ParticleSnapshot {
            position: Vector3::new(self.pos_x[g][l], self.pos_y[g][l], self.pos_z[g][l]),
            brightness: self.brightness[g][l],
            velocity: Vector3::new(self.vel_x[g][l], self.vel_y[g][l], self.vel_z[g][l]),
        })
    }

    /// Overwrite every field of particle `index`.
    ///
    /// # Panics
    /// If `index` is out of range.
    pub fn set_particle(&mut self, index: usize, particle: ParticleSnapshot) {
        let (g, l) = self.locate(index);
        self.pos_x[g][l] = particle.position.x;
        self.pos_y[g][l] = particle.position.y;
        self.pos_z[g][l] = particle.position.z;
        self.brightness[g][l] = particle.brightness;
        self.vel_x[g][l] = particle.velocity.x;
        self.vel_y[g][l] = particle.velocity.y;
        self.vel_z[g][l] = particle.velocity.z;
    }

    pub fn columns_mut(&mut self) -> Columns<'_, W> {
        Columns {
            pos_x: &mut self.pos_x,
            pos_y: &mut self.pos_y,
            pos_z: &mut self.pos_z,
            brightness: &mut self.brightness,
            vel_x: &mut self.vel_x,
            vel_y: &mut self.vel_y,
            vel_z: &mut self.vel_z,
        }
    }

    pub(crate) fn raw_columns(&mut self) -> RawColumns<W> {
        RawColumns {
            pos_x: self.pos_x.as_mut_ptr(),
            pos_y: self.pos_y.as_mut_ptr(),
            pos_z: self.pos_z.as_mut_ptr(),
            brightness: self.brightness.as_mut_ptr(),
            vel_x: self.vel_x.as_mut_ptr(),
            vel_y: self.vel_y.as_mut_ptr(),
            vel_z: self.vel_z.as_mut_ptr(),
            groups: self.groups(),
        }
    }

    fn locate(&self, index: usize) -> (usize, usize) {
        assert!(
            index < self.len(),
            "particle index {index} out of range for a population of {}",
            self.len()
        );
        (index / W, index % W)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0x5eed)
    }

    #[test]
    fn allocate_rejects_misaligned_counts() {
        assert!(matches!(
            ParticleStore::<8>::allocate(12),
            Err(SimulationError::LaneMisaligned { count: 12, lanes: 8 })
        ));
        assert!(matches!(
            ParticleStore::<8>::allocate(0),
            Err(SimulationError::EmptyPopulation)
        ));
        assert_eq!(ParticleStore::<4>::allocate(12).unwrap().groups(), 3);
        assert_eq!(ParticleStore::<1>::allocate(7).unwrap().len(), 7);
    }

    #[test]
    fn initialize_places_particles_above_the_frame_at_rest() {
        let mut store = ParticleStore::<8>::allocate(256).unwrap();
        let origin = Vector3::new(1.1, 0.85, 0.);
        store.initialize(origin, 10., &mut rng());

        for i in 0..store.len() {
            let p = store.particle(i).unwrap();
            assert_eq!(p.position.x, 1.1);
            assert_eq!(p.position.z, 0.);
            assert!(p.position.y <= 0.85 && p.position.y > 0.85 - 10.);
            assert_eq!(p.velocity, Vector3::default());
        }
    }

    #[test]
    fn respawn_resets_exactly_one_particle() {
        let params = PhysicsParams::default();
        let mut store = ParticleStore::<8>::allocate(16).unwrap();
        store.initialize(Vector3::new(1.1, 0.85, 0.), 10., &mut rng());
        let before = store.clone();

        store.respawn(9, params.respawn_point, &params, &mut rng());

        let p = store.particle(9).unwrap();
        assert_eq!(p.position, params.respawn_point);
        assert!(p.position.y < params.ground_level);
        assert!((0. ..1.).contains(&p.brightness));
        for i in (0..16).filter(|&i| i != 9) {
            assert_eq!(store.particle(i), before.particle(i));
        }
    }

    #[test]
    fn respawn_group_only_touches_masked_lanes() {
        let params = PhysicsParams::default();
        let mut store = ParticleStore::<4>::allocate(8).unwrap();
        let count = store.respawn_group(1, 0b1010, params.respawn_point, &params, &mut rng());

        assert_eq!(count, 2);
        for i in 0..8 {
            let p = store.particle(i).unwrap();
            if i == 5 || i == 7 {
                assert_eq!(p.position, params.respawn_point);
                assert_ne!(p.velocity, Vector3::default());
            } else {
                assert_eq!(p, ParticleSnapshot::default());
            }
        }
    }

    #[test]
    fn render_view_aliases_columns_in_index_order() {
        let mut store = ParticleStore::<4>::allocate(8).unwrap();
        for i in 0..8 {
            let f = i as f32;
            store.set_particle(
                i,
                ParticleSnapshot {
                    position: Vector3::new(f, f + 10., f + 20.),
                    brightness: f / 8.,
                    velocity: Vector3::new(-f, 0., 0.),
                },
            );
        }

        let view = store.export_render_view();
        assert_eq!(view.len(), 8);
        for i in 0..8 {
            let p = store.particle(i).unwrap();
            assert_eq!(view.x[i], p.position.x);
            assert_eq!(view.y[i], p.position.y);
            assert_eq!(view.z[i], p.position.z);
            assert_eq!(view.brightness[i], p.brightness);
        }
        assert_eq!(view.x.as_ptr(), store.export_render_view().x.as_ptr());
    }

    #[test]
    fn particle_out_of_range_is_none() {
        let store = ParticleStore::<8>::allocate(8).unwrap();
        assert!(store.particle(8).is_none());
    }

    #[test]
    fn raw_slices_cover_requested_groups() {
        let mut store = ParticleStore::<2>::allocate(8).unwrap();
        let raw = store.raw_columns();
        {
            // SAFETY: `store` is not touched while these disjoint columns are alive.
            let mut low = unsafe { raw.slice(0..1) };
            let mut high = unsafe { raw.slice(1..4) };
            low.pos_x[0] = [1., 1.];
            high.pos_x.iter_mut().for_each(|lane| *lane = [2., 2.]);
            assert_eq!(high.groups(), 3);
        }
        let view = store.export_render_view();
        assert_eq!(view.x.to_vec(), vec![1f32, 1., 2., 2., 2., 2., 2., 2.]);
    }

    proptest! {
        #[test]
        fn respawned_particles_land_below_ground(
            elapsed in 0.0f64..10_000.,
            seed in any::<u64>(),
            index in 0usize..64,
        ) {
            let params = PhysicsParams::default();
            let mut store = ParticleStore::<8>::allocate(64).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);
            let point = params.respawn_point_at(elapsed);
            store.respawn(index, point, &params, &mut rng);

            let p = store.particle(index).unwrap();
            prop_assert_eq!(p.position.y, params.respawn_point.y);
            prop_assert!(p.position.y < params.ground_level);
            prop_assert!(p.velocity.is_finite());
            prop_assert!((0. ..1.).contains(&p.brightness));
        }
    }
}
