//! The periodic simulation box (spec §3 "Spatial grid", §4.1).
//!
//! Adapted from the teacher's `simulation_box.rs`, which wraps an
//! `Extent` and implements periodic wrap/distance the same way: wrap
//! each axis independently via `rem_euclid`, and minimize each
//! component of a separation vector against the box side length.
use glam::DVec3;

#[derive(Debug, Clone, Copy)]
pub struct Extent {
    pub min: DVec3,
    pub max: DVec3,
}

impl Extent {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        debug_assert!(min.x < max.x && min.y < max.y && min.z < max.z);
        Self { min, max }
    }

    pub fn cube_from_side_length(side_length: f64) -> Self {
        Self::new(DVec3::ZERO, DVec3::splat(side_length))
    }

    pub fn side_lengths(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn contains(&self, pos: DVec3) -> bool {
        pos.x >= self.min.x
            && pos.x < self.max.x
            && pos.y >= self.min.y
            && pos.y < self.max.y
            && pos.z >= self.min.z
            && pos.z < self.max.z
    }
}

fn periodic_wrap_component(v: f64, min: f64, max: f64) -> f64 {
    (v - min).rem_euclid(max - min) + min
}

/// Minimum-image convention: picks whichever of `v` and its periodic
/// image one box length away is closer to zero.
fn minimize_component(v: f64, length: f64) -> f64 {
    if v < 0.0 {
        if v.abs() < (v + length).abs() {
            v
        } else {
            v + length
        }
    } else if v.abs() < (v - length).abs() {
        v
    } else {
        v - length
    }
}

/// The simulation box (periodic boundary conditions apply beyond it,
/// spec §3/§4.4).
#[derive(Debug, Clone, Copy)]
pub struct SimulationBox(pub Extent);

impl SimulationBox {
    pub fn cube_from_side_length(side_length: f64) -> Self {
        Self(Extent::cube_from_side_length(side_length))
    }

    pub fn side_lengths(&self) -> DVec3 {
        self.0.side_lengths()
    }

    pub fn periodic_wrap(&self, pos: DVec3) -> DVec3 {
        DVec3::new(
            periodic_wrap_component(pos.x, self.0.min.x, self.0.max.x),
            periodic_wrap_component(pos.y, self.0.min.y, self.0.max.y),
            periodic_wrap_component(pos.z, self.0.min.z, self.0.max.z),
        )
    }

    pub fn periodic_distance_vec(&self, p1: DVec3, p2: DVec3) -> DVec3 {
        let dist = p1 - p2;
        let side = self.side_lengths();
        DVec3::new(
            minimize_component(dist.x, side.x),
            minimize_component(dist.y, side.y),
            minimize_component(dist.z, side.z),
        )
    }

    pub fn periodic_distance(&self, p1: DVec3, p2: DVec3) -> f64 {
        self.periodic_distance_vec(p1, p2).length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn periodic_wrap_brings_points_back_into_the_box() {
        let box_ = SimulationBox(Extent::new(DVec3::ZERO, DVec3::new(1.0, 2.0, 3.0)));
        let wrapped = box_.periodic_wrap(DVec3::new(1.5, 2.5, 3.5));
        close(wrapped.x, 0.5);
        close(wrapped.y, 0.5);
        close(wrapped.z, 0.5);
    }

    #[test]
    fn periodic_distance_wraps_around_the_boundary() {
        let box_ = SimulationBox(Extent::new(DVec3::ZERO, DVec3::new(1.0, 2.0, 3.0)));
        let d = box_.periodic_distance(DVec3::new(0.1, 0.0, 0.0), DVec3::new(0.9, 0.0, 0.0));
        close(d, 0.2);
    }

    #[test]
    fn periodic_distance_is_symmetric() {
        let box_ = SimulationBox(Extent::new(DVec3::ZERO, DVec3::new(1.0, 2.0, 3.0)));
        let p1 = DVec3::new(0.05, 1.9, 2.95);
        let p2 = DVec3::new(0.95, 0.1, 0.1);
        close(box_.periodic_distance(p1, p2), box_.periodic_distance(p2, p1));
    }
}
