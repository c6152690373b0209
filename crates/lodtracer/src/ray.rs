use std::ops::Range;

use glam::Vec3;

/// A ray segment, only hits with `t_min <= t <= t_max` count.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub t_min: f32,
    pub t_max: f32,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self::new_with_range(origin, direction, 0.0..f32::INFINITY)
    }

    pub fn new_with_range(origin: Vec3, direction: Vec3, range: Range<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
            t_min: range.start,
            t_max: range.end,
        }
    }

    pub fn contains(&self, t: f32) -> bool {
        (self.t_min..=self.t_max).contains(&t)
    }
}
