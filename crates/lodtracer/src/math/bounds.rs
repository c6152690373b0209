use glam::Vec3;

use crate::ray::Ray;

/// Axis Aligned Bounding Box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Bounds {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn from_points(points: &[Vec3]) -> Self {
        points
            .iter()
            .fold(Self::EMPTY, |bounds, &point| bounds.grow(point))
    }

    pub fn grow(self, point: Vec3) -> Self {
        Self {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn diag(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn centroid(&self) -> Vec3 {
        0.5 * (self.min + self.max)
    }

    /// Index of the longest axis (0 = x, 1 = y, 2 = z)
    pub fn main_axis(&self) -> usize {
        let Vec3 { x, y, z } = self.diag();
        if x >= y && x >= z {
            0
        } else if y >= z {
            1
        } else {
            2
        }
    }

    /// Slab test. `inv_direction` is the component-wise inverse of the ray direction, infinities
    /// are fine.
    ///
    /// Returns the entry distance when the box overlaps the ray range.
    pub fn ray_intersect(&self, ray: &Ray, inv_direction: Vec3) -> Option<f32> {
        let t0 = (self.min - ray.origin) * inv_direction;
        let t1 = (self.max - ray.origin) * inv_direction;

        let t_min = t0.min(t1).max_element().max(ray.t_min);
        let t_max = t0.max(t1).min_element().min(ray.t_max);

        (t_min <= t_max).then_some(t_min)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::Bounds;
    use crate::ray::Ray;

    #[test]
    fn slab_test() {
        let bounds = Bounds::from_points(&[Vec3::splat(-1.0), Vec3::splat(1.0)]);
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        let t = bounds.ray_intersect(&ray, ray.direction.recip());
        assert_eq!(t, Some(4.0));

        let ray = Ray::new(Vec3::new(3.0, 0.0, -5.0), Vec3::Z);
        assert_eq!(bounds.ray_intersect(&ray, ray.direction.recip()), None);

        let ray = Ray::new_with_range(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 0.0..2.0);
        assert_eq!(bounds.ray_intersect(&ray, ray.direction.recip()), None);
    }

    #[test]
    fn main_axis() {
        let bounds = Bounds::from_points(&[Vec3::ZERO, Vec3::new(1.0, 3.0, 2.0)]);
        assert_eq!(bounds.main_axis(), 1);
    }
}
