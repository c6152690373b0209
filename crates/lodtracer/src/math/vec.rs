use glam::Vec3;

pub trait ReflectVecExt {
    /// Mirror `self` about `normal`. `normal` is expected to be normalized.
    fn reflect(self, normal: Vec3) -> Vec3;
}

impl ReflectVecExt for Vec3 {
    fn reflect(self, normal: Vec3) -> Vec3 {
        self - (2.0 * self.dot(normal) * normal)
    }
}

pub trait Vec3SameDirExt {
    fn same_direction(self, other: Self) -> Self;
}

impl Vec3SameDirExt for Vec3 {
    /// Return self if self and other are pointing in the same general direction (self.dot(other) >= 0.0) else, returns -self
    fn same_direction(self, other: Self) -> Self {
        if self.dot(other) >= 0.0 {
            self
        } else {
            -self
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::{ReflectVecExt, Vec3SameDirExt};

    #[test]
    fn reflect_keeps_tangent_part() {
        let d = Vec3::new(1.0, -1.0, 0.0).normalize();
        let r = d.reflect(Vec3::Y);
        assert!((r - Vec3::new(1.0, 1.0, 0.0).normalize()).length() < 1e-6);
    }

    #[test]
    fn same_direction() {
        assert_eq!(Vec3::Y.same_direction(Vec3::new(0.3, 0.1, 0.0)), Vec3::Y);
        assert_eq!(Vec3::Y.same_direction(Vec3::NEG_Y), Vec3::NEG_Y);
    }
}
