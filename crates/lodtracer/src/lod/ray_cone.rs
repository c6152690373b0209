use glam::{Vec2, Vec3};

/// Footprint of a ray approximated by a cone.
///
/// `width` is the cone diameter at the current origin, in world units, and `spread_angle`
/// how fast it grows per unit of distance.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RayCone {
    pub width: f32,
    pub spread_angle: f32,
}

impl RayCone {
    pub fn new(width: f32, spread_angle: f32) -> Self {
        Self {
            width,
            spread_angle,
        }
    }

    /// Move the cone apex `hit_t` further along the ray, then bend it by the curvature of
    /// the surface it lands on.
    pub fn propagate(&mut self, surface_spread_angle: f32, hit_t: f32) {
        self.width += self.spread_angle * hit_t;
        self.spread_angle += surface_spread_angle;
    }

    /// Texture independent level of detail at a hit. The texture adds
    /// `0.5 * log2(width * height)` on its own.
    pub fn compute_lod(&self, triangle_lod_constant: f32, ray_dir: Vec3, normal: Vec3) -> f32 {
        let distance_term = self.width.abs();
        let normal_term = ray_dir.dot(normal).abs();
        triangle_lod_constant + f32::log2(distance_term / normal_term)
    }
}

/// Ratio between texture space and world space area of a triangle, as a log2 lod offset.
pub fn triangle_lod_constant(positions: [Vec3; 3], tex_coords: [Vec2; 3]) -> f32 {
    let uv01 = tex_coords[1] - tex_coords[0];
    let uv02 = tex_coords[2] - tex_coords[0];
    let texture_area = uv01.perp_dot(uv02).abs();

    let world_area = (positions[1] - positions[0])
        .cross(positions[2] - positions[0])
        .length();

    0.5 * f32::log2(texture_area / world_area)
}

/// Spread angle added by surface curvature, estimated from screen space derivatives of the
/// normal and position. Convex surfaces widen the cone, concave ones narrow it.
pub fn surface_spread_angle(dn_dx: Vec3, dn_dy: Vec3, dp_dx: Vec3, dp_dy: Vec3) -> f32 {
    let beta = f32::sqrt(dn_dx.dot(dn_dx) + dn_dy.dot(dn_dy));
    let convexity = dn_dx.dot(dp_dx) + dn_dy.dot(dp_dy);
    if convexity < 0.0 {
        -2.0 * beta
    } else if convexity > 0.0 {
        2.0 * beta
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3};

    use super::{surface_spread_angle, triangle_lod_constant, RayCone};

    #[test]
    fn width_never_shrinks() {
        let mut cone = RayCone::new(0.0, 0.001);
        let mut last_width = cone.width;
        for (surface_spread, distance) in [(0.0, 1.0), (0.02, 4.5), (0.0, 0.0), (0.3, 12.0)] {
            cone.propagate(surface_spread, distance);
            assert!(cone.width >= last_width);
            last_width = cone.width;
        }
        assert!(last_width > 0.0);
    }

    #[test]
    fn propagate() {
        let mut cone = RayCone::new(0.5, 0.25);
        cone.propagate(0.1, 2.0);
        assert_eq!(cone, RayCone::new(1.0, 0.35));
    }

    #[test]
    fn lod_grows_with_grazing_angles_and_width() {
        let cone = RayCone::new(0.01, 0.0);
        let head_on = cone.compute_lod(0.0, Vec3::NEG_Y, Vec3::Y);
        let grazing = cone.compute_lod(0.0, Vec3::new(1.0, -0.1, 0.0).normalize(), Vec3::Y);
        assert!(grazing > head_on);

        let wider = RayCone::new(0.02, 0.0).compute_lod(0.0, Vec3::NEG_Y, Vec3::Y);
        assert!((wider - head_on - 1.0).abs() < 1e-5);
    }

    #[test]
    fn triangle_constant() {
        // 2x2 world units mapped to the whole [0, 1] uv square: uv area is 1/4 of world area
        let positions = [Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 2.0)];
        let uvs = [Vec2::ZERO, Vec2::X, Vec2::Y];
        assert!((triangle_lod_constant(positions, uvs) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn spread_angle_sign_follows_curvature() {
        // A sphere seen from outside: normals diverge along the position change
        let convex = surface_spread_angle(Vec3::X * 0.1, Vec3::ZERO, Vec3::X, Vec3::ZERO);
        let concave = surface_spread_angle(-Vec3::X * 0.1, Vec3::ZERO, Vec3::X, Vec3::ZERO);
        assert!((convex - 0.2).abs() < 1e-6);
        assert!((concave + 0.2).abs() < 1e-6);
    }

    #[test]
    fn spread_angle_without_convexity() {
        // normal change orthogonal to the position change
        let twisted = surface_spread_angle(Vec3::Y * 0.1, Vec3::ZERO, Vec3::X, Vec3::ZERO);
        assert_eq!(twisted, 0.0);
        assert_eq!(surface_spread_angle(Vec3::ZERO, Vec3::ZERO, Vec3::X, Vec3::Z), 0.0);
    }
}
