use glam::Vec3;

pub trait FloatAsExt {
    /// Returns `Some(f)` is f is finite else returns None
    /// The result value is guaranted to be finite
    ///
    /// Returns None for NaN and +/- infty
    fn into_finite(self) -> Option<f32>;
}

impl FloatAsExt for f32 {
    fn into_finite(self) -> Option<f32> {
        self.is_finite().then_some(self)
    }
}

/// Offset a surface position along `normal` so that a ray leaving from it
/// does not re-intersect the surface it starts on.
///
/// Positions far from the origin are moved by a fixed number of ulps, those
/// close to it by a small fixed float offset. See Wächter and Binder, "A Fast
/// and Robust Method for Avoiding Self-Intersection", Ray Tracing Gems (2019).
pub fn offset_ray_origin(pos: Vec3, normal: Vec3) -> Vec3 {
    const ORIGIN: f32 = 1.0 / 32.0;
    const FLOAT_SCALE: f32 = 1.0 / 65536.0;
    const INT_SCALE: f32 = 256.0;

    let offset_axis = |p: f32, n: f32| {
        let int_offset = (n * INT_SCALE) as i32;
        let int_pos = f32::from_bits(
            (p.to_bits() as i32).wrapping_add(if p < 0.0 { -int_offset } else { int_offset })
                as u32,
        );
        if p.abs() < ORIGIN {
            p + n * FLOAT_SCALE
        } else {
            int_pos
        }
    };

    Vec3::new(
        offset_axis(pos.x, normal.x),
        offset_axis(pos.y, normal.y),
        offset_axis(pos.z, normal.z),
    )
}
