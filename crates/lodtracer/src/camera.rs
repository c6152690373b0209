use glam::{UVec2, Vec2, Vec3};

/// A pinhole camera.
///
/// The image plane sits at `w` from the eye; `u` and `v` span half of it
/// horizontally and vertically, so a normalized device coordinate
/// $(x, y) \in \left[-1, 1\right]^2$ maps to the direction $x u + y v + w$.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    /// Vertical field of view, in radians
    pub vfov: f32,
    /// width of the sensor, in pixel
    pub width: u32,
    /// height of the sensor, in pixel
    pub height: u32,

    pub u: Vec3,
    pub v: Vec3,
    pub w: Vec3,
}

impl Camera {
    pub fn look_at(
        position: Vec3,
        target: Vec3,
        up: Vec3,
        vfov: f32,
        width: u32,
        height: u32,
    ) -> Self {
        let forward = (target - position).normalize();
        let right = forward.cross(up).normalize();
        let true_up = right.cross(forward);

        let h = f32::tan(vfov / 2.);
        let aspect_ratio = width as f32 / height as f32;

        Self {
            position,
            vfov,
            width,
            height,
            u: right * h * aspect_ratio,
            v: true_up * h,
            w: forward,
        }
    }

    /// Same camera for another sensor size
    pub fn with_dimensions(&self, width: u32, height: u32) -> Self {
        let target = self.position + self.w;
        Self::look_at(self.position, target, self.v, self.vfov, width, height)
    }

    pub fn dimensions(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    /// Ray through the center of `pixel`.
    ///
    /// Returns the normalized and the un-normalized direction; the latter is what ray
    /// differentials are derived from.
    pub fn compute_ray_pinhole(&self, pixel: UVec2) -> CameraRay {
        let p = (pixel.as_vec2() + 0.5) / self.dimensions().as_vec2();
        let ndc = Vec2::new(2.0, -2.0) * p + Vec2::new(-1.0, 1.0);

        let direction = ndc.x * self.u + ndc.y * self.v + self.w;
        CameraRay {
            origin: self.position,
            direction: direction.normalize(),
            non_normalized_direction: direction,
        }
    }

    /// Angle covered by one pixel, used to seed ray cones
    pub fn pixel_spread_angle(&self) -> f32 {
        f32::atan(2.0 * f32::tan(self.vfov / 2.0) / self.height as f32)
    }

    /// Derivatives of the normalized ray direction with respect to the pixel coordinates.
    ///
    /// Igehy, "Tracing Ray Differentials", eq. 8.
    pub fn ray_direction_differentials(&self, non_normalized_direction: Vec3) -> (Vec3, Vec3) {
        let d = non_normalized_direction;
        let dd = d.dot(d);
        let divd = 2.0 / (dd * dd.sqrt());
        let dr = d.dot(self.u);
        let du = d.dot(self.v);
        let dims = self.dimensions().as_vec2();

        let dd_dx = ((dd * self.u) - (dr * d)) * divd / dims.x;
        let dd_dy = -((dd * self.v) - (du * d)) * divd / dims.y;
        (dd_dx, dd_dy)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CameraRay {
    pub origin: Vec3,
    pub direction: Vec3,
    pub non_normalized_direction: Vec3,
}
