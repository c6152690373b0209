//! First order ray differentials, after Igehy, "Tracing Ray Differentials" (SIGGRAPH 1999).
use std::ops::Mul;

use glam::{Vec2, Vec3, Vec4};

/// Variation of a ray origin and direction per pixel step in x and y.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RayDiff {
    pub do_dx: Vec3,
    pub do_dy: Vec3,
    pub dd_dx: Vec3,
    pub dd_dy: Vec3,
}

/// Derivatives of the (b1, b2) barycentric weights of a hit per pixel step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BarycentricDiffs {
    pub db_dx: Vec2,
    pub db_dy: Vec2,
}

impl RayDiff {
    pub const ZERO: Self = Self {
        do_dx: Vec3::ZERO,
        do_dy: Vec3::ZERO,
        dd_dx: Vec3::ZERO,
        dd_dy: Vec3::ZERO,
    };

    /// Differential of a ray leaving a pinhole: the origin is shared by all pixels.
    pub fn from_camera(dd_dx: Vec3, dd_dy: Vec3) -> Self {
        Self {
            dd_dx,
            dd_dy,
            ..Self::ZERO
        }
    }

    /// Transfer the differential `t` units along `direction` onto the plane of normal
    /// `face_normal` (Igehy eq. 2-5).
    pub fn propagate(&self, direction: Vec3, t: f32, face_normal: Vec3) -> Self {
        let do_dx = self.do_dx + t * self.dd_dx;
        let do_dy = self.do_dy + t * self.dd_dy;

        let rcp_dn = 1.0 / direction.dot(face_normal);
        let dt_dx = -do_dx.dot(face_normal) * rcp_dn;
        let dt_dy = -do_dy.dot(face_normal) * rcp_dn;

        Self {
            do_dx: do_dx + direction * dt_dx,
            do_dy: do_dy + direction * dt_dy,
            dd_dx: self.dd_dx,
            dd_dy: self.dd_dy,
        }
    }

    /// Mirror the differential of `direction` about the interpolated shading normal of a
    /// triangle (Igehy eq. 10 and 14).
    ///
    /// `normal` is the interpolated normal before normalization, `normals` the world space
    /// vertex normals it was interpolated from.
    pub fn reflect(
        &self,
        direction: Vec3,
        normal: Vec3,
        bary: &BarycentricDiffs,
        normals: [Vec3; 3],
    ) -> Self {
        let (dn_dx, dn_dy) = bary.normal_differentials(normal, normals);
        let n = normal.normalize();
        let d_dot_n = direction.dot(n);

        let ddn_dx = self.dd_dx.dot(n) + direction.dot(dn_dx);
        let ddn_dy = self.dd_dy.dot(n) + direction.dot(dn_dy);

        Self {
            do_dx: self.do_dx,
            do_dy: self.do_dy,
            dd_dx: self.dd_dx - 2.0 * (d_dot_n * dn_dx + ddn_dx * n),
            dd_dy: self.dd_dy - 2.0 * (d_dot_n * dn_dy + ddn_dy * n),
        }
    }

    /// Pack into the three four-channel texels of a G-buffer.
    pub fn pack(&self) -> [Vec4; 3] {
        [
            self.do_dx.extend(self.do_dy.x),
            Vec4::new(self.do_dy.y, self.do_dy.z, self.dd_dx.x, self.dd_dx.y),
            Vec4::new(self.dd_dx.z, self.dd_dy.x, self.dd_dy.y, self.dd_dy.z),
        ]
    }

    pub fn unpack(texels: [Vec4; 3]) -> Self {
        let [a, b, c] = texels;
        Self {
            do_dx: a.truncate(),
            do_dy: Vec3::new(a.w, b.x, b.y),
            dd_dx: Vec3::new(b.z, b.w, c.x),
            dd_dy: Vec3::new(c.y, c.z, c.w),
        }
    }
}

impl Mul<RayDiff> for f32 {
    type Output = RayDiff;

    fn mul(self, rhs: RayDiff) -> Self::Output {
        RayDiff {
            do_dx: self * rhs.do_dx,
            do_dy: self * rhs.do_dy,
            dd_dx: self * rhs.dd_dx,
            dd_dy: self * rhs.dd_dy,
        }
    }
}

impl BarycentricDiffs {
    /// Igehy eq. 11, with the edges `v1 - v0` and `v2 - v0` of the hit triangle.
    pub fn new(ray_diff: &RayDiff, edge01: Vec3, edge02: Vec3, face_normal: Vec3) -> Self {
        let nu = edge02.cross(face_normal);
        let nv = edge01.cross(face_normal);
        let lu = nu / nu.dot(edge01);
        let lv = nv / nv.dot(edge02);

        Self {
            db_dx: Vec2::new(lu.dot(ray_diff.do_dx), lv.dot(ray_diff.do_dx)),
            db_dy: Vec2::new(lu.dot(ray_diff.do_dy), lv.dot(ray_diff.do_dy)),
        }
    }

    /// Derivatives of an attribute interpolated over the triangle
    pub fn interpolate_2d(&self, values: [Vec2; 3]) -> (Vec2, Vec2) {
        let e1 = values[1] - values[0];
        let e2 = values[2] - values[0];
        (
            self.db_dx.x * e1 + self.db_dx.y * e2,
            self.db_dy.x * e1 + self.db_dy.y * e2,
        )
    }

    fn interpolate_3d(&self, values: [Vec3; 3]) -> (Vec3, Vec3) {
        let e1 = values[1] - values[0];
        let e2 = values[2] - values[0];
        (
            self.db_dx.x * e1 + self.db_dx.y * e2,
            self.db_dy.x * e1 + self.db_dy.y * e2,
        )
    }

    /// Derivatives of the normalized interpolated normal
    fn normal_differentials(&self, normal: Vec3, normals: [Vec3; 3]) -> (Vec3, Vec3) {
        let nn = normal.dot(normal);
        let rcp_nn = 1.0 / (nn * nn.sqrt());
        let (dn_dx, dn_dy) = self.interpolate_3d(normals);
        (
            (nn * dn_dx - normal.dot(dn_dx) * normal) * rcp_nn,
            (nn * dn_dy - normal.dot(dn_dy) * normal) * rcp_nn,
        )
    }
}

/// Isotropic, texture independent level of detail from texture coordinate derivatives.
pub fn lambda_isotropic(duv_dx: Vec2, duv_dy: Vec2) -> f32 {
    0.5 * f32::log2(f32::max(duv_dx.dot(duv_dx), duv_dy.dot(duv_dy)))
}
