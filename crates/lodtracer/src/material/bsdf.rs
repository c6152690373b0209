//! Lambertian diffuse plus a GGX microfacet specular lobe.
use std::f32::consts::{FRAC_1_PI, PI};

use glam::Vec3;

use super::ShadingData;
use crate::color::Rgb;

/// Roughness is clamped so that near mirror surfaces keep a representable highlight
const MIN_GGX_ALPHA: f32 = 0.0064;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bsdf {
    diffuse: Rgb,
    specular: Rgb,
    alpha: f32,
}

impl Bsdf {
    pub fn new(sd: &ShadingData) -> Self {
        Self {
            diffuse: sd.diffuse,
            specular: sd.specular,
            alpha: f32::max(sd.linear_roughness * sd.linear_roughness, MIN_GGX_ALPHA),
        }
    }

    /// Value of the bsdf for light arriving from `wi`, without the cosine term.
    pub fn eval(&self, sd: &ShadingData, wi: Vec3) -> Rgb {
        let n_dot_v = sd.n.dot(sd.v);
        let n_dot_l = sd.n.dot(wi);
        if n_dot_v <= 0.0 || n_dot_l <= 0.0 {
            return Rgb::splat(0.0);
        }

        let diffuse = FRAC_1_PI * self.diffuse;

        let h = (sd.v + wi).normalize_or_zero();
        if h == Vec3::ZERO {
            return diffuse;
        }
        let n_dot_h = sd.n.dot(h);
        let v_dot_h = sd.v.dot(h);

        let d = self.ndf(n_dot_h);
        let g = self.smith_g1(n_dot_v) * self.smith_g1(n_dot_l);
        let f = schlick_fresnel(self.specular, v_dot_h);

        diffuse + (d * g / (4.0 * n_dot_v * n_dot_l)) * f
    }

    fn ndf(&self, n_dot_h: f32) -> f32 {
        let a2 = self.alpha * self.alpha;
        let d = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
        a2 / (PI * d * d)
    }

    fn smith_g1(&self, cos: f32) -> f32 {
        let a2 = self.alpha * self.alpha;
        2.0 * cos / (cos + f32::sqrt(a2 + (1.0 - a2) * cos * cos))
    }
}

fn schlick_fresnel(f0: Rgb, cos: f32) -> Rgb {
    let w = (1.0 - cos.clamp(0.0, 1.0)).powi(5);
    Rgb(f0.0 + w * (Vec3::ONE - f0.0))
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_1_PI;

    use glam::{Vec2, Vec3};

    use super::Bsdf;
    use crate::{
        lod::TextureLod,
        material::{GeometryParams, MaterialDescriptor, ShadingData, TextureSlot},
    };

    fn shading_data(material: &MaterialDescriptor, v: Vec3) -> ShadingData {
        let geometry = GeometryParams {
            pos_w: Vec3::ZERO,
            normal: Vec3::Z,
            tangent: Vec3::X,
            uv: Vec2::ZERO,
            face_normal: Vec3::Z,
        };
        ShadingData::new(&geometry, &material.eval(&[], Vec2::ZERO, TextureLod::Mip0), v)
    }

    #[test]
    fn lambert() {
        let material = MaterialDescriptor {
            specular: TextureSlot::Constant(glam::Vec4::new(0.0, 0.0, 0.0, 1.0)),
            ..MaterialDescriptor::diffuse("white", TextureSlot::Constant(glam::Vec4::ONE))
        };
        let sd = shading_data(&material, Vec3::Z);
        let f = Bsdf::new(&sd).eval(&sd, Vec3::new(0.0, 0.6, 0.8));
        assert!((f.0 - Vec3::splat(FRAC_1_PI)).abs().max_element() < 1e-5);
    }

    #[test]
    fn below_horizon_is_black() {
        let sd = shading_data(&MaterialDescriptor::default(), Vec3::Z);
        assert!(Bsdf::new(&sd).eval(&sd, -Vec3::Z).is_black());
    }

    #[test]
    fn glossy_peak_in_mirror_direction() {
        let material = MaterialDescriptor::mirror("mirror", Vec3::ONE, 0.1);
        let v = Vec3::new(0.0, 0.6, 0.8);
        let sd = shading_data(&material, v);
        let bsdf = Bsdf::new(&sd);
        let mirror = bsdf.eval(&sd, Vec3::new(0.0, -0.6, 0.8));
        let off = bsdf.eval(&sd, Vec3::new(0.6, 0.0, 0.8));
        assert!(mirror.luminance() > 10.0 * off.luminance());
    }
}
