//! Materials, textures and the per hit shading snapshot derived from them.
pub mod bsdf;
pub mod texture;

pub use bsdf::Bsdf;
pub use texture::MipTexture;

use glam::{Vec2, Vec3, Vec4};

use crate::{
    color::Rgb,
    lod::TextureLod,
    math::{float::offset_ray_origin, frame::Frame, vec::Vec3SameDirExt},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub usize);

/// A material input: either a constant or a texture lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextureSlot {
    Constant(Vec4),
    Texture(TextureId),
}

impl TextureSlot {
    pub fn eval(&self, textures: &[MipTexture], uv: Vec2, lod: TextureLod) -> Vec4 {
        match self {
            TextureSlot::Constant(value) => *value,
            TextureSlot::Texture(id) => textures
                .get(id.0)
                .map_or(Vec4::ZERO, |texture| texture.sample(uv, lod)),
        }
    }

    pub fn texture(&self) -> Option<TextureId> {
        match self {
            TextureSlot::Constant(_) => None,
            TextureSlot::Texture(id) => Some(*id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MaterialDescriptor {
    pub label: Option<String>,
    /// rgb: diffuse albedo, a: opacity
    pub base_color: TextureSlot,
    /// rgb: specular reflectance at normal incidence, a: linear roughness
    pub specular: TextureSlot,
    pub emissive: TextureSlot,
    pub emissive_factor: f32,
    pub alpha_threshold: f32,
    pub ior: f32,
    pub double_sided: bool,
}

impl Default for MaterialDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            base_color: TextureSlot::Constant(Vec4::new(0.8, 0.8, 0.8, 1.0)),
            specular: TextureSlot::Constant(Vec4::new(0.04, 0.04, 0.04, 1.0)),
            emissive: TextureSlot::Constant(Vec4::ZERO),
            emissive_factor: 1.0,
            alpha_threshold: 0.5,
            ior: 1.5,
            double_sided: false,
        }
    }
}

impl MaterialDescriptor {
    pub fn diffuse(label: &str, base_color: TextureSlot) -> Self {
        Self {
            label: Some(label.to_owned()),
            base_color,
            ..Default::default()
        }
    }

    /// A metallic reflector with the given specular color and linear roughness
    pub fn mirror(label: &str, color: Vec3, roughness: f32) -> Self {
        Self {
            label: Some(label.to_owned()),
            base_color: TextureSlot::Constant(Vec4::new(0.0, 0.0, 0.0, 1.0)),
            specular: TextureSlot::Constant(color.extend(roughness)),
            ..Default::default()
        }
    }

    pub fn emitter(label: &str, radiance: Vec3) -> Self {
        Self {
            label: Some(label.to_owned()),
            base_color: TextureSlot::Constant(Vec4::new(0.0, 0.0, 0.0, 1.0)),
            emissive: TextureSlot::Constant(radiance.extend(1.0)),
            ..Default::default()
        }
    }

    pub fn with_double_sided(self, double_sided: bool) -> Self {
        Self {
            double_sided,
            ..self
        }
    }

    pub fn textures(&self) -> impl Iterator<Item = TextureId> {
        [self.base_color, self.specular, self.emissive]
            .into_iter()
            .filter_map(|slot| slot.texture())
    }

    pub fn eval(&self, textures: &[MipTexture], uv: Vec2, lod: TextureLod) -> MaterialParams {
        let emissive = self.emissive.eval(textures, uv, lod).truncate() * self.emissive_factor;
        MaterialParams {
            diffuse_opacity: self.base_color.eval(textures, uv, lod),
            specular_roughness: self.specular.eval(textures, uv, lod),
            emissive: emissive.extend(1.0),
            extra_params: Vec4::new(self.ior, f32::from(u8::from(self.double_sided)), 0.0, 0.0),
        }
    }

    /// True if the surface is cut away at `uv`. Alpha is always tested on the finest mip.
    pub fn alpha_test(&self, textures: &[MipTexture], uv: Vec2) -> bool {
        let opacity = self.base_color.eval(textures, uv, TextureLod::Mip0).w;
        opacity < self.alpha_threshold
    }
}

/// Material inputs evaluated at a shading point, in the four channel layout of a G-buffer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MaterialParams {
    pub diffuse_opacity: Vec4,
    pub specular_roughness: Vec4,
    pub emissive: Vec4,
    /// x: ior, y: double sided
    pub extra_params: Vec4,
}

/// Interpolated geometric attributes at a hit, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryParams {
    pub pos_w: Vec3,
    /// Normalized shading normal
    pub normal: Vec3,
    pub tangent: Vec3,
    pub uv: Vec2,
    /// Geometric normal, following the triangle winding
    pub face_normal: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingData {
    pub pos_w: Vec3,
    pub uv: Vec2,
    /// Direction towards the viewer
    pub v: Vec3,
    pub n: Vec3,
    pub t: Vec3,
    pub b: Vec3,
    /// Face normal flipped to the side of the viewer
    pub face_n: Vec3,
    pub front_facing: bool,
    pub double_sided: bool,

    pub diffuse: Rgb,
    pub opacity: f32,
    pub specular: Rgb,
    pub linear_roughness: f32,
    pub emissive: Rgb,
    pub ior: f32,
}

impl ShadingData {
    /// `v` points from the surface towards the viewer.
    pub fn new(geometry: &GeometryParams, params: &MaterialParams, v: Vec3) -> Self {
        let front_facing = geometry.face_normal.dot(v) >= 0.0;
        let double_sided = params.extra_params.y != 0.0;

        let n = if !front_facing && double_sided {
            -geometry.normal
        } else {
            geometry.normal
        };
        let t = (geometry.tangent - n * n.dot(geometry.tangent)).normalize_or_zero();

        Self {
            pos_w: geometry.pos_w,
            uv: geometry.uv,
            v,
            n,
            t,
            b: n.cross(t),
            face_n: geometry.face_normal.same_direction(v),
            front_facing,
            double_sided,

            diffuse: Rgb(params.diffuse_opacity.truncate()),
            opacity: params.diffuse_opacity.w,
            specular: Rgb(params.specular_roughness.truncate()),
            linear_roughness: params.specular_roughness.w,
            emissive: Rgb(params.emissive.truncate()),
            ior: params.extra_params.x,
        }
    }

    /// Rebuild the tangent frame from the normal when the bitangent is degenerate (zero or
    /// NaN). Returns true if the frame was replaced.
    pub fn fix_degenerate_bitangent(&mut self) -> bool {
        if self.b.dot(self.b) > 0.0 {
            return false;
        }
        crate::counter!("Tangent frames rebuilt");

        let frame = Frame::new(self.n);
        self.t = frame.x();
        self.b = frame.y();
        true
    }

    /// Origin for rays leaving the surface towards the viewer's side
    pub fn compute_new_ray_origin(&self) -> Vec3 {
        offset_ray_origin(self.pos_w, self.face_n)
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3, Vec4};

    use super::{GeometryParams, MaterialDescriptor, MipTexture, ShadingData, TextureSlot};
    use crate::lod::TextureLod;

    fn geometry() -> GeometryParams {
        GeometryParams {
            pos_w: Vec3::new(1.0, 0.0, 2.0),
            normal: Vec3::Y,
            tangent: Vec3::X,
            uv: Vec2::ZERO,
            face_normal: Vec3::Y,
        }
    }

    #[test]
    fn eval_constant_material() {
        let material = MaterialDescriptor::mirror("mirror", Vec3::ONE, 0.1);
        let params = material.eval(&[], Vec2::ZERO, TextureLod::Mip0);
        assert_eq!(params.specular_roughness, Vec4::new(1.0, 1.0, 1.0, 0.1));
        assert_eq!(params.extra_params.x, 1.5);
    }

    #[test]
    fn alpha_test_against_threshold() {
        let texture = MipTexture::checkerboard(8, 2, Vec4::new(1.0, 1.0, 1.0, 0.0), Vec4::ONE);
        let material =
            MaterialDescriptor::diffuse("fence", TextureSlot::Texture(super::TextureId(0)));
        let textures = [texture];
        // texel centers of an even then an odd cell
        assert!(!material.alpha_test(&textures, Vec2::new(0.5 / 8.0, 0.5 / 8.0)));
        assert!(material.alpha_test(&textures, Vec2::new(4.5 / 8.0, 0.5 / 8.0)));
    }

    #[test]
    fn shading_frame_faces_the_viewer() {
        let params = MaterialDescriptor::default()
            .with_double_sided(true)
            .eval(&[], Vec2::ZERO, TextureLod::Mip0);
        let sd = ShadingData::new(&geometry(), &params, -Vec3::Y);
        assert!(!sd.front_facing);
        assert_eq!(sd.n, -Vec3::Y);
        assert_eq!(sd.face_n, -Vec3::Y);
        assert!(sd.compute_new_ray_origin().y < 0.0);
    }

    #[test]
    fn degenerate_bitangent_is_rebuilt() {
        let params = MaterialDescriptor::default().eval(&[], Vec2::ZERO, TextureLod::Mip0);
        let mut sd = ShadingData::new(
            &GeometryParams {
                tangent: Vec3::ZERO,
                ..geometry()
            },
            &params,
            Vec3::Y,
        );
        assert!(sd.fix_degenerate_bitangent());
        assert!((sd.b.length() - 1.0).abs() < 1e-5);
        assert!(sd.b.dot(sd.n).abs() < 1e-5);

        sd.b = Vec3::NAN;
        assert!(sd.fix_degenerate_bitangent());
        assert!(!sd.fix_degenerate_bitangent());
    }
}
