use glam::{Vec2, Vec3, Vec4};

use super::{insert_floor, insert_upright_quad};
use crate::{
    camera::Camera,
    color::Rgb,
    light::{AnalyticLight, EnvMap},
    material::{MaterialDescriptor, MipTexture, TextureSlot},
    scene::SceneBuilder,
    Result,
};

/// An alpha tested fence between the camera and a mirror. Both primary and reflected rays have
/// to look through the holes.
pub struct AlphaFenceScene;

impl AlphaFenceScene {
    pub fn insert_into(builder: &mut SceneBuilder) -> Result<()> {
        insert_floor(builder)?;

        let mirror = builder.insert_material(MaterialDescriptor::mirror(
            "mirror",
            Vec3::splat(0.95),
            0.0,
        ))?;
        insert_upright_quad(builder, mirror, Vec2::new(8.0, 4.0), -2.5)?;

        let holes = builder.insert_texture(MipTexture::checkerboard(
            64,
            8,
            Vec4::new(0.0, 0.0, 0.0, 0.0),
            Vec4::new(0.6, 0.4, 0.2, 1.0),
        ));
        let fence = builder.insert_material(
            MaterialDescriptor::diffuse("fence", TextureSlot::Texture(holes))
                .with_double_sided(true),
        )?;
        insert_upright_quad(builder, fence, Vec2::new(3.0, 1.5), 0.5)?;

        builder.insert_light(AnalyticLight::spot(
            Vec3::new(0.0, 4.0, 3.0),
            Vec3::new(0.0, -1.0, -0.8),
            Rgb::splat(30.0),
            0.5,
            0.8,
        ));
        builder.insert_light(AnalyticLight::Point {
            position: Vec3::new(-2.0, 3.0, -1.0),
            intensity: Rgb::splat(10.0),
        });
        builder.set_env_map(EnvMap::Constant(Rgb::splat(0.3)));
        builder.set_camera(Camera::look_at(
            Vec3::new(0.5, 1.2, 4.0),
            Vec3::new(0.0, 0.8, 0.0),
            Vec3::Y,
            0.9,
            800,
            600,
        ));
        Ok(())
    }
}
