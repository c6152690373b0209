use glam::{Vec2, Vec3, Vec4};

use super::{insert_floor, insert_upright_quad};
use crate::{
    camera::Camera,
    color::Rgb,
    light::{AnalyticLight, EnvMap},
    material::{MaterialDescriptor, MipTexture, TextureSlot},
    math::transform::Transform,
    scene::{Mesh, SceneBuilder},
    Result,
};

/// A glossy mirror standing on a checkered floor, with a textured ball in front of it.
pub struct MirrorFloorScene;

impl MirrorFloorScene {
    pub fn insert_into(builder: &mut SceneBuilder) -> Result<()> {
        insert_floor(builder)?;

        let mirror = builder.insert_material(MaterialDescriptor::mirror(
            "mirror",
            Vec3::splat(0.95),
            0.05,
        ))?;
        insert_upright_quad(builder, mirror, Vec2::new(6.0, 3.0), -2.0)?;

        let ball_texture = builder.insert_texture(MipTexture::checkerboard(
            128,
            8,
            Vec4::new(0.8, 0.1, 0.1, 1.0),
            Vec4::new(0.9, 0.9, 0.2, 1.0),
        ));
        let ball = builder.insert_material(MaterialDescriptor::diffuse(
            "ball",
            TextureSlot::Texture(ball_texture),
        ))?;
        let sphere = builder.insert_mesh(Mesh::uv_sphere(0.6, 48, 24));
        builder.insert_instance(
            sphere,
            ball,
            Transform::from_translation(Vec3::new(1.0, 0.6, 0.0)),
        )?;

        builder.insert_light(AnalyticLight::Point {
            position: Vec3::new(2.0, 4.0, 3.0),
            intensity: Rgb::splat(20.0),
        });
        builder.insert_light(AnalyticLight::Directional {
            direction: Vec3::new(-0.3, -1.0, -0.5),
            irradiance: Rgb::splat(1.0),
        });
        builder.set_env_map(EnvMap::default());
        builder.set_camera(Camera::look_at(
            Vec3::new(0.0, 1.6, 5.0),
            Vec3::new(0.0, 0.8, 0.0),
            Vec3::Y,
            0.8,
            800,
            600,
        ));
        Ok(())
    }
}
