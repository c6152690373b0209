//! Built-in test scenes.
mod alpha_fence;
mod mirror_floor;

pub use alpha_fence::AlphaFenceScene;
pub use mirror_floor::MirrorFloorScene;

use glam::{Quat, Vec2, Vec3, Vec4};

use crate::{
    material::{MaterialDescriptor, MaterialId, MipTexture, TextureSlot},
    math::transform::Transform,
    scene::{Mesh, SceneBuilder},
    Result,
};

/// Textured checkered floor at y = 0
fn insert_floor(builder: &mut SceneBuilder) -> Result<()> {
    let checker = builder.insert_texture(MipTexture::checkerboard(
        256,
        16,
        Vec4::new(0.1, 0.1, 0.1, 1.0),
        Vec4::new(0.8, 0.8, 0.8, 1.0),
    ));
    let material = builder.insert_material(MaterialDescriptor::diffuse(
        "floor",
        TextureSlot::Texture(checker),
    ))?;
    let quad = builder.insert_mesh(Mesh::quad(Vec2::splat(20.0), 8.0));
    builder.insert_instance(quad, material, Transform::IDENTITY)?;
    Ok(())
}

/// Upright quad facing +z, its bottom edge resting on the floor
fn insert_upright_quad(
    builder: &mut SceneBuilder,
    material: MaterialId,
    size: Vec2,
    z: f32,
) -> Result<()> {
    let quad = builder.insert_mesh(Mesh::quad(size, 1.0));
    builder.insert_instance(
        quad,
        material,
        Transform {
            translation: Vec3::new(0.0, 0.5 * size.y, z),
            scale: Vec3::ONE,
            rot: Quat::from_rotation_x(std::f32::consts::FRAC_PI_2),
        },
    )?;
    Ok(())
}
