//! CPU stand-in for the raster pass producing the G-buffer.
use glam::{UVec2, Vec3};
use rayon::prelude::*;

use super::{GBuffer, GBufferChannels, GBufferTexel};
use crate::{
    lod::{surface_spread_angle, BarycentricDiffs, RayDiff, TextureLod},
    material::ShadingData,
    ray::Ray,
    scene::{PackedHitInfo, RayFlags, Scene, TraceResult},
};

/// Casts one primary ray per pixel center through the scene camera.
#[derive(Debug, Clone, Copy)]
pub struct GBufferRaster {
    pub channels: GBufferChannels,
}

impl Default for GBufferRaster {
    fn default() -> Self {
        Self {
            channels: GBufferChannels::all(),
        }
    }
}

impl GBufferRaster {
    pub fn new(channels: GBufferChannels) -> Self {
        Self { channels }
    }

    pub fn render(&self, scene: &Scene) -> GBuffer {
        let camera = &scene.camera;
        let (width, height) = (camera.width, camera.height);

        let texels: Vec<GBufferTexel> = (0..width * height)
            .into_par_iter()
            .map(|i| self.primary_hit(scene, UVec2::new(i % width, i / width)))
            .collect();

        let mut gbuffer = GBuffer::new(width, height, self.channels);
        for (i, texel) in texels.iter().enumerate() {
            gbuffer.set_texel(UVec2::new(i as u32 % width, i as u32 / width), texel);
        }

        if self.channels.contains(GBufferChannels::SURFACE_SPREAD_ANGLE) {
            for y in 0..height {
                for x in 0..width {
                    let angle = spread_angle_at(&texels, width, height, x, y);
                    gbuffer.set_surface_spread_angle(UVec2::new(x, y), angle);
                }
            }
        }
        gbuffer
    }

    fn primary_hit(&self, scene: &Scene, pixel: UVec2) -> GBufferTexel {
        let camera_ray = scene.camera.compute_ray_pinhole(pixel);
        let ray = Ray::new(camera_ray.origin, camera_ray.direction);
        let TraceResult::Hit { hit, t } =
            scene.trace_ray(&ray, RayFlags::empty(), |hit| scene.alpha_test(hit))
        else {
            return GBufferTexel::default();
        };
        let (Some(vertex), Some(material)) = (scene.vertex_data(&hit), scene.material(&hit)) else {
            return GBufferTexel::default();
        };

        let (dd_dx, dd_dy) = scene
            .camera
            .ray_direction_differentials(camera_ray.non_normalized_direction);
        let ray_diff =
            RayDiff::from_camera(dd_dx, dd_dy).propagate(ray.direction, t, vertex.face_normal);
        let bary = BarycentricDiffs::new(
            &ray_diff,
            vertex.positions[1] - vertex.positions[0],
            vertex.positions[2] - vertex.positions[0],
            vertex.face_normal,
        );
        let (duv_dx, duv_dy) = bary.interpolate_2d(vertex.tex_coords);

        let geometry = vertex.geometry();
        let params = material.eval(
            scene.textures(),
            geometry.uv,
            TextureLod::Gradients { duv_dx, duv_dy },
        );
        let sd = ShadingData::new(&geometry, &params, -ray.direction);

        GBufferTexel {
            pos_w: geometry.pos_w.extend(1.0),
            normal_w: sd.n,
            tangent_w: sd.t,
            face_normal_w: geometry.face_normal,
            tex_c: geometry.uv,
            material: params,
            bitangent_w: Some(sd.b),
            view_w: Some(sd.v),
            surface_spread_angle: None,
            ray_diff: Some(ray_diff.reflect(ray.direction, vertex.normal, &bary, vertex.normals)),
            vbuffer: Some(PackedHitInfo::from(&hit)),
        }
    }
}

/// Screen space derivative of a per pixel quantity: forward difference, backward at the right
/// or bottom edge and zero when no covered neighbour exists.
fn screen_derivative(
    texels: &[GBufferTexel],
    at: impl Fn(u32) -> Option<u32>,
    index: u32,
    value: impl Fn(&GBufferTexel) -> Vec3,
) -> Vec3 {
    let valid = |i: u32| texels[i as usize].is_valid().then(|| value(&texels[i as usize]));
    let center = value(&texels[index as usize]);
    if let Some(next) = at(1).and_then(valid) {
        next - center
    } else if let Some(previous) = at(0).and_then(valid) {
        center - previous
    } else {
        Vec3::ZERO
    }
}

fn spread_angle_at(texels: &[GBufferTexel], width: u32, height: u32, x: u32, y: u32) -> f32 {
    let index = y * width + x;
    if !texels[index as usize].is_valid() {
        return 0.0;
    }

    // 0: previous pixel, 1: next pixel
    let along_x = |side: u32| match side {
        0 => x.checked_sub(1).map(|x| y * width + x),
        _ => (x + 1 < width).then_some(index + 1),
    };
    let along_y = |side: u32| match side {
        0 => y.checked_sub(1).map(|y| y * width + x),
        _ => (y + 1 < height).then_some(index + width),
    };

    let normal = |t: &GBufferTexel| t.normal_w;
    let position = |t: &GBufferTexel| t.pos_w.truncate();

    surface_spread_angle(
        screen_derivative(texels, along_x, index, normal),
        screen_derivative(texels, along_y, index, normal),
        screen_derivative(texels, along_x, index, position),
        screen_derivative(texels, along_y, index, position),
    )
}
