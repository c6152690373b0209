//! Path tracer following mirror reflections from a G-buffer, with texture level of detail
//! tracked along the rays.
//!
//! Each pixel runs independently: read the primary hit, add its emission and direct light,
//! then bounce along the mirror direction while the surface is smooth enough. The texture
//! footprint of the path is carried by a [LodState] matching [TracerConfig::lod_mode].
pub mod config;
pub mod direct;
pub mod payload;
pub mod scatter;

pub use config::{MisHeuristic, PrimaryHitSource, TracerConfig, TracerParams};
pub use payload::{ScatterRayPayload, ShadowRayPayload, TraceStats};

use glam::{UVec2, Vec4};
use rayon::prelude::*;

use crate::{
    camera::CameraRay,
    color::Rgb,
    gbuffer::{GBuffer, GBufferTexel},
    lod::{BarycentricDiffs, LodMode, LodState, RayCone, RayDiff},
    material::ShadingData,
    math::vec::ReflectVecExt,
    sampler::SampleGenerator,
    scene::Scene,
    Error, Result,
};

use direct::eval_direct_analytic;
use scatter::trace_scatter_ray;

/// Surfaces rougher than this get no indirect light
pub const MAX_REFLECTIVE_ROUGHNESS: f32 = 0.19;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSummary {
    pub path_length: u32,
    pub terminated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelResult {
    /// Alpha is always 1
    pub color: Vec4,
    pub stats: TraceStats,
    /// None when the bounce loop was not entered
    pub path: Option<PathSummary>,
}

pub struct TexLodPathTracer<'a> {
    scene: &'a Scene,
    config: TracerConfig,
}

impl<'a> TexLodPathTracer<'a> {
    pub fn new(scene: &'a Scene, config: TracerConfig) -> Self {
        Self { scene, config }
    }

    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    /// The shared parameter block matching this tracer
    pub fn params(&self) -> TracerParams {
        TracerParams::new(
            &self.config,
            self.scene.camera.dimensions(),
            self.scene.light_counts(),
        )
    }

    /// Shade every pixel of `gbuffer`, row major.
    pub fn render(&self, gbuffer: &GBuffer) -> Result<Vec<Vec4>> {
        let dimensions = self.scene.camera.dimensions();
        if gbuffer.dimensions() != dimensions {
            return Err(Error::GBufferSize {
                channel: "pos_w",
                expected: (dimensions.x * dimensions.y) as usize,
                actual: (gbuffer.width() * gbuffer.height()) as usize,
            });
        }

        let width = dimensions.x;
        Ok((0..dimensions.x * dimensions.y)
            .into_par_iter()
            .map(|i| self.trace_pixel(UVec2::new(i % width, i / width), gbuffer).color)
            .collect())
    }

    pub fn trace_pixel(&self, pixel: UVec2, gbuffer: &GBuffer) -> PixelResult {
        let camera = &self.scene.camera;
        let camera_ray = camera.compute_ray_pinhole(pixel);
        let texel = gbuffer.texel(pixel);

        if !texel.is_valid() {
            return PixelResult {
                color: self.background(&camera_ray).0.extend(1.0),
                stats: TraceStats::default(),
                path: None,
            };
        }

        let mut stats = TraceStats::default();
        let sd = ShadingData::from_gbuffer(&texel, camera.position);

        let mut sg = SampleGenerator::new(pixel, self.config.frame_count);
        sg.advance(self.config.prng_dimension);

        let mut radiance = sd.emissive;
        if self.config.use_analytic_lights {
            radiance += eval_direct_analytic(self.scene, &sd, &mut sg, &mut stats);
        }

        let path_length = match self.config.primary_hit {
            PrimaryHitSource::Rasterized => 0,
            PrimaryHitSource::RayTraced => 1,
        };
        let mut payload = ScatterRayPayload::new(
            radiance,
            path_length,
            sd.compute_new_ray_origin(),
            camera_ray.direction.reflect(sd.n),
            self.init_lod(&texel, &camera_ray),
            sg,
        );

        let path = (sd.linear_roughness <= MAX_REFLECTIVE_ROUGHNESS).then(|| {
            while payload.path_length <= self.config.max_bounces && !payload.terminated {
                trace_scatter_ray(self.scene, &self.config, &mut payload, &mut stats);
            }
            // A ray traced primary hit may already be past max_bounces before the first scatter ray
            if payload.path_length > self.config.max_bounces {
                payload.terminated = true;
            }
            PathSummary {
                path_length: payload.path_length,
                terminated: payload.terminated,
            }
        });

        if !payload.radiance.is_finite() {
            crate::warn_once!(
                "non-finite radiance {:?} at pixel {pixel}",
                payload.radiance
            );
        }

        PixelResult {
            color: payload.radiance.0.extend(1.0),
            stats,
            path,
        }
    }

    fn background(&self, camera_ray: &CameraRay) -> Rgb {
        match self.scene.env_map() {
            Some(env) if self.config.use_env_background => env.eval(camera_ray.direction),
            _ => Rgb(self.config.background_color),
        }
    }

    fn init_lod(&self, texel: &GBufferTexel, camera_ray: &CameraRay) -> LodState {
        let camera = &self.scene.camera;
        let hit_distance = (texel.pos_w.truncate() - camera.position).length();

        match self.config.lod_mode {
            LodMode::Mip0 => LodState::Mip0,
            LodMode::RayCones => {
                let mut cone = RayCone::new(0.0, camera.pixel_spread_angle());
                cone.propagate(texel.surface_spread_angle.unwrap_or(0.0), hit_distance);
                LodState::RayCone(cone)
            }
            mode @ (LodMode::RayDiffsIsotropic | LodMode::RayDiffsAnisotropic) => {
                let ray_diff = match (self.config.primary_hit, texel.ray_diff) {
                    (PrimaryHitSource::Rasterized, Some(ray_diff)) => ray_diff,
                    _ => self.primary_ray_diff(texel, camera_ray, hit_distance),
                };
                LodState::from_ray_diff(mode, ray_diff)
            }
        }
    }

    /// Camera differential carried to the primary hit and reflected there. Zero when the hit
    /// triangle cannot be recovered.
    fn primary_ray_diff(
        &self,
        texel: &GBufferTexel,
        camera_ray: &CameraRay,
        hit_distance: f32,
    ) -> RayDiff {
        let (dd_dx, dd_dy) = self
            .scene
            .camera
            .ray_direction_differentials(camera_ray.non_normalized_direction);
        let ray_diff = RayDiff::from_camera(dd_dx, dd_dy).propagate(
            camera_ray.direction,
            hit_distance,
            texel.face_normal_w,
        );

        let Some(vertex) = texel
            .vbuffer
            .and_then(|packed| packed.decode())
            .and_then(|hit| self.scene.vertex_data(&hit))
        else {
            return RayDiff::ZERO;
        };

        let bary = BarycentricDiffs::new(
            &ray_diff,
            vertex.positions[1] - vertex.positions[0],
            vertex.positions[2] - vertex.positions[0],
            vertex.face_normal,
        );
        ray_diff.reflect(camera_ray.direction, vertex.normal, &bary, vertex.normals)
    }
}
