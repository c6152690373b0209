//! Per frame configuration of the tracer and its host shared mirror.
use bytemuck::{Pod, Zeroable};
use glam::{UVec2, Vec3};

use crate::{light::LightCounts, lod::LodMode};

/// Where the primary hit stored in the G-buffer comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, derive_more::Display)]
pub enum PrimaryHitSource {
    #[default]
    #[display("rasterized")]
    Rasterized,
    /// Computed by a previous pass of this tracer; the primary hit already counts as a bounce
    #[display("ray traced")]
    RayTraced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum MisHeuristic {
    #[default]
    Balance = 0,
    PowerTwo = 1,
    PowerExp = 2,
}

/// Immutable inputs of one frame. Everything the tracer does per pixel depends only on this,
/// the scene and the G-buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TracerConfig {
    pub max_bounces: u32,
    pub use_analytic_lights: bool,
    pub use_emissive_lights: bool,
    pub use_env_light: bool,
    /// Show the environment behind pixels the primary rays missed, instead of `background_color`
    pub use_env_background: bool,
    pub lod_mode: LodMode,
    pub primary_hit: PrimaryHitSource,
    pub frame_count: u32,
    /// Number of draws each pixel stream skips before its first sample
    pub prng_dimension: u32,
    pub background_color: Vec3,

    // Carried to the shared record only, the tracer never reads them
    pub samples_per_pixel: u32,
    pub light_samples_per_vertex: u32,
    pub mis_heuristic: MisHeuristic,
    pub mis_power_exponent: f32,
    pub russian_roulette_absorption: f32,
    pub clamp_threshold: f32,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            max_bounces: 3,
            use_analytic_lights: true,
            use_emissive_lights: true,
            use_env_light: true,
            use_env_background: true,
            lod_mode: LodMode::default(),
            primary_hit: PrimaryHitSource::default(),
            frame_count: 0,
            prng_dimension: 0,
            background_color: Vec3::ZERO,

            samples_per_pixel: 1,
            light_samples_per_vertex: 1,
            mis_heuristic: MisHeuristic::default(),
            mis_power_exponent: 2.0,
            russian_roulette_absorption: 0.2,
            clamp_threshold: 10.0,
        }
    }
}

fn lod_mode_index(mode: LodMode) -> u32 {
    match mode {
        LodMode::Mip0 => 0,
        LodMode::RayCones => 1,
        LodMode::RayDiffsIsotropic => 2,
        LodMode::RayDiffsAnisotropic => 3,
    }
}

/// Raw parameter block shared with other passes. Field order and padding are part of the
/// format.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Zeroable, Pod)]
pub struct TracerParams {
    pub use_analytic_lights: u32,
    pub use_emissive_lights: u32,
    pub use_env_light: u32,
    pub use_env_background: u32,
    pub max_bounces: u32,
    pub lod_mode: u32,
    pub ray_traced_primary_hit: u32,
    pub _pad0: u32,

    pub frame_dim: [u32; 2],
    pub frame_count: u32,
    pub prng_dimension: u32,

    pub samples_per_pixel: u32,
    pub light_samples_per_vertex: u32,
    pub mis_heuristic: u32,
    pub mis_power_exponent: f32,

    pub russian_roulette_absorption: f32,
    pub clamp_threshold: f32,
    pub point_light_count: u32,
    pub directional_light_count: u32,

    pub spot_light_count: u32,
    pub _pad1: [u32; 3],

    pub background_color: [f32; 3],
    pub _pad2: u32,
}

const _: () = assert!(std::mem::size_of::<TracerParams>() == 112);

impl TracerParams {
    pub fn new(config: &TracerConfig, frame_dim: UVec2, lights: LightCounts) -> Self {
        Self {
            use_analytic_lights: config.use_analytic_lights.into(),
            use_emissive_lights: config.use_emissive_lights.into(),
            use_env_light: config.use_env_light.into(),
            use_env_background: config.use_env_background.into(),
            max_bounces: config.max_bounces,
            lod_mode: lod_mode_index(config.lod_mode),
            ray_traced_primary_hit: (config.primary_hit == PrimaryHitSource::RayTraced).into(),
            frame_dim: frame_dim.to_array(),
            frame_count: config.frame_count,
            prng_dimension: config.prng_dimension,
            samples_per_pixel: config.samples_per_pixel,
            light_samples_per_vertex: config.light_samples_per_vertex,
            mis_heuristic: config.mis_heuristic as u32,
            mis_power_exponent: config.mis_power_exponent,
            russian_roulette_absorption: config.russian_roulette_absorption,
            clamp_threshold: config.clamp_threshold,
            point_light_count: lights.point,
            directional_light_count: lights.directional,
            spot_light_count: lights.spot,
            background_color: config.background_color.to_array(),
            ..Default::default()
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}
