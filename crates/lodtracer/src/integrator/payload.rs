use glam::Vec3;

use crate::{color::Rgb, lod::LodState, sampler::SampleGenerator};

/// State of one path, carried from bounce to bounce.
#[derive(Debug, Clone)]
pub struct ScatterRayPayload {
    /// Radiance gathered so far, only ever added to
    pub radiance: Rgb,
    pub throughput: Rgb,
    pub terminated: bool,
    pub path_length: u32,
    /// Next segment
    pub origin: Vec3,
    pub direction: Vec3,
    pub lod: LodState,
    pub sg: SampleGenerator,
}

impl ScatterRayPayload {
    pub fn new(
        radiance: Rgb,
        path_length: u32,
        origin: Vec3,
        direction: Vec3,
        lod: LodState,
        sg: SampleGenerator,
    ) -> Self {
        Self {
            radiance,
            throughput: Rgb::splat(1.0),
            terminated: false,
            path_length,
            origin,
            direction,
            lod,
            sg,
        }
    }
}

/// Result of a visibility test, only a miss makes it visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShadowRayPayload {
    pub visible: bool,
}

/// Rays traced on behalf of one pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TraceStats {
    pub scatter_rays: u32,
    pub shadow_rays: u32,
}
