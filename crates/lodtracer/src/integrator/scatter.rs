//! Closest hit and miss handling of scatter rays.
use glam::Vec3;
use log::trace;

use super::{
    config::TracerConfig,
    direct::eval_direct_analytic,
    payload::{ScatterRayPayload, TraceStats},
};
use crate::{
    lod::{lambda_isotropic, BarycentricDiffs, LodState, TextureLod},
    material::{GeometryParams, MaterialParams, ShadingData},
    math::vec::ReflectVecExt,
    ray::Ray,
    scene::{RayFlags, Scene, TraceResult, TriangleHit, VertexData},
};

/// Trace the next segment of the path held by `payload` and update it in place.
pub fn trace_scatter_ray(
    scene: &Scene,
    config: &TracerConfig,
    payload: &mut ScatterRayPayload,
    stats: &mut TraceStats,
) {
    crate::counter!("Scatter rays");
    stats.scatter_rays += 1;

    let ray = Ray {
        origin: payload.origin,
        direction: payload.direction,
        t_min: 0.0,
        t_max: f32::INFINITY,
    };
    match scene.trace_ray(&ray, RayFlags::empty(), |hit| scene.alpha_test(hit)) {
        TraceResult::Miss => on_miss(scene, config, payload),
        TraceResult::Hit { hit, t } => on_hit(scene, config, payload, stats, &hit, t),
        TraceResult::Occluded => {
            crate::error_once!("scatter ray traced without its closest hit");
            payload.terminated = true;
        }
    }
}

fn on_miss(scene: &Scene, config: &TracerConfig, payload: &mut ScatterRayPayload) {
    trace!("scatter miss at path length {}", payload.path_length);
    payload.terminated = true;

    if config.use_env_light {
        if let Some(env) = scene.env_map() {
            payload.radiance += payload.throughput * env.eval(payload.direction);
        }
    }
}

/// Advance the footprint to the hit and derive the texture lod for it. Ray differential
/// states also return the barycentric derivatives needed to reflect them afterwards.
fn propagate_lod(
    lod: &mut LodState,
    vertex: &VertexData,
    direction: Vec3,
    t: f32,
) -> (TextureLod, Option<BarycentricDiffs>) {
    let anisotropic = matches!(lod, LodState::RayDiffAnisotropic(_));
    match lod {
        LodState::Mip0 => (TextureLod::Mip0, None),
        LodState::RayCone(cone) => {
            cone.propagate(0.0, t);
            let lambda =
                cone.compute_lod(vertex.triangle_lod_constant, direction, vertex.face_normal);
            (TextureLod::Lambda(lambda), None)
        }
        LodState::RayDiffIsotropic(ray_diff) | LodState::RayDiffAnisotropic(ray_diff) => {
            *ray_diff = ray_diff.propagate(direction, t, vertex.face_normal);
            let bary = BarycentricDiffs::new(
                ray_diff,
                vertex.positions[1] - vertex.positions[0],
                vertex.positions[2] - vertex.positions[0],
                vertex.face_normal,
            );
            let (duv_dx, duv_dy) = bary.interpolate_2d(vertex.tex_coords);
            let texture_lod = if anisotropic {
                TextureLod::Gradients { duv_dx, duv_dy }
            } else {
                TextureLod::Lambda(lambda_isotropic(duv_dx, duv_dy))
            };
            (texture_lod, Some(bary))
        }
    }
}

/// Meshes without usable texture coordinates get a tangent frame built from the normal
fn shading_data(
    geometry: &GeometryParams,
    params: &MaterialParams,
    direction: Vec3,
) -> ShadingData {
    let mut sd = ShadingData::new(geometry, params, -direction);
    sd.fix_degenerate_bitangent();
    sd
}

fn on_hit(
    scene: &Scene,
    config: &TracerConfig,
    payload: &mut ScatterRayPayload,
    stats: &mut TraceStats,
    hit: &TriangleHit,
    t: f32,
) {
    let (Some(vertex), Some(material)) = (scene.vertex_data(hit), scene.material(hit)) else {
        crate::error_once!("scatter ray hit unknown geometry {hit:?}");
        payload.terminated = true;
        return;
    };

    let direction = payload.direction;
    let (texture_lod, bary) = propagate_lod(&mut payload.lod, &vertex, direction, t);
    trace!(
        "scatter hit at t = {t}, path length {}, lod {texture_lod:?}",
        payload.path_length
    );

    let geometry = vertex.geometry();
    let params = material.eval(scene.textures(), geometry.uv, texture_lod);
    let sd = shading_data(&geometry, &params, direction);

    if config.use_emissive_lights {
        payload.radiance += payload.throughput * sd.emissive;
    }

    if payload.path_length >= config.max_bounces {
        payload.terminated = true;
        return;
    }

    payload.origin = sd.compute_new_ray_origin();

    if config.use_analytic_lights {
        let direct = eval_direct_analytic(scene, &sd, &mut payload.sg, stats);
        payload.radiance += payload.throughput * direct;
    }

    // Mirror bounce: the footprint follows the reflected ray
    if let (
        Some(bary),
        LodState::RayDiffIsotropic(ray_diff) | LodState::RayDiffAnisotropic(ray_diff),
    ) = (bary, &mut payload.lod)
    {
        *ray_diff = ray_diff.reflect(direction, vertex.normal, &bary, vertex.normals);
    }
    payload.direction = direction.reflect(sd.n);
    payload.path_length += 1;
}
