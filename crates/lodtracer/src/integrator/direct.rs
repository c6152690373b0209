//! Direct lighting from analytic lights.
use glam::Vec3;

use super::payload::{ShadowRayPayload, TraceStats};
use crate::{
    color::Rgb,
    material::{Bsdf, ShadingData},
    ray::Ray,
    sampler::SampleGenerator,
    scene::{RayFlags, Scene, TraceResult},
};

/// Samples arriving this close to the horizon are dropped
const MIN_COS_THETA: f32 = 1e-6;

/// True if nothing blocks the segment `[origin, origin + t_max * dir]`.
///
/// Alpha tested geometry that fails the test does not block; the first accepted hit ends the
/// search.
pub fn trace_shadow_ray(
    scene: &Scene,
    origin: Vec3,
    dir: Vec3,
    t_max: f32,
    stats: &mut TraceStats,
) -> bool {
    crate::counter!("Shadow rays");
    stats.shadow_rays += 1;

    let mut payload = ShadowRayPayload::default();
    let ray = Ray {
        origin,
        direction: dir,
        t_min: 0.0,
        t_max,
    };
    let flags = RayFlags::ACCEPT_FIRST_HIT_AND_END_SEARCH | RayFlags::SKIP_CLOSEST_HIT;
    if let TraceResult::Miss = scene.trace_ray(&ray, flags, |hit| scene.alpha_test(hit)) {
        payload.visible = true;
    }
    payload.visible
}

/// Unoccluded light reaching `sd` from one uniformly picked analytic light, divided by the
/// pick probability.
///
/// Consumes exactly one sample from `sg` when the scene has lights.
pub fn eval_direct_analytic(
    scene: &Scene,
    sd: &ShadingData,
    sg: &mut SampleGenerator,
    stats: &mut TraceStats,
) -> Rgb {
    let lights = scene.lights();
    if lights.is_empty() {
        return Rgb::splat(0.0);
    }

    let count = lights.len();
    let index = ((sg.next_1d() * count as f32) as usize).min(count - 1);
    let inv_pdf = count as f32;

    let Some(sample) = lights[index].sample(sd.pos_w) else {
        return Rgb::splat(0.0);
    };

    let cos_theta = sample.dir.dot(sd.n);
    if cos_theta <= MIN_COS_THETA {
        return Rgb::splat(0.0);
    }

    let origin = sd.compute_new_ray_origin();
    if !trace_shadow_ray(scene, origin, sample.dir, sample.distance, stats) {
        return Rgb::splat(0.0);
    }

    (inv_pdf * cos_theta) * (Bsdf::new(sd).eval(sd, sample.dir) * sample.li)
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_1_PI;

    use glam::{UVec2, Vec2, Vec3, Vec4};

    use super::{eval_direct_analytic, trace_shadow_ray};
    use crate::{
        color::Rgb,
        integrator::payload::TraceStats,
        light::AnalyticLight,
        lod::TextureLod,
        material::{GeometryParams, MaterialDescriptor, ShadingData, TextureSlot},
        math::transform::Transform,
        sampler::SampleGenerator,
        scene::{Mesh, Scene, SceneBuilder},
    };

    fn white_lambert() -> MaterialDescriptor {
        MaterialDescriptor {
            specular: TextureSlot::Constant(Vec4::new(0.0, 0.0, 0.0, 1.0)),
            ..MaterialDescriptor::diffuse("white", TextureSlot::Constant(Vec4::ONE))
        }
    }

    /// Floor at y = 0 and an optional occluder at y = 1, point lights above
    fn scene(occluder: Option<MaterialDescriptor>, lights: &[AnalyticLight]) -> Scene {
        let mut builder = SceneBuilder::new();
        let floor = builder.insert_material(white_lambert()).unwrap();
        let quad = builder.insert_mesh(Mesh::quad(Vec2::splat(10.0), 1.0));
        builder
            .insert_instance(quad, floor, Transform::IDENTITY)
            .unwrap();
        if let Some(occluder) = occluder {
            let material = builder.insert_material(occluder).unwrap();
            let small = builder.insert_mesh(Mesh::quad(Vec2::splat(2.0), 1.0));
            builder
                .insert_instance(small, material, Transform::from_translation(Vec3::Y))
                .unwrap();
        }
        for light in lights {
            builder.insert_light(*light);
        }
        builder.build()
    }

    fn floor_point(scene: &Scene) -> ShadingData {
        let params = white_lambert().eval(scene.textures(), Vec2::ZERO, TextureLod::Mip0);
        ShadingData::new(
            &GeometryParams {
                pos_w: Vec3::ZERO,
                normal: Vec3::Y,
                tangent: Vec3::X,
                uv: Vec2::ZERO,
                face_normal: Vec3::Y,
            },
            &params,
            Vec3::Y,
        )
    }

    fn light_above() -> AnalyticLight {
        AnalyticLight::Point {
            position: Vec3::new(0.0, 2.0, 0.0),
            intensity: Rgb::splat(4.0),
        }
    }

    #[test]
    fn unoccluded_point_light() {
        let scene = scene(None, &[light_above()]);
        let sd = floor_point(&scene);
        let mut stats = TraceStats::default();
        let mut sg = SampleGenerator::new(UVec2::ZERO, 0);
        let li = eval_direct_analytic(&scene, &sd, &mut sg, &mut stats);
        // albedo / pi * cos * intensity / d^2
        assert!((li.0 - Vec3::splat(FRAC_1_PI)).abs().max_element() < 1e-5);
        assert_eq!(stats.shadow_rays, 1);
    }

    #[test]
    fn occluded_and_alpha_tested() {
        let light = [light_above()];

        let opaque = scene(Some(white_lambert()), &light);
        let mut stats = TraceStats::default();
        let mut sg = SampleGenerator::new(UVec2::ZERO, 0);
        let li = eval_direct_analytic(&opaque, &floor_point(&opaque), &mut sg, &mut stats);
        assert!(li.is_black());

        // Occluder made entirely of holes: the shadow ray goes through
        let cut_out = MaterialDescriptor::diffuse(
            "holes",
            TextureSlot::Constant(Vec4::new(1.0, 1.0, 1.0, 0.0)),
        );
        let see_through = scene(Some(cut_out), &light);
        let mut sg = SampleGenerator::new(UVec2::ZERO, 0);
        let li = eval_direct_analytic(
            &see_through,
            &floor_point(&see_through),
            &mut sg,
            &mut stats,
        );
        assert!(!li.is_black());
    }

    #[test]
    fn light_below_horizon() {
        let below = AnalyticLight::Point {
            position: Vec3::new(0.0, -2.0, 0.0),
            intensity: Rgb::splat(4.0),
        };
        let scene = scene(None, &[below]);
        let mut stats = TraceStats::default();
        let mut sg = SampleGenerator::new(UVec2::ZERO, 0);
        assert!(eval_direct_analytic(&scene, &floor_point(&scene), &mut sg, &mut stats).is_black());
        assert_eq!(stats.shadow_rays, 0);
    }

    #[test]
    fn no_lights_draws_nothing() {
        let scene = scene(None, &[]);
        let mut stats = TraceStats::default();
        let mut sg = SampleGenerator::new(UVec2::ZERO, 0);
        let mut reference = sg.clone();
        assert!(eval_direct_analytic(&scene, &floor_point(&scene), &mut sg, &mut stats).is_black());
        assert_eq!(sg.next_1d(), reference.next_1d());
    }

    #[test]
    fn uniform_pick_is_unbiased_scaled() {
        // Two identical lights: each pick returns the contribution of both
        let scene = scene(None, &[light_above(), light_above()]);
        let mut stats = TraceStats::default();
        let mut sg = SampleGenerator::new(UVec2::ZERO, 0);
        let li = eval_direct_analytic(&scene, &floor_point(&scene), &mut sg, &mut stats);
        assert!((li.0 - Vec3::splat(2.0 * FRAC_1_PI)).abs().max_element() < 1e-5);
    }

    #[test]
    fn idempotent() {
        let lights = [
            light_above(),
            AnalyticLight::Directional {
                direction: Vec3::new(0.3, -1.0, 0.2),
                irradiance: Rgb::splat(1.0),
            },
        ];
        let scene = scene(None, &lights);
        let sd = floor_point(&scene);
        let sg = SampleGenerator::new(UVec2::new(4, 2), 3);

        let mut stats = TraceStats::default();
        let a = eval_direct_analytic(&scene, &sd, &mut sg.clone(), &mut stats);
        let b = eval_direct_analytic(&scene, &sd, &mut sg.clone(), &mut stats);
        assert_eq!(a, b);
    }

    #[test]
    fn shadow_ray_range() {
        let scene = scene(Some(white_lambert()), &[]);
        let mut stats = TraceStats::default();
        let origin = Vec3::new(0.0, 0.01, 0.0);
        assert!(trace_shadow_ray(&scene, origin, Vec3::Y, 0.5, &mut stats));
        assert!(!trace_shadow_ray(&scene, origin, Vec3::Y, 2.0, &mut stats));
        assert!(trace_shadow_ray(
            &scene,
            Vec3::new(3.0, 0.01, 0.0),
            Vec3::Y,
            f32::INFINITY,
            &mut stats
        ));
        assert_eq!(stats.shadow_rays, 3);
    }
}
