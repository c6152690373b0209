//! Scene database: geometry, materials, lights and ray traversal.
pub mod bvh;
pub mod examples;
mod hit;
pub mod mesh;

pub use hit::{HitKind, PackedHitInfo, TriangleHit};
pub use mesh::Mesh;

use glam::{Mat3, Mat4, Vec2, Vec3};

use crate::{
    camera::Camera,
    light::{AnalyticLight, EnvMap, LightCounts},
    lod::triangle_lod_constant,
    material::{GeometryParams, MaterialDescriptor, MaterialId, MipTexture, TextureId},
    math::{
        bounds::Bounds,
        transform::{normal_matrix, Transform},
    },
    ray::Ray,
    Error, Result,
};

use bvh::{intersect_triangle, Bvh, PrimitiveRef, Visit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(pub u32);

bitflags::bitflags! {
    /// Traversal options
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RayFlags: u32 {
        /// Stop at the first accepted hit instead of looking for the closest one
        const ACCEPT_FIRST_HIT_AND_END_SEARCH = 1 << 0;
        /// The caller only needs to know whether something was hit: an accepted hit is
        /// reported as [TraceResult::Occluded], without its record
        const SKIP_CLOSEST_HIT = 1 << 1;
    }
}

/// Verdict of an any-hit filter on a candidate intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnyHit {
    Accept,
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TraceResult {
    Miss,
    Hit { hit: TriangleHit, t: f32 },
    /// Something was hit, traced with [RayFlags::SKIP_CLOSEST_HIT]
    Occluded,
}

#[derive(Debug, Clone, Copy)]
pub struct MeshInstance {
    pub mesh: MeshId,
    pub material: MaterialId,
    pub world: Mat4,
    pub normal_matrix: Mat3,
}

/// Everything a closest hit needs about the triangle under a hit point, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexData {
    pub positions: [Vec3; 3],
    /// Normalized vertex normals
    pub normals: [Vec3; 3],
    pub tex_coords: [Vec2; 3],

    pub pos_w: Vec3,
    /// Interpolated normal, before normalization
    pub normal: Vec3,
    pub tangent: Vec3,
    pub uv: Vec2,
    /// Normalized geometric normal following the triangle winding
    pub face_normal: Vec3,
    pub triangle_lod_constant: f32,
}

impl VertexData {
    pub fn geometry(&self) -> GeometryParams {
        GeometryParams {
            pos_w: self.pos_w,
            normal: self.normal.normalize_or_zero(),
            tangent: self.tangent,
            uv: self.uv,
            face_normal: self.face_normal,
        }
    }
}

#[derive(Debug, Default)]
pub struct SceneBuilder {
    camera: Option<Camera>,
    textures: Vec<MipTexture>,
    materials: Vec<MaterialDescriptor>,
    meshes: Vec<Mesh>,
    instances: Vec<MeshInstance>,
    lights: Vec<AnalyticLight>,
    env_map: Option<EnvMap>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_texture(&mut self, texture: MipTexture) -> TextureId {
        self.textures.push(texture);
        TextureId(self.textures.len() - 1)
    }

    /// Insert a material and returns the Material ID associated with this material
    pub fn insert_material(&mut self, material: MaterialDescriptor) -> Result<MaterialId> {
        if let Some(id) = material.textures().find(|id| id.0 >= self.textures.len()) {
            return Err(Error::UnknownTexture(id.0));
        }
        log::debug!("inserting material {:?}", material.label);
        self.materials.push(material);
        Ok(MaterialId(self.materials.len() - 1))
    }

    pub fn insert_mesh(&mut self, mesh: Mesh) -> MeshId {
        log::debug!(
            "inserting mesh {:?} ({} triangles)",
            mesh.label,
            mesh.triangle_count()
        );
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    pub fn insert_instance(
        &mut self,
        mesh: MeshId,
        material: MaterialId,
        transform: Transform,
    ) -> Result<InstanceId> {
        if mesh.0 >= self.meshes.len() {
            return Err(Error::UnknownMesh(mesh.0));
        }
        if material.0 >= self.materials.len() {
            return Err(Error::UnknownMaterial(material.0));
        }
        let world = transform.into_matrix();
        self.instances.push(MeshInstance {
            mesh,
            material,
            world,
            normal_matrix: normal_matrix(&world),
        });
        Ok(InstanceId(self.instances.len() as u32 - 1))
    }

    pub fn insert_light(&mut self, light: AnalyticLight) {
        self.lights.push(light);
    }

    pub fn set_env_map(&mut self, env_map: EnvMap) {
        self.env_map = Some(env_map);
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = Some(camera);
    }

    pub fn build(self) -> Scene {
        let world_meshes: Vec<WorldMesh> = self
            .instances
            .iter()
            .map(|instance| WorldMesh::new(&self.meshes[instance.mesh.0], instance))
            .collect();

        let primitives = world_meshes
            .iter()
            .enumerate()
            .flat_map(|(instance, mesh)| {
                mesh.triangles().map(move |(primitive, positions)| {
                    (
                        PrimitiveRef {
                            instance: instance as u32,
                            primitive: primitive as u32,
                        },
                        Bounds::from_points(&positions),
                    )
                })
            })
            .collect();
        let bvh = Bvh::build(primitives);

        Scene {
            camera: self.camera.unwrap_or_else(|| {
                Camera::look_at(Vec3::new(0.0, 1.0, 5.0), Vec3::ZERO, Vec3::Y, 0.8, 800, 600)
            }),
            textures: self.textures,
            materials: self.materials,
            light_counts: LightCounts::from_lights(&self.lights),
            lights: self.lights,
            env_map: self.env_map,
            instances: self.instances,
            world_meshes,
            bvh,
        }
    }
}

/// Instance geometry baked to world space
#[derive(Debug)]
struct WorldMesh {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    tex_coords: Vec<Vec2>,
    indices: Vec<u32>,
}

impl WorldMesh {
    fn new(mesh: &Mesh, instance: &MeshInstance) -> Self {
        Self {
            positions: mesh
                .positions
                .iter()
                .map(|&p| instance.world.transform_point3(p))
                .collect(),
            normals: mesh
                .normals
                .iter()
                .map(|&n| (instance.normal_matrix * n).normalize_or_zero())
                .collect(),
            tex_coords: mesh.tex_coords.clone(),
            indices: mesh.indices.clone(),
        }
    }

    fn triangle(&self, primitive: usize) -> Option<[usize; 3]> {
        let indices = self.indices.get(3 * primitive..3 * primitive + 3)?;
        Some([0, 1, 2].map(|i| indices[i] as usize))
    }

    fn triangles(&self) -> impl Iterator<Item = (usize, [Vec3; 3])> + '_ {
        self.indices
            .chunks_exact(3)
            .enumerate()
            .map(|(i, t)| (i, [0, 1, 2].map(|k| self.positions[t[k] as usize])))
    }
}

#[derive(Debug)]
pub struct Scene {
    pub camera: Camera,
    textures: Vec<MipTexture>,
    materials: Vec<MaterialDescriptor>,
    lights: Vec<AnalyticLight>,
    light_counts: LightCounts,
    env_map: Option<EnvMap>,
    instances: Vec<MeshInstance>,
    world_meshes: Vec<WorldMesh>,
    bvh: Bvh,
}

impl Scene {
    pub fn textures(&self) -> &[MipTexture] {
        &self.textures
    }

    pub fn lights(&self) -> &[AnalyticLight] {
        &self.lights
    }

    pub fn light_counts(&self) -> LightCounts {
        self.light_counts
    }

    pub fn env_map(&self) -> Option<&EnvMap> {
        self.env_map.as_ref()
    }

    pub fn bounds(&self) -> Bounds {
        self.bvh.bounds()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn material(&self, hit: &TriangleHit) -> Option<&MaterialDescriptor> {
        let instance = self.instances.get(hit.instance_id as usize)?;
        self.materials.get(instance.material.0)
    }

    /// Walk the acceleration structure. `any_hit` is called on every candidate intersection
    /// in the ray range and can discard it.
    pub fn trace_ray(
        &self,
        ray: &Ray,
        flags: RayFlags,
        mut any_hit: impl FnMut(&TriangleHit) -> AnyHit,
    ) -> TraceResult {
        let mut closest = TraceResult::Miss;
        self.bvh.traverse(ray, |primitive, ray| {
            let Some(positions) = self.world_positions(primitive) else {
                return Visit::Continue;
            };
            let Some((t, barycentrics)) = intersect_triangle(ray, positions) else {
                return Visit::Continue;
            };

            let hit = TriangleHit {
                instance_id: primitive.instance,
                primitive_index: primitive.primitive,
                barycentrics,
            };
            if any_hit(&hit) == AnyHit::Ignore {
                return Visit::Continue;
            }

            closest = TraceResult::Hit { hit, t };
            if flags.contains(RayFlags::ACCEPT_FIRST_HIT_AND_END_SEARCH) {
                Visit::Terminate
            } else {
                Visit::Hit { t }
            }
        });
        if flags.contains(RayFlags::SKIP_CLOSEST_HIT) && closest != TraceResult::Miss {
            closest = TraceResult::Occluded;
        }
        log::trace!("trace_ray {:?} -> {:?}", ray.direction, closest);
        closest
    }

    /// Any-hit filter discarding the cut out parts of alpha tested materials
    pub fn alpha_test(&self, hit: &TriangleHit) -> AnyHit {
        let (Some(material), Some(vertex)) = (self.material(hit), self.vertex_data(hit)) else {
            return AnyHit::Accept;
        };
        if material.alpha_test(&self.textures, vertex.uv) {
            AnyHit::Ignore
        } else {
            AnyHit::Accept
        }
    }

    fn world_positions(&self, primitive: PrimitiveRef) -> Option<[Vec3; 3]> {
        let mesh = self.world_meshes.get(primitive.instance as usize)?;
        let indices = mesh.triangle(primitive.primitive as usize)?;
        Some(indices.map(|i| mesh.positions[i]))
    }

    /// Fetch and interpolate the vertex attributes under a hit. None if the hit does not
    /// refer to a triangle of this scene.
    pub fn vertex_data(&self, hit: &TriangleHit) -> Option<VertexData> {
        let mesh = self.world_meshes.get(hit.instance_id as usize)?;
        let indices = mesh.triangle(hit.primitive_index as usize)?;

        let positions = indices.map(|i| mesh.positions[i]);
        let normals = indices.map(|i| mesh.normals[i]);
        let tex_coords = indices.map(|i| mesh.tex_coords[i]);
        let [w0, w1, w2] = hit.barycentric_weights();

        let edge1 = positions[1] - positions[0];
        let edge2 = positions[2] - positions[0];
        let duv1 = tex_coords[1] - tex_coords[0];
        let duv2 = tex_coords[2] - tex_coords[0];
        let det = duv1.x * duv2.y - duv1.y * duv2.x;
        let tangent = if det != 0.0 {
            ((edge1 * duv2.y - edge2 * duv1.y) / det).normalize_or_zero()
        } else {
            Vec3::ZERO
        };

        Some(VertexData {
            positions,
            normals,
            tex_coords,
            pos_w: w0 * positions[0] + w1 * positions[1] + w2 * positions[2],
            normal: w0 * normals[0] + w1 * normals[1] + w2 * normals[2],
            tangent,
            uv: w0 * tex_coords[0] + w1 * tex_coords[1] + w2 * tex_coords[2],
            face_normal: edge1.cross(edge2).normalize_or_zero(),
            triangle_lod_constant: triangle_lod_constant(positions, tex_coords),
        })
    }
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec2, Vec3, Vec4};

    use super::{AnyHit, Mesh, RayFlags, SceneBuilder, TraceResult};
    use crate::{
        material::{MaterialDescriptor, MipTexture, TextureSlot},
        math::transform::Transform,
        ray::Ray,
        Error,
    };

    fn two_quads() -> super::Scene {
        let mut builder = SceneBuilder::new();
        let stripes = builder.insert_texture(MipTexture::checkerboard(
            8,
            2,
            Vec4::new(1.0, 1.0, 1.0, 0.0),
            Vec4::ONE,
        ));
        let fence = builder
            .insert_material(MaterialDescriptor::diffuse(
                "fence",
                TextureSlot::Texture(stripes),
            ))
            .unwrap();
        let floor = builder
            .insert_material(MaterialDescriptor::default())
            .unwrap();
        let quad = builder.insert_mesh(Mesh::quad(Vec2::splat(2.0), 1.0));
        builder
            .insert_instance(quad, fence, Transform::from_translation(Vec3::Y))
            .unwrap();
        builder
            .insert_instance(quad, floor, Transform::IDENTITY)
            .unwrap();
        builder.build()
    }

    #[test]
    fn closest_hit() {
        let scene = two_quads();
        let ray = Ray::new(Vec3::new(0.1, 5.0, 0.3), -Vec3::Y);
        let TraceResult::Hit { hit, t } =
            scene.trace_ray(&ray, RayFlags::empty(), |_| AnyHit::Accept)
        else {
            panic!("expected a hit");
        };
        assert_eq!(hit.instance_id, 0);
        assert!((t - 4.0).abs() < 1e-5);

        let vertex = scene.vertex_data(&hit).unwrap();
        assert!((vertex.pos_w - Vec3::new(0.1, 1.0, 0.3)).length() < 1e-5);
        assert!((vertex.face_normal - Vec3::Y).length() < 1e-5);
        assert!((vertex.uv - Vec2::new(0.55, 0.35)).length() < 1e-5);
        // the unit uv square is spread over a 2x2 quad
        assert!((vertex.triangle_lod_constant - 0.5 * f32::log2(0.25)).abs() < 1e-5);
    }

    #[test]
    fn any_hit_can_ignore() {
        let scene = two_quads();
        // uv (0.5625, 0.5625) lies in an even cell: opaque. uv (0.5625, 0.4375) is cut out.
        let opaque = Ray::new(Vec3::new(0.125, 5.0, -0.125), -Vec3::Y);
        let cut_out = Ray::new(Vec3::new(0.125, 5.0, 0.125), -Vec3::Y);

        let instance = |ray: &Ray| {
            match scene.trace_ray(ray, RayFlags::empty(), |hit| scene.alpha_test(hit)) {
                TraceResult::Hit { hit, .. } => Some(hit.instance_id),
                TraceResult::Miss => None,
                TraceResult::Occluded => unreachable!("traced without SKIP_CLOSEST_HIT"),
            }
        };
        assert_eq!(instance(&opaque), Some(0));
        assert_eq!(instance(&cut_out), Some(1));

        let ignore_all = scene.trace_ray(&opaque, RayFlags::empty(), |_| AnyHit::Ignore);
        assert_eq!(ignore_all, TraceResult::Miss);
    }

    #[test]
    fn first_hit_ends_search() {
        let scene = two_quads();
        let ray = Ray::new(Vec3::new(0.1, 5.0, 0.3), -Vec3::Y);
        let mut candidates = 0;
        let result = scene.trace_ray(
            &ray,
            RayFlags::ACCEPT_FIRST_HIT_AND_END_SEARCH | RayFlags::SKIP_CLOSEST_HIT,
            |_| {
                candidates += 1;
                AnyHit::Accept
            },
        );
        assert_eq!(result, TraceResult::Occluded);
        assert_eq!(candidates, 1);
    }

    #[test]
    fn skip_closest_hit_drops_the_record() {
        let scene = two_quads();
        let ray = Ray::new(Vec3::new(0.1, 5.0, 0.3), -Vec3::Y);
        let mut candidates = 0;
        let result = scene.trace_ray(&ray, RayFlags::SKIP_CLOSEST_HIT, |_| {
            candidates += 1;
            AnyHit::Accept
        });
        assert_eq!(result, TraceResult::Occluded);
        assert!(candidates >= 1);

        let miss = Ray::new(Vec3::new(5.0, 5.0, 5.0), -Vec3::Y);
        let result = scene.trace_ray(&miss, RayFlags::SKIP_CLOSEST_HIT, |_| AnyHit::Accept);
        assert_eq!(result, TraceResult::Miss);
        let ignored = scene.trace_ray(&ray, RayFlags::SKIP_CLOSEST_HIT, |_| AnyHit::Ignore);
        assert_eq!(ignored, TraceResult::Miss);
    }

    #[test]
    fn rotated_instance_normals() {
        let mut builder = SceneBuilder::new();
        let material = builder
            .insert_material(MaterialDescriptor::default())
            .unwrap();
        let quad = builder.insert_mesh(Mesh::quad(Vec2::splat(2.0), 1.0));
        builder
            .insert_instance(
                quad,
                material,
                Transform {
                    translation: Vec3::new(0.0, 0.0, -1.0),
                    scale: Vec3::new(1.0, 1.0, 3.0),
                    rot: Quat::from_rotation_x(std::f32::consts::FRAC_PI_2),
                },
            )
            .unwrap();
        let scene = builder.build();

        let ray = Ray::new(Vec3::new(0.2, 0.2, 2.0), -Vec3::Z);
        let TraceResult::Hit { hit, .. } =
            scene.trace_ray(&ray, RayFlags::empty(), |_| AnyHit::Accept)
        else {
            panic!("expected a hit");
        };
        let vertex = scene.vertex_data(&hit).unwrap();
        assert!((vertex.normals[0] - Vec3::Z).length() < 1e-5);
        assert!((vertex.face_normal - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn unknown_ids() {
        let mut builder = SceneBuilder::new();
        assert!(matches!(
            builder.insert_material(MaterialDescriptor::diffuse(
                "missing",
                TextureSlot::Texture(crate::material::TextureId(3))
            )),
            Err(Error::UnknownTexture(3))
        ));
        let quad = builder.insert_mesh(Mesh::quad(Vec2::ONE, 1.0));
        assert!(matches!(
            builder.insert_instance(quad, crate::material::MaterialId(0), Transform::IDENTITY),
            Err(Error::UnknownMaterial(0))
        ));
    }
}
