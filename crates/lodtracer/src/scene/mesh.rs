//! Triangle meshes and a few procedural shapes.
use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};

use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub label: Option<String>,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tex_coords: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Check the attribute streams against each other. Missing normals are replaced by area
    /// weighted vertex normals, missing texture coordinates by zeros.
    pub fn new(
        label: Option<String>,
        positions: Vec<Vec3>,
        normals: Vec<Vec3>,
        tex_coords: Vec<Vec2>,
        indices: Vec<u32>,
    ) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidMesh {
            label: label.clone().unwrap_or_default(),
            reason,
        };

        if indices.len() % 3 != 0 {
            return Err(invalid(format!(
                "{} indices is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(index) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(invalid(format!(
                "index {index} out of bounds for {} vertices",
                positions.len()
            )));
        }
        if !normals.is_empty() && normals.len() != positions.len() {
            return Err(invalid(format!(
                "{} normals for {} vertices",
                normals.len(),
                positions.len()
            )));
        }
        if !tex_coords.is_empty() && tex_coords.len() != positions.len() {
            return Err(invalid(format!(
                "{} texture coordinates for {} vertices",
                tex_coords.len(),
                positions.len()
            )));
        }

        let mut mesh = Self {
            label,
            tex_coords: if tex_coords.is_empty() {
                vec![Vec2::ZERO; positions.len()]
            } else {
                tex_coords
            },
            positions,
            normals,
            indices,
        };
        if mesh.normals.is_empty() {
            mesh.normals = mesh.vertex_normals();
        }
        Ok(mesh)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangle(&self, primitive: usize) -> Option<[usize; 3]> {
        let indices = self.indices.get(3 * primitive..3 * primitive + 3)?;
        Some([
            indices[0] as usize,
            indices[1] as usize,
            indices[2] as usize,
        ])
    }

    fn vertex_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for triangle in self.indices.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|i| triangle[i] as usize);
            let area_normal = (self.positions[b] - self.positions[a])
                .cross(self.positions[c] - self.positions[a]);
            for i in [a, b, c] {
                normals[i] += area_normal;
            }
        }
        normals.iter().map(|n| n.normalize_or_zero()).collect()
    }

    /// A `size.x` by `size.y` rectangle in the xz plane facing +y. Texture coordinates span
    /// `[0, uv_scale]`.
    pub fn quad(size: Vec2, uv_scale: f32) -> Self {
        let mut mesh = Self {
            label: Some("quad".to_owned()),
            ..Default::default()
        };
        mesh.push_face(
            Vec3::ZERO,
            0.5 * size.x * Vec3::X,
            -0.5 * size.y * Vec3::Z,
            uv_scale,
        );
        mesh
    }

    /// Axis aligned box centered on the origin, one texture square per face
    pub fn cube(half_size: Vec3) -> Self {
        let mut mesh = Self {
            label: Some("cube".to_owned()),
            ..Default::default()
        };
        let Vec3 { x, y, z } = half_size;
        let faces = [
            (x * Vec3::X, -z * Vec3::Z, y * Vec3::Y),
            (-x * Vec3::X, z * Vec3::Z, y * Vec3::Y),
            (y * Vec3::Y, x * Vec3::X, -z * Vec3::Z),
            (-y * Vec3::Y, x * Vec3::X, z * Vec3::Z),
            (z * Vec3::Z, x * Vec3::X, y * Vec3::Y),
            (-z * Vec3::Z, -x * Vec3::X, y * Vec3::Y),
        ];
        for (center, half_u, half_v) in faces {
            mesh.push_face(center, half_u, half_v, 1.0);
        }
        mesh
    }

    pub fn uv_sphere(radius: f32, segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);

        let mut mesh = Self {
            label: Some("sphere".to_owned()),
            ..Default::default()
        };
        for i in 0..=rings {
            let theta = PI * i as f32 / rings as f32;
            for j in 0..=segments {
                let phi = TAU * j as f32 / segments as f32;
                let n = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
                mesh.positions.push(radius * n);
                mesh.normals.push(n);
                mesh.tex_coords.push(Vec2::new(
                    j as f32 / segments as f32,
                    i as f32 / rings as f32,
                ));
            }
        }

        let vertex = |i: u32, j: u32| i * (segments + 1) + j;
        for i in 0..rings {
            for j in 0..segments {
                let (a, b) = (vertex(i, j), vertex(i + 1, j));
                let (c, d) = (vertex(i + 1, j + 1), vertex(i, j + 1));
                // Skip the zero area triangles at the poles
                if i != rings - 1 {
                    mesh.indices.extend([a, c, b]);
                }
                if i != 0 {
                    mesh.indices.extend([a, d, c]);
                }
            }
        }
        mesh
    }

    /// Push a rectangle facing `half_u x half_v`
    fn push_face(&mut self, center: Vec3, half_u: Vec3, half_v: Vec3, uv_scale: f32) {
        let base = self.positions.len() as u32;
        let normal = half_u.cross(half_v).normalize();
        let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
        for (u, v) in corners {
            self.positions.push(center + u * half_u + v * half_v);
            self.normals.push(normal);
            self.tex_coords
                .push(uv_scale * Vec2::new(0.5 * (u + 1.0), 0.5 * (v + 1.0)));
        }
        self.indices
            .extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}
