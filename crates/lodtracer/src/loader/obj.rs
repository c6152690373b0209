use std::{collections::HashMap, path::Path};

use glam::{Vec2, Vec3, Vec4};

use crate::{
    material::{MaterialDescriptor, MaterialId, MipTexture, TextureSlot},
    math::transform::Transform,
    scene::{Mesh, SceneBuilder},
    Error, Result,
};

pub trait ObjLoaderExt {
    /// Insert every model of an OBJ file, with its MTL materials when there are some.
    /// `default_material` is used for models without a material.
    fn load_obj<P: AsRef<Path>>(
        &mut self,
        mesh_path: P,
        transform: Transform,
        default_material: MaterialId,
    ) -> Result<()>;
}

impl ObjLoaderExt for SceneBuilder {
    fn load_obj<P: AsRef<Path>>(
        &mut self,
        mesh_path: P,
        transform: Transform,
        default_material: MaterialId,
    ) -> Result<()> {
        let mesh_path = mesh_path.as_ref();
        let (models, materials) =
            tobj::load_obj(mesh_path, &tobj::GPU_LOAD_OPTIONS).map_err(|source| Error::Obj {
                path: mesh_path.to_owned(),
                source,
            })?;

        let materials = materials.unwrap_or_else(|err| {
            log::warn!("no usable material library for {}: {err}", mesh_path.display());
            Vec::new()
        });

        let base_dir = mesh_path.parent().unwrap_or_else(|| Path::new("."));
        let mut textures = HashMap::new();
        let mut material_ids = Vec::with_capacity(materials.len());
        for material in materials {
            let base_color = if material.diffuse_texture.is_empty() {
                TextureSlot::Constant(Vec3::from(material.diffuse).extend(material.dissolve))
            } else {
                let texture_path = base_dir.join(&material.diffuse_texture);
                let id = match textures.get(&texture_path) {
                    Some(id) => *id,
                    None => {
                        let id = self.insert_texture(MipTexture::from_image(&texture_path, true)?);
                        textures.insert(texture_path, id);
                        id
                    }
                };
                TextureSlot::Texture(id)
            };

            let emissive = material
                .unknown_param
                .get("Ke")
                .and_then(|ke| parse_vec3(ke))
                .filter(|ke| *ke != Vec3::ZERO);

            // Phong exponent to roughness, as in the usual Blinn-Phong/Beckmann mapping
            let roughness = f32::sqrt(2.0 / (material.shininess + 2.0)).clamp(0.0, 1.0);
            let mat_id = self.insert_material(MaterialDescriptor {
                label: Some(material.name.clone()),
                base_color,
                specular: TextureSlot::Constant(Vec3::from(material.specular).extend(roughness)),
                emissive: TextureSlot::Constant(emissive.unwrap_or(Vec3::ZERO).extend(1.0)),
                ior: if material.optical_density > 0.0 {
                    material.optical_density
                } else {
                    1.5
                },
                ..Default::default()
            })?;

            log::debug!(
                "Inserting material {} with diffuse {:?} on mat_id {:?}",
                material.name,
                material.diffuse,
                mat_id
            );
            material_ids.push(mat_id);
        }

        for model in models {
            log::debug!("Loading model {}", model.name);
            let mesh = model.mesh;

            let material = mesh
                .material_id
                .and_then(|id| material_ids.get(id).copied())
                .unwrap_or(default_material);

            let positions = mesh
                .positions
                .chunks_exact(3)
                .map(|p| Vec3::new(p[0], p[1], p[2]))
                .collect();
            let normals = mesh
                .normals
                .chunks_exact(3)
                .map(|n| Vec3::new(n[0], n[1], n[2]))
                .collect();
            // OBJ puts v = 0 at the bottom of the image
            let tex_coords = mesh
                .texcoords
                .chunks_exact(2)
                .map(|t| Vec2::new(t[0], 1.0 - t[1]))
                .collect();

            let mesh = Mesh::new(
                Some(model.name),
                positions,
                normals,
                tex_coords,
                mesh.indices,
            )?;
            let mesh_id = self.insert_mesh(mesh);
            self.insert_instance(mesh_id, material, transform)?;
        }
        Ok(())
    }
}

fn parse_vec3(s: &str) -> Option<Vec3> {
    let values: Vec<f32> = s
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    match values[..] {
        [x, y, z] => Some(Vec3::new(x, y, z)),
        _ => None,
    }
}

/// Opaque white, used for OBJ models without a material library
pub fn default_obj_material() -> MaterialDescriptor {
    MaterialDescriptor::diffuse("obj default", TextureSlot::Constant(Vec4::new(0.8, 0.8, 0.8, 1.0)))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use glam::{Vec2, Vec3};

    use super::{default_obj_material, parse_vec3, ObjLoaderExt};
    use crate::{math::transform::Transform, scene::SceneBuilder};

    #[test]
    fn parse_emission() {
        assert_eq!(parse_vec3("1 0.5 0"), Some(Vec3::new(1.0, 0.5, 0.0)));
        assert_eq!(parse_vec3("1 0.5"), None);
        assert_eq!(parse_vec3("a b c"), None);
    }

    #[test]
    fn load_triangle() {
        let path = std::env::temp_dir().join(format!(
            "lodtracer-{}-triangle.obj",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "v 0 0 0\nv 1 0 0\nv 0 0 -1\nvt 0 0\nvt 1 0\nvt 0 1\nvn 0 1 0\nf 1/1/1 2/2/1 3/3/1"
        )
        .unwrap();
        drop(file);

        let mut builder = SceneBuilder::new();
        let material = builder.insert_material(default_obj_material()).unwrap();
        builder
            .load_obj(&path, Transform::IDENTITY, material)
            .unwrap();
        std::fs::remove_file(&path).unwrap();

        let scene = builder.build();
        assert_eq!(scene.instance_count(), 1);
        let hit = crate::scene::TriangleHit {
            instance_id: 0,
            primitive_index: 0,
            barycentrics: Vec2::new(0.5, 0.0),
        };
        let vertex = scene.vertex_data(&hit).unwrap();
        assert_eq!(vertex.uv, Vec2::new(0.5, 1.0));
        assert_eq!(vertex.normals[0], Vec3::Y);
    }

    #[test]
    fn missing_file() {
        let mut builder = SceneBuilder::new();
        let material = builder.insert_material(default_obj_material()).unwrap();
        assert!(builder
            .load_obj("/nonexistent/model.obj", Transform::IDENTITY, material)
            .is_err());
    }
}
