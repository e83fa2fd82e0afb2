use anyhow::{ensure, Context, Result};
use glam::{Quat, Vec3};
use std::path::Path;

use crate::geometry::Geometry;
use crate::material::Material;
use crate::math::Color;
use crate::scene::{Mesh, Model, Transform};

/// Loads a glTF/GLB file as a detached model tree. The top node is named
/// after the scene (or the file when the scene has no name).
pub fn load_gltf(path: impl AsRef<Path>) -> Result<Model> {
    let path = path.as_ref();
    log::info!("Loading glTF file: {:?}", path);

    let (gltf, buffers, _images) = gltf::import(path)
        .context(format!("Failed to load glTF file: {:?}", path))?;

    log::debug!(
        "glTF loaded: {} scenes, {} nodes, {} meshes, {} animations",
        gltf.scenes().count(),
        gltf.nodes().count(),
        gltf.meshes().count(),
        gltf.animations().count()
    );

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .context("glTF file has no scenes")?;

    let fallback_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut model = Model::group(scene.name().map(str::to_owned).unwrap_or(fallback_name));

    for node in scene.nodes() {
        model.children.push(process_node(&node, &buffers)?);
    }

    if model.mesh_count() == 0 {
        log::warn!("No geometry found in glTF file {:?}", path);
    }

    Ok(model)
}

/// Converts a glTF node and its subtree
fn process_node(node: &gltf::Node, buffers: &[gltf::buffer::Data]) -> Result<Model> {
    let (translation, rotation, scale) = node.transform().decomposed();
    let mut model = Model {
        name: node.name().unwrap_or_default().to_string(),
        transform: Transform {
            position: Vec3::from_array(translation),
            rotation: Quat::from_array(rotation),
            scale: Vec3::from_array(scale),
        },
        ..Default::default()
    };

    if let Some(mesh) = node.mesh() {
        let mut primitives = process_mesh(&mesh, buffers)?;
        if primitives.len() == 1 {
            model.mesh = primitives.pop();
        } else {
            // One child per primitive so each keeps its material
            for (i, primitive) in primitives.into_iter().enumerate() {
                model.children.push(Model {
                    name: format!("{}_{}", mesh.name().unwrap_or("primitive"), i),
                    mesh: Some(primitive),
                    ..Default::default()
                });
            }
        }
    }

    for child in node.children() {
        model.children.push(process_node(&child, buffers)?);
    }

    Ok(model)
}

/// Reads every triangle primitive of a glTF mesh
fn process_mesh(mesh: &gltf::Mesh, buffers: &[gltf::buffer::Data]) -> Result<Vec<Mesh>> {
    log::trace!("Processing mesh: {:?}", mesh.name());
    let mut out = Vec::new();

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!("Skipping {:?} primitive in mesh {:?}", primitive.mode(), mesh.name());
            continue;
        }

        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

        let positions: Vec<f32> = reader
            .read_positions()
            .context("Mesh primitive has no positions")?
            .flatten()
            .collect();
        if positions.is_empty() {
            continue;
        }

        let normals: Vec<f32> = reader
            .read_normals()
            .map(|n| n.flatten().collect())
            .unwrap_or_default();
        let indices = reader.read_indices().map(|i| i.into_u32().collect::<Vec<u32>>());
        let vertex_count = positions.len() / 3;
        if let Some(indices) = &indices {
            ensure!(
                indices.iter().all(|&i| (i as usize) < vertex_count),
                "Mesh {:?} has an index past its {} vertices",
                mesh.name().unwrap_or_default(),
                vertex_count
            );
        }

        let mut geometry = Geometry::new(positions, normals, indices);
        if geometry.normals.len() != geometry.positions.len() {
            geometry.compute_vertex_normals();
        }

        let pbr = primitive.material().pbr_metallic_roughness();
        let base = pbr.base_color_factor();
        let material = Material::Standard {
            color: Color::new(base[0], base[1], base[2]),
            roughness: pbr.roughness_factor(),
            metalness: pbr.metallic_factor(),
        };

        out.push(Mesh { geometry, material });
    }

    Ok(out)
}
