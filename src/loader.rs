//! glTF model loading.
//!
//! Decoding runs on tokio's blocking pool. The result is a [`LoadedModel`]: the
//! scene graph with one surface per mesh primitive, plus world-space vertex data
//! ready to upload.

use std::path::{Path, PathBuf};

use glam::{Mat3, Mat4, Quat, Vec3};
use log::{debug, info, warn};

use crate::color::Color;
use crate::error::{Result, ViewerError};
use crate::math::{Aabb, Transform};
use crate::scene::{Material, NodeId, SceneGraph, SurfaceId};

/// World-space vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Geometry of one surface.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub surface: SurfaceId,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct LoadedModel {
    pub scene: SceneGraph,
    pub meshes: Vec<MeshData>,
    /// `None` when the model carries no triangle geometry.
    pub bounds: Option<Aabb>,
}

/// Progress of the model load as seen by the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready { parts: usize, surfaces: usize },
    Failed(String),
}

impl LoadState {
    pub fn is_ready(&self) -> bool {
        matches!(self, LoadState::Ready { .. })
    }
}

/// Read and decode a `.glb` / `.gltf` file. Blocking.
pub fn load_model(path: &Path) -> Result<LoadedModel> {
    let (document, buffers, _images) = gltf::import(path).map_err(|source| ViewerError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    let model = build_model(&document, &buffers);
    info!(
        "loaded {}: {} nodes, {} surfaces",
        path.display(),
        model.scene.nodes().len(),
        model.scene.surfaces().len()
    );
    Ok(model)
}

/// Decode a model held in memory (GLB bytes or glTF JSON with embedded buffers).
pub fn load_model_from_slice(bytes: &[u8]) -> Result<LoadedModel> {
    let (document, buffers, _images) =
        gltf::import_slice(bytes).map_err(|source| ViewerError::Load {
            path: PathBuf::from("<memory>"),
            source,
        })?;
    Ok(build_model(&document, &buffers))
}

/// Decode on the blocking pool without stalling the async caller.
pub async fn load_model_async(path: PathBuf) -> Result<LoadedModel> {
    tokio::task::spawn_blocking(move || load_model(&path))
        .await
        .map_err(|e| ViewerError::LoadTask(e.to_string()))?
}

/// Start loading in the background and hand the outcome to `deliver`.
pub fn spawn_load<F>(path: PathBuf, deliver: F) -> tokio::task::JoinHandle<()>
where
    F: FnOnce(Result<LoadedModel>) + Send + 'static,
{
    tokio::spawn(async move {
        debug!("loading model from {}", path.display());
        deliver(load_model_async(path).await);
    })
}

fn build_model(document: &gltf::Document, buffers: &[gltf::buffer::Data]) -> LoadedModel {
    let mut model = LoadedModel::default();

    match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => {
            for node in scene.nodes() {
                add_node(&node, None, buffers, &mut model);
            }
        }
        None => warn!("model contains no scenes"),
    }

    model.bounds = Aabb::from_points(
        model
            .meshes
            .iter()
            .flat_map(|m| m.vertices.iter().map(|v| Vec3::from(v.position))),
    );
    model
}

fn add_node(
    node: &gltf::Node<'_>,
    parent: Option<NodeId>,
    buffers: &[gltf::buffer::Data],
    model: &mut LoadedModel,
) {
    let (translation, rotation, scale) = node.transform().decomposed();
    let transform = Transform::new(
        Vec3::from(translation),
        Quat::from_array(rotation),
        Vec3::from(scale),
    );
    let id = model
        .scene
        .add_node(node.name().map(str::to_owned), transform, parent);
    let world = model.scene.world_matrix(id);

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if !matches!(primitive.mode(), gltf::mesh::Mode::Triangles) {
                debug!(
                    "skipping {:?} primitive on node {:?}",
                    primitive.mode(),
                    node.name()
                );
                continue;
            }
            let Some((vertices, indices)) = read_primitive(&primitive, buffers, world) else {
                warn!("primitive on node {:?} has no positions", node.name());
                continue;
            };

            let material = primitive.material();
            let base_color = Color::from(material.pbr_metallic_roughness().base_color_factor());
            let surface = model.scene.add_surface(
                id,
                Material::paintable(material.name().map(str::to_owned), base_color),
            );
            model.meshes.push(MeshData {
                surface,
                vertices,
                indices,
            });
        }
    }

    for child in node.children() {
        add_node(&child, Some(id), buffers, model);
    }
}

fn read_primitive(
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
    world: Mat4,
) -> Option<(Vec<Vertex>, Vec<u32>)> {
    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions: Vec<Vec3> = reader.read_positions()?.map(Vec3::from).collect();
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    let normals: Vec<Vec3> = match reader.read_normals() {
        Some(normals) => normals.map(Vec3::from).collect(),
        None => compute_normals(&positions, &indices),
    };

    let normal_matrix = Mat3::from_mat4(world).inverse().transpose();
    let vertices = positions
        .iter()
        .zip(normals.iter().chain(std::iter::repeat(&Vec3::Y)))
        .map(|(p, n)| Vertex {
            position: world.transform_point3(*p).to_array(),
            normal: (normal_matrix * *n).normalize_or_zero().to_array(),
        })
        .collect();

    Some((vertices, indices))
}

/// Smooth normals from triangle faces, for meshes exported without them.
fn compute_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    normals
        .into_iter()
        .map(|n| {
            let n = n.normalize_or_zero();
            if n == Vec3::ZERO {
                Vec3::Y
            } else {
                n
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// One triangle mesh instanced three times: two nodes named `door`, one `body`,
    /// all sharing a single glTF material.
    pub(crate) const THREE_PANELS: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [
            { "name": "car", "children": [1, 2, 3] },
            { "name": "door", "mesh": 0, "translation": [2.0, 0.0, 0.0] },
            { "name": "door", "mesh": 0, "translation": [-3.0, 0.0, 0.0] },
            { "name": "body", "mesh": 0 }
        ],
        "meshes": [{
            "name": "panel",
            "primitives": [{ "attributes": { "POSITION": 0 }, "material": 0 }]
        }],
        "materials": [{
            "name": "paint",
            "pbrMetallicRoughness": { "baseColorFactor": [0.2, 0.2, 0.2, 1.0] }
        }],
        "buffers": [{
            "byteLength": 36,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
        }],
        "bufferViews": [{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }],
        "accessors": [{
            "bufferView": 0,
            "componentType": 5126,
            "count": 3,
            "type": "VEC3",
            "min": [0.0, 0.0, 0.0],
            "max": [1.0, 1.0, 0.0]
        }]
    }"#;

    pub(crate) fn three_panels() -> LoadedModel {
        load_model_from_slice(THREE_PANELS.as_bytes()).expect("embedded model should decode")
    }

    #[test]
    fn every_instance_gets_its_own_surface() {
        let model = three_panels();
        assert_eq!(model.scene.nodes().len(), 4);
        assert_eq!(model.scene.surfaces().len(), 3);
        assert_eq!(model.meshes.len(), 3);

        let doors: Vec<_> = model.scene.find_nodes("door").collect();
        assert_eq!(doors.len(), 2);
        for surface in model.scene.surfaces() {
            assert_eq!(surface.material.name.as_deref(), Some("paint"));
            assert_relative_eq!(surface.material.base_color.r, 0.2);
        }
    }

    #[test]
    fn vertices_are_baked_into_world_space() {
        let model = three_panels();
        let bounds = model.bounds.expect("model has geometry");
        assert_eq!(bounds.min, Vec3::new(-3.0, 0.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(3.0, 1.0, 0.0));

        // missing normals are rebuilt from the face: +Z for this winding
        for mesh in &model.meshes {
            assert_eq!(mesh.indices, vec![0, 1, 2]);
            for v in &mesh.vertices {
                assert_relative_eq!(v.normal[2], 1.0);
            }
        }
    }

    #[test]
    fn baked_vertices_follow_the_node_world_matrix() {
        let model = three_panels();
        let corners = [Vec3::ZERO, Vec3::X, Vec3::Y];
        for mesh in &model.meshes {
            let node = model.scene.surface(mesh.surface).unwrap().node;
            let world = model.scene.world_matrix(node);
            for (v, local) in mesh.vertices.iter().zip(corners) {
                assert_eq!(Vec3::from(v.position), world.transform_point3(local));
            }
        }
    }

    #[test]
    fn garbage_bytes_fail_to_load() {
        let err = load_model_from_slice(b"definitely not gltf").unwrap_err();
        assert!(matches!(err, ViewerError::Load { .. }));
    }

    #[tokio::test]
    async fn missing_file_reports_load_error() {
        let path = PathBuf::from("does/not/exist/car.glb");
        let err = load_model_async(path.clone()).await.unwrap_err();
        match err {
            ViewerError::Load { path: failed, .. } => assert_eq!(failed, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn spawned_load_delivers_its_result() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let handle = spawn_load(PathBuf::from("missing.glb"), move |result| {
            let _ = tx.send(result.is_err());
        });
        handle.await.unwrap();
        assert!(rx.await.unwrap());
    }

    #[test]
    fn computed_normals_fall_back_to_up_for_degenerate_faces() {
        let positions = [Vec3::ZERO, Vec3::ZERO, Vec3::ZERO];
        let normals = compute_normals(&positions, &[0, 1, 2]);
        assert_eq!(normals, vec![Vec3::Y; 3]);
    }
}
