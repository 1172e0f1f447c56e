use glam::{Mat3, Mat4, Vec3};
use std::path::{Path, PathBuf};

use super::draco::{DecodedPrimitive, DracoDecoder, DracoPrimitive, MeshDecoder};
use crate::error::AssetError;
use crate::scene::{MeshData, ModelScene};
use crate::types::MeshVertex;

/// glTF extension for geometry-compressed primitives
pub const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";

/// Where the mesh decompression module lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    pub module_dir: PathBuf,
}

impl DecoderConfig {
    pub fn new(module_dir: impl Into<PathBuf>) -> Self {
        Self {
            module_dir: module_dir.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.module_dir.is_dir()
    }

    /// The geometry decoder, when its module directory is deployed
    pub fn decoder(&self) -> Option<DracoDecoder> {
        self.is_available().then_some(DracoDecoder)
    }
}

/// Load a glTF/glb file and flatten its default scene into world-space meshes
pub fn load_model(path: &Path, config: &DecoderConfig) -> Result<ModelScene, AssetError> {
    let decoder = config.decoder();
    load_model_with(path, config, decoder.as_ref().map(|d| d as &dyn MeshDecoder))
}

/// [`load_model`] with an explicit decoder for compressed primitives
pub fn load_model_with(
    path: &Path,
    config: &DecoderConfig,
    decoder: Option<&dyn MeshDecoder>,
) -> Result<ModelScene, AssetError> {
    log::info!("Loading glTF file: {:?}", path);

    let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let (root, blob) = parse_root(&bytes).map_err(|e| AssetError::decode(path, e))?;

    let requires_draco = root.extensions_required.iter().any(|e| e == DRACO_EXTENSION);
    let uses_draco = requires_draco || root.extensions_used.iter().any(|e| e == DRACO_EXTENSION);
    if requires_draco && decoder.is_none() {
        return Err(AssetError::MissingDecoder {
            path: path.to_path_buf(),
            extension: DRACO_EXTENSION.to_string(),
            decoder_dir: config.module_dir.clone(),
        });
    }

    // Compressed accessors carry no bufferView, which the validator rejects
    let document = if uses_draco {
        log::debug!("Using mesh decoder module in {:?}", config.module_dir);
        gltf::Document::from_json_without_validation(root)
    } else {
        gltf::Document::from_json(root).map_err(|e| AssetError::decode(path, e))?
    };
    let buffers = gltf::import_buffers(&document, path.parent(), blob)
        .map_err(|e| AssetError::decode(path, e))?;

    log::debug!(
        "glTF loaded: {} scenes, {} nodes, {} meshes, {} materials",
        document.scenes().count(),
        document.nodes().count(),
        document.meshes().count(),
        document.materials().count()
    );

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| AssetError::NoGeometry {
            path: path.to_path_buf(),
        })?;

    let sources = Sources {
        document: &document,
        buffers: &buffers,
        decoder: if uses_draco { decoder } else { None },
    };
    let mut meshes = Vec::new();
    for node in scene.nodes() {
        process_node(&node, &sources, &Mat4::IDENTITY, &mut meshes)
            .map_err(|reason| AssetError::decode(path, reason))?;
    }

    if meshes.is_empty() {
        return Err(AssetError::NoGeometry {
            path: path.to_path_buf(),
        });
    }

    let model = ModelScene {
        name: scene.name().map(str::to_string),
        meshes,
    };
    log::info!(
        "Extracted {} meshes ({} triangles) from {:?}",
        model.meshes.len(),
        model.triangle_count(),
        path
    );
    Ok(model)
}

/// Raw JSON root plus the binary chunk of a `.glb`
fn parse_root(bytes: &[u8]) -> Result<(gltf::json::Root, Option<Vec<u8>>), gltf::Error> {
    if bytes.starts_with(b"glTF") {
        let glb = gltf::Glb::from_slice(bytes)?;
        let root = gltf::json::deserialize::from_slice(&glb.json)?;
        Ok((root, glb.bin.map(|bin| bin.into_owned())))
    } else {
        Ok((gltf::json::deserialize::from_slice(bytes)?, None))
    }
}

/// Everything primitive extraction reads from
struct Sources<'a> {
    document: &'a gltf::Document,
    buffers: &'a [gltf::buffer::Data],
    decoder: Option<&'a dyn MeshDecoder>,
}

impl Sources<'_> {
    fn view_bytes(&self, index: usize) -> Result<&[u8], String> {
        let view = self
            .document
            .views()
            .nth(index)
            .ok_or_else(|| format!("bufferView {} does not exist", index))?;
        self.buffers
            .get(view.buffer().index())
            .and_then(|data| data.0.get(view.offset()..view.offset() + view.length()))
            .ok_or_else(|| format!("bufferView {} lies outside its buffer", index))
    }

    /// Model-space geometry of one triangle primitive
    fn primitive_geometry(&self, primitive: &gltf::Primitive) -> Result<DecodedPrimitive, String> {
        if let (Some(decoder), Some(ext)) = (self.decoder, primitive.extension_value(DRACO_EXTENSION)) {
            let draco = DracoPrimitive::from_extension(ext)?;
            return decoder.decode(self.view_bytes(draco.buffer_view)?, &draco);
        }

        let reader =
            primitive.reader(|buffer| self.buffers.get(buffer.index()).map(|d| &d.0[..]));
        let positions: Vec<Vec3> = reader
            .read_positions()
            .ok_or_else(|| "primitive has no positions".to_string())?
            .map(Vec3::from_array)
            .collect();
        let indices = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };
        let normals = reader
            .read_normals()
            .map(|normals| normals.map(Vec3::from_array).collect());

        Ok(DecodedPrimitive {
            positions,
            normals,
            indices,
        })
    }
}

/// Recursively processes glTF nodes
fn process_node(
    node: &gltf::Node,
    sources: &Sources,
    parent_transform: &Mat4,
    meshes: &mut Vec<MeshData>,
) -> Result<(), String> {
    let local_transform = Mat4::from_cols_array_2d(&node.transform().matrix());
    let global_transform = *parent_transform * local_transform;

    if let Some(mesh) = node.mesh() {
        process_mesh(&mesh, sources, &global_transform, meshes)?;
    }

    for child in node.children() {
        process_node(&child, sources, &global_transform, meshes)?;
    }

    Ok(())
}

fn process_mesh(
    mesh: &gltf::Mesh,
    sources: &Sources,
    transform: &Mat4,
    meshes: &mut Vec<MeshData>,
) -> Result<(), String> {
    let normal_matrix = Mat3::from_mat4(*transform).inverse().transpose();

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::debug!("Skipping non-triangle primitive in mesh {:?}", mesh.name());
            continue;
        }

        let geometry = sources
            .primitive_geometry(&primitive)
            .map_err(|e| format!("mesh {:?}: {}", mesh.name(), e))?;
        if geometry.positions.is_empty() {
            continue;
        }

        let positions: Vec<Vec3> = geometry
            .positions
            .iter()
            .map(|&p| transform.transform_point3(p))
            .collect();
        let indices = geometry.indices;
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(format!("index {} out of range for {} vertices", bad, positions.len()));
        }

        let normals: Vec<Vec3> = match geometry.normals {
            Some(normals) if normals.len() == positions.len() => normals
                .into_iter()
                .map(|n| (normal_matrix * n).normalize_or_zero())
                .collect(),
            _ => flat_normals(&positions, &indices),
        };

        let material = primitive.material();
        let pbr = material.pbr_metallic_roughness();
        let color = pbr.base_color_factor();
        let params = [pbr.metallic_factor(), pbr.roughness_factor()];

        let vertices = positions
            .iter()
            .zip(normals.iter())
            .map(|(p, n)| MeshVertex {
                position: p.to_array(),
                normal: n.to_array(),
                color,
                material: params,
            })
            .collect();

        meshes.push(MeshData {
            name: mesh.name().map(str::to_string),
            vertices,
            indices,
        });
    }

    Ok(())
}

/// Area-weighted vertex normals for primitives that carry none
fn flat_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let n = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += n;
        normals[b] += n;
        normals[c] += n;
    }
    normals.into_iter().map(|n| n.normalize_or_zero()).collect()
}
