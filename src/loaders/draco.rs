use glam::Vec3;
use serde::Deserialize;
use std::collections::HashMap;

use draco_oxide_core::attribute::{Attribute, ComponentDataType};
use draco_oxide_core::mesh::Mesh;

/// `KHR_draco_mesh_compression` payload of one primitive
#[derive(Debug, Clone, Deserialize)]
pub struct DracoPrimitive {
    #[serde(rename = "bufferView")]
    pub buffer_view: usize,
    /// glTF semantic name to attribute id inside the compressed stream
    pub attributes: HashMap<String, u32>,
}

impl DracoPrimitive {
    pub fn from_extension(value: &serde_json::Value) -> Result<Self, String> {
        serde_json::from_value(value.clone()).map_err(|e| format!("malformed Draco extension: {}", e))
    }

    pub fn position_id(&self) -> Result<u32, String> {
        self.attributes
            .get("POSITION")
            .copied()
            .ok_or_else(|| "Draco extension maps no POSITION attribute".to_string())
    }

    pub fn normal_id(&self) -> Option<u32> {
        self.attributes.get("NORMAL").copied()
    }
}

/// Geometry of one decompressed primitive, still in model space
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedPrimitive {
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub indices: Vec<u32>,
}

/// Decompresses the geometry stream of a compressed primitive
pub trait MeshDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8], primitive: &DracoPrimitive) -> Result<DecodedPrimitive, String>;
}

/// Native Draco bitstream decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct DracoDecoder;

impl MeshDecoder for DracoDecoder {
    fn decode(&self, bytes: &[u8], primitive: &DracoPrimitive) -> Result<DecodedPrimitive, String> {
        let mesh = draco_oxide_decoder::decode_mesh(bytes).map_err(|e| format!("Draco: {}", e))?;

        let positions = read_vec3(&mesh, primitive.position_id()?)?;
        let normals = match primitive.normal_id() {
            Some(id) => Some(read_vec3(&mesh, id)?),
            None => None,
        };

        let mut indices = Vec::with_capacity(mesh.faces.len() * 3);
        for face in &mesh.faces {
            indices.extend(face.iter().map(|&p| usize::from(p) as u32));
        }

        log::debug!(
            "Decoded Draco primitive: {} points, {} faces",
            positions.len(),
            mesh.faces.len()
        );

        Ok(DecodedPrimitive {
            positions,
            normals,
            indices,
        })
    }
}

fn find_attribute(mesh: &Mesh, id: u32) -> Result<&Attribute, String> {
    mesh.attributes
        .iter()
        .find(|att| att.get_id().as_usize() == id as usize)
        .ok_or_else(|| format!("Draco stream has no attribute {}", id))
}

/// Per-point three-component float values of attribute `id`
fn read_vec3(mesh: &Mesh, id: u32) -> Result<Vec<Vec3>, String> {
    let att = find_attribute(mesh, id)?;
    if att.get_component_type() != ComponentDataType::F32 || att.get_num_components() != 3 {
        return Err(format!(
            "Draco attribute {} is {:?}x{}, expected F32x3",
            id,
            att.get_component_type(),
            att.get_num_components()
        ));
    }

    let values: Vec<f32> = att
        .get_data_as_bytes()
        .chunks_exact(4)
        .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    let value = |i: usize| -> Result<Vec3, String> {
        values
            .get(i * 3..i * 3 + 3)
            .map(Vec3::from_slice)
            .ok_or_else(|| format!("Draco attribute {} value {} out of range", id, i))
    };

    match att.point_map_as_slice() {
        Some(map) => map.iter().map(|&v| value(usize::from(v))).collect(),
        None => (0..att.len()).map(value).collect(),
    }
}
