use std::sync::Arc;

use crate::loaders::radiance::RadianceMap;
use crate::types::{LineVertex, MeshVertex};

/// Triangle mesh in world space
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub name: Option<String>,
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

/// Decoded model: the sub-scene attached to the main scene on load
#[derive(Debug, Clone, PartialEq)]
pub struct ModelScene {
    pub name: Option<String>,
    pub meshes: Vec<MeshData>,
}

impl ModelScene {
    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.indices.len() / 3).sum()
    }
}

/// World axes helper: X red, Y green, Z blue
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxesHelper {
    pub size: f32,
}

impl AxesHelper {
    pub fn new(size: f32) -> Self {
        Self { size }
    }

    pub fn line_vertices(&self) -> Vec<LineVertex> {
        let s = self.size;
        let axis = |end: [f32; 3], color: [f32; 3]| {
            [
                LineVertex { position: [0.0; 3], color },
                LineVertex { position: end, color },
            ]
        };
        [
            axis([s, 0.0, 0.0], [1.0, 0.0, 0.0]),
            axis([0.0, s, 0.0], [0.0, 1.0, 0.0]),
            axis([0.0, 0.0, s], [0.0, 0.0, 1.0]),
        ]
        .concat()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneObject {
    Model(Arc<ModelScene>),
    Axes(AxesHelper),
}

/// Renderable objects plus ambient environment state.
///
/// `revision` increases on every mutation so render devices can tell when
/// their GPU copies are stale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    background: Option<Arc<RadianceMap>>,
    environment: Option<Arc<RadianceMap>>,
    children: Vec<SceneObject>,
    revision: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a radiance map as both background and lighting environment.
    /// Replaces whatever was installed before.
    pub fn set_environment(&mut self, map: Arc<RadianceMap>) {
        self.environment = Some(map.clone());
        self.background = Some(map);
        self.revision += 1;
    }

    pub fn add(&mut self, object: SceneObject) {
        self.children.push(object);
        self.revision += 1;
    }

    pub fn background(&self) -> Option<&Arc<RadianceMap>> {
        self.background.as_ref()
    }

    pub fn environment(&self) -> Option<&Arc<RadianceMap>> {
        self.environment.as_ref()
    }

    pub fn children(&self) -> &[SceneObject] {
        &self.children
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn models(&self) -> impl Iterator<Item = &Arc<ModelScene>> {
        self.children.iter().filter_map(|child| match child {
            SceneObject::Model(model) => Some(model),
            _ => None,
        })
    }

    /// All helper line segments as a line list
    pub fn line_vertices(&self) -> Vec<LineVertex> {
        self.children
            .iter()
            .filter_map(|child| match child {
                SceneObject::Axes(axes) => Some(axes.line_vertices()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Same content, ignoring how many mutations produced it
    pub fn same_content(&self, other: &Scene) -> bool {
        self.background == other.background
            && self.environment == other.environment
            && self.children == other.children
    }
}
