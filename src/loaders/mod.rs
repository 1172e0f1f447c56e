pub mod draco;
pub mod environment;
pub mod gltf;
pub mod radiance;
pub mod request;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use draco::{DecodedPrimitive, DracoDecoder, DracoPrimitive, MeshDecoder};
pub use environment::{decode_equirectangular, load_environment, HdrImage};
pub use self::gltf::{load_model, load_model_with, DecoderConfig, DRACO_EXTENSION};
pub use radiance::{MipLevel, RadianceGenerator, RadianceMap};
pub use request::{Completer, LoadRequest, LoadState};

use crate::error::AssetError;
use crate::scene::ModelScene;

/// Decoders for the two asset kinds.
///
/// Called on loader threads; implementations must not touch scene state.
pub trait AssetSource: Send + Sync + 'static {
    fn load_environment(&self, path: &Path) -> Result<RadianceMap, AssetError>;

    fn load_model(&self, path: &Path, decoder: &DecoderConfig) -> Result<ModelScene, AssetError>;
}

/// Decodes assets from the filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FileAssets;

impl AssetSource for FileAssets {
    fn load_environment(&self, path: &Path) -> Result<RadianceMap, AssetError> {
        load_environment(path)
    }

    fn load_model(&self, path: &Path, decoder: &DecoderConfig) -> Result<ModelScene, AssetError> {
        load_model(path, decoder)
    }
}

/// A finished load, delivered to whoever owns the scene
#[derive(Debug)]
pub enum LoadCompletion {
    Environment {
        path: PathBuf,
        result: Result<RadianceMap, AssetError>,
    },
    Model {
        path: PathBuf,
        result: Result<ModelScene, AssetError>,
    },
}

/// Issues environment and model loads and collects their completions.
///
/// The two loads are independent; completions come back in whatever order
/// the decodes finish.
pub struct AssetLoader {
    source: Arc<dyn AssetSource>,
    environment: Option<LoadRequest<RadianceMap>>,
    model: Option<LoadRequest<ModelScene>>,
}

impl AssetLoader {
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self {
            source,
            environment: None,
            model: None,
        }
    }

    pub fn load_environment(&mut self, path: PathBuf) {
        log::info!("Loading environment map {:?}", path);
        let source = self.source.clone();
        let mut request = LoadRequest::new("environment", path);
        request.spawn(move |path| source.load_environment(path));
        self.environment = Some(request);
    }

    pub fn load_model(&mut self, path: PathBuf, decoder: DecoderConfig) {
        log::info!("Loading model {:?} (decoder: {:?})", path, decoder.module_dir);
        let source = self.source.clone();
        let mut request = LoadRequest::new("model", path);
        request.spawn(move |path| source.load_model(path, &decoder));
        self.model = Some(request);
    }

    /// Collect every load that finished since the last call
    pub fn poll(&mut self) -> Vec<LoadCompletion> {
        let mut completions = Vec::new();

        if let Some(request) = self.environment.as_mut() {
            if let Some(result) = request.poll() {
                completions.push(LoadCompletion::Environment {
                    path: request.path().to_path_buf(),
                    result,
                });
            }
        }

        if let Some(request) = self.model.as_mut() {
            if let Some(result) = request.poll() {
                completions.push(LoadCompletion::Model {
                    path: request.path().to_path_buf(),
                    result,
                });
            }
        }

        completions
    }

    pub fn environment_state(&self) -> LoadState {
        self.environment.as_ref().map_or(LoadState::Idle, |r| r.state())
    }

    pub fn model_state(&self) -> LoadState {
        self.model.as_ref().map_or(LoadState::Idle, |r| r.state())
    }

    pub fn has_pending(&self) -> bool {
        self.environment.as_ref().is_some_and(|r| r.is_pending())
            || self.model.as_ref().is_some_and(|r| r.is_pending())
    }

    /// Stop listening for in-flight loads
    pub fn abandon(&mut self) {
        if let Some(request) = self.environment.as_mut() {
            request.abandon();
        }
        if let Some(request) = self.model.as_mut() {
            request.abandon();
        }
    }
}
