use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::Cli;

/// Viewer configuration, loadable from a JSON file.
/// Every field is optional in the file; missing ones take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Deployment-time static asset base; all asset paths resolve against it
    pub asset_base: PathBuf,
    pub environment_map: PathBuf,
    pub model: PathBuf,
    /// Directory holding the mesh decompression module
    pub decoder_dir: PathBuf,
    pub window: WindowConfig,
    pub camera: CameraConfig,
    /// Length of the world axes helper, `None` to leave it out
    pub axes_helper: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            asset_base: PathBuf::from("public"),
            environment_map: PathBuf::from("models/login.EXR"),
            model: PathBuf::from("models/login.glb"),
            decoder_dir: PathBuf::from("draco"),
            window: WindowConfig::default(),
            camera: CameraConfig::default(),
            axes_helper: Some(100.0),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Scene Viewer".to_string(),
            width: 800,
            height: 600,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 30.0,
            near: 0.1,
            far: 1000.0,
            position: [-10.0, -90.0, 130.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}

impl ViewerConfig {
    /// Read a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_json(&text).with_context(|| format!("Invalid config file: {:?}", path))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build the effective config: file (if given) overridden by command-line values
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if let Some(base) = &cli.asset_base {
            config.asset_base = base.clone();
        }
        if let Some(env) = &cli.environment_map {
            config.environment_map = env.clone();
        }
        if let Some(model) = &cli.model {
            config.model = model.clone();
        }
        if let Some(dir) = &cli.decoder_dir {
            config.decoder_dir = dir.clone();
        }

        Ok(config)
    }
}

/// Asset locations after resolution against the asset base
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    pub environment_map: PathBuf,
    pub model: PathBuf,
    pub decoder_dir: PathBuf,
}

impl AssetPaths {
    pub fn resolve(config: &ViewerConfig) -> Self {
        let base = &config.asset_base;
        Self {
            environment_map: base.join(&config.environment_map),
            model: base.join(&config.model),
            decoder_dir: base.join(&config.decoder_dir),
        }
    }
}
