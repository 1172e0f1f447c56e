use std::path::PathBuf;

use thiserror::Error;

/// Failure to bring up (or keep) a rendering context on the surface.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no compatible rendering backend: {0}")]
    NoAdapter(String),

    #[error("failed to create device: {0}")]
    RequestDevice(String),

    #[error("failed to create surface: {0}")]
    CreateSurface(String),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

/// Failure of a single asset load. Terminal to the load, never to the viewer.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("{path} decoded to an empty image")]
    EmptyImage { path: PathBuf },

    #[error("{path} contains no renderable geometry")]
    NoGeometry { path: PathBuf },

    #[error("{path} requires {extension} but no decoder module was found in {decoder_dir}")]
    MissingDecoder {
        path: PathBuf,
        extension: String,
        decoder_dir: PathBuf,
    },

    #[error("load was abandoned before completing")]
    Cancelled,
}

impl AssetError {
    pub fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
