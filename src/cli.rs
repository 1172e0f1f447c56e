// cli.rs - Command-line interface configuration
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "scene-viewer")]
#[command(about = "HDR-lit glTF scene viewer", long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Static asset base path that asset paths resolve against
    #[arg(long = "asset-base")]
    pub asset_base: Option<PathBuf>,

    /// Equirectangular environment map (.exr or .hdr)
    #[arg(long = "environment-map")]
    pub environment_map: Option<PathBuf>,

    /// glTF / glb model
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Mesh decompression module directory
    #[arg(long = "decoder-dir")]
    pub decoder_dir: Option<PathBuf>,

    /// Disable the debug overlay
    #[arg(long = "no-ui", default_value = "false")]
    pub no_ui: bool,
}
