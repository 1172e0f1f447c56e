pub mod camera;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod frame;
pub mod lifecycle;
pub mod loaders;
pub mod overlay;
pub mod renderer;
pub mod scene;
pub mod traits;
pub mod types;
pub mod window;

pub use lifecycle::{LifecycleState, SceneLifecycleManager, ViewerStatus};
