#![allow(dead_code)]

use glam::Vec3;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use scene_viewer::camera::PerspectiveCamera;
use scene_viewer::config::ViewerConfig;
use scene_viewer::core::viewport::{CanvasId, ResizeSignal, Viewport};
use scene_viewer::error::{AssetError, DeviceError};
use scene_viewer::loaders::{AssetSource, DecoderConfig, RadianceGenerator, RadianceMap};
use scene_viewer::scene::{MeshData, ModelScene, Scene};
use scene_viewer::traits::{FrameScheduler, RenderBackend, RenderDevice, ViewportSurface};
use scene_viewer::types::MeshVertex;
use scene_viewer::SceneLifecycleManager;

// ============================================================================
// Surface
// ============================================================================

#[derive(Debug, Default)]
pub struct MockScheduler {
    requests: AtomicUsize,
}

impl MockScheduler {
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl FrameScheduler for MockScheduler {
    fn request_frame(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

/// Container with a settable size, standing in for a host window
pub struct MockSurface {
    viewport: Viewport,
    signal: ResizeSignal,
    canvases: Vec<CanvasId>,
    pub scheduler: Arc<MockScheduler>,
}

impl MockSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            viewport: Viewport::new(width, height),
            signal: ResizeSignal::new(),
            canvases: Vec::new(),
            scheduler: Arc::new(MockScheduler::default()),
        }
    }

    /// Change size and fire the host resize signal
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::new(width, height).with_pixel_ratio(self.viewport.pixel_ratio);
        self.signal.emit(self.viewport);
    }

    pub fn set_pixel_ratio(&mut self, ratio: f64) {
        self.viewport = self.viewport.with_pixel_ratio(ratio);
        self.signal.emit(self.viewport);
    }

    pub fn subscriber_count(&self) -> usize {
        self.signal.subscriber_count()
    }
}

impl ViewportSurface for MockSurface {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn resize_signal(&self) -> &ResizeSignal {
        &self.signal
    }

    fn detach_canvas(&mut self) -> Option<CanvasId> {
        self.canvases.pop()
    }

    fn attach_canvas(&mut self, canvas: CanvasId) {
        self.canvases.push(canvas);
    }

    fn attached_canvases(&self) -> Vec<CanvasId> {
        self.canvases.clone()
    }

    fn scheduler(&self) -> Arc<dyn FrameScheduler> {
        self.scheduler.clone()
    }
}

// ============================================================================
// Device
// ============================================================================

/// What one `draw_frame` call observed
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub aspect: f32,
    pub framebuffer: (u32, u32),
    pub has_environment: bool,
    pub has_background: bool,
    pub models: usize,
    pub camera_position: Vec3,
}

pub struct MockDevice {
    canvas: CanvasId,
    size: (u32, u32),
    pub pixel_ratio: f64,
    pub draws: Vec<DrawRecord>,
    pub fail_draws: bool,
}

impl RenderDevice for MockDevice {
    fn canvas(&self) -> CanvasId {
        self.canvas
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = ratio;
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        self.size
    }

    fn draw_frame(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), DeviceError> {
        self.draws.push(DrawRecord {
            aspect: camera.aspect(),
            framebuffer: self.size,
            has_environment: scene.environment().is_some(),
            has_background: scene.background().is_some(),
            models: scene.models().count(),
            camera_position: camera.position,
        });
        if self.fail_draws {
            return Err(DeviceError::Surface(wgpu::SurfaceError::Timeout));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MockBackend {
    pub unavailable: bool,
    pub fail_draws: bool,
    pub initialized: usize,
}

impl RenderBackend for MockBackend {
    type Surface = MockSurface;
    type Device = MockDevice;

    fn initialize(&mut self, _surface: &MockSurface) -> Result<MockDevice, DeviceError> {
        if self.unavailable {
            return Err(DeviceError::NoAdapter("no compatible backend".into()));
        }
        self.initialized += 1;
        Ok(MockDevice {
            canvas: CanvasId::next(),
            size: (0, 0),
            pixel_ratio: 0.0,
            draws: Vec::new(),
            fail_draws: self.fail_draws,
        })
    }
}

// ============================================================================
// Assets
// ============================================================================

/// Hands a load its result only when the test releases it
pub struct Gate<T> {
    receiver: Mutex<Receiver<Result<T, AssetError>>>,
}

impl<T> Gate<T> {
    fn wait(&self) -> Result<T, AssetError> {
        let receiver = self.receiver.lock().map_err(|_| AssetError::Cancelled)?;
        receiver.recv().unwrap_or(Err(AssetError::Cancelled))
    }
}

pub struct GatedAssets {
    environment: Gate<RadianceMap>,
    model: Gate<ModelScene>,
    pub requested: Mutex<Vec<PathBuf>>,
    pub decoder_dirs: Mutex<Vec<PathBuf>>,
}

/// Test-side handles that complete the gated loads
pub struct Release {
    pub environment: Sender<Result<RadianceMap, AssetError>>,
    pub model: Sender<Result<ModelScene, AssetError>>,
}

impl GatedAssets {
    pub fn new() -> (Arc<Self>, Release) {
        let (env_tx, env_rx) = mpsc::channel();
        let (model_tx, model_rx) = mpsc::channel();
        let assets = Arc::new(Self {
            environment: Gate {
                receiver: Mutex::new(env_rx),
            },
            model: Gate {
                receiver: Mutex::new(model_rx),
            },
            requested: Mutex::new(Vec::new()),
            decoder_dirs: Mutex::new(Vec::new()),
        });
        (
            assets,
            Release {
                environment: env_tx,
                model: model_tx,
            },
        )
    }
}

impl AssetSource for GatedAssets {
    fn load_environment(&self, path: &Path) -> Result<RadianceMap, AssetError> {
        self.requested.lock().unwrap().push(path.to_path_buf());
        self.environment.wait()
    }

    fn load_model(&self, path: &Path, decoder: &DecoderConfig) -> Result<ModelScene, AssetError> {
        self.requested.lock().unwrap().push(path.to_path_buf());
        self.decoder_dirs
            .lock()
            .unwrap()
            .push(decoder.module_dir.clone());
        self.model.wait()
    }
}

pub fn radiance_map(value: f32) -> RadianceMap {
    let texels = vec![[value, value * 0.5, value * 0.25, 1.0]; 32 * 16];
    let mut generator = RadianceGenerator::with_limits(32, 4);
    let map = generator.from_equirectangular(32, 16, texels).unwrap();
    generator.dispose();
    map
}

pub fn triangle_model() -> ModelScene {
    let vertex = |position: [f32; 3]| MeshVertex {
        position,
        normal: [0.0, 0.0, 1.0],
        color: [0.8, 0.8, 0.8, 1.0],
        material: [0.0, 0.5],
    };
    ModelScene {
        name: Some("triangle".into()),
        meshes: vec![MeshData {
            name: Some("tri".into()),
            vertices: vec![
                vertex([0.0, 0.0, 0.0]),
                vertex([10.0, 0.0, 0.0]),
                vertex([0.0, 10.0, 0.0]),
            ],
            indices: vec![0, 1, 2],
        }],
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub type Viewer = SceneLifecycleManager<MockBackend>;

pub fn viewer(source: Arc<dyn AssetSource>) -> Viewer {
    SceneLifecycleManager::new(ViewerConfig::default(), MockBackend::default(), source)
}

/// A viewer whose loads never complete unless released
pub fn gated_viewer() -> (Viewer, Arc<GatedAssets>, Release) {
    let (assets, release) = GatedAssets::new();
    (viewer(assets.clone()), assets, release)
}

/// Poll loads until `done` holds, failing the test after a few seconds
pub fn wait_for(viewer: &mut Viewer, mut done: impl FnMut(&Viewer) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        viewer.poll_loads();
        if done(viewer) {
            return;
        }
        assert!(Instant::now() < deadline, "timed out waiting for loads");
        std::thread::sleep(Duration::from_millis(1));
    }
}

pub fn draws(viewer: &Viewer) -> &[DrawRecord] {
    &viewer.device().expect("viewer is running").draws
}
