use glam::Vec3;
use std::sync::Arc;

use crate::camera::PerspectiveCamera;
use crate::config::{AssetPaths, ViewerConfig};
use crate::core::orbit_controls::OrbitControls;
use crate::core::viewport::{ResizeSubscription, Viewport};
use crate::frame::{FpsCounter, FrameInfo, FrameLoop};
use crate::loaders::{AssetLoader, AssetSource, DecoderConfig, LoadCompletion, LoadState};
use crate::scene::{AxesHelper, Scene, SceneObject};
use crate::traits::{CameraController, PointerInput, RenderBackend, RenderDevice, ViewportSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Running,
    Disposed,
}

/// Snapshot of the running viewer for diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerStatus {
    pub fps: f32,
    pub frame: u64,
    pub viewport: Viewport,
    pub camera_position: Vec3,
    pub camera_target: Vec3,
    pub environment: LoadState,
    pub model: LoadState,
}

/// Everything that exists only between `start` and `dispose`
struct Running<D> {
    scene: Scene,
    camera: PerspectiveCamera,
    device: D,
    controls: OrbitControls,
    loader: AssetLoader,
    resize: ResizeSubscription,
    frame_loop: FrameLoop,
    viewport: Viewport,
    fps: FpsCounter,
}

/// Owns the scene, camera, render device, controls and asset loads of one
/// viewer, and drives its frame loop.
///
/// All scene mutation happens on the thread that owns the manager: asset
/// decodes run elsewhere but are only applied from [`Self::poll_loads`].
pub struct SceneLifecycleManager<B: RenderBackend> {
    config: ViewerConfig,
    paths: AssetPaths,
    backend: B,
    source: Arc<dyn AssetSource>,
    state: LifecycleState,
    running: Option<Running<B::Device>>,
}

impl<B: RenderBackend> SceneLifecycleManager<B> {
    pub fn new(config: ViewerConfig, backend: B, source: Arc<dyn AssetSource>) -> Self {
        let paths = AssetPaths::resolve(&config);
        Self {
            config,
            paths,
            backend,
            source,
            state: LifecycleState::Uninitialized,
            running: None,
        }
    }

    /// Build the viewer inside `surface` and begin rendering.
    ///
    /// Any canvas already attached to the surface is removed first, so
    /// repeated starts leave exactly one. If no rendering context can be
    /// created the failure is logged and the manager is left not running.
    pub fn start(&mut self, surface: &mut B::Surface) {
        if let Some(previous) = self.running.take() {
            log::warn!("Viewer already running; restarting");
            Self::teardown(previous);
        }

        while let Some(canvas) = surface.detach_canvas() {
            log::info!("Removed previously attached canvas {:?}", canvas);
        }

        let raw = surface.viewport();
        if raw.is_degenerate() {
            log::warn!(
                "Surface is {}x{}; clamping to at least one pixel",
                raw.width,
                raw.height
            );
        }
        let viewport = raw.clamped();

        let mut device = match self.backend.initialize(surface) {
            Ok(device) => device,
            Err(e) => {
                log::error!("Failed to initialize render device: {}", e);
                self.state = LifecycleState::Uninitialized;
                return;
            }
        };
        surface.attach_canvas(device.canvas());
        device.set_pixel_ratio(viewport.pixel_ratio);
        device.resize(viewport.width, viewport.height);

        let mut scene = Scene::new();
        if let Some(size) = self.config.axes_helper {
            scene.add(SceneObject::Axes(AxesHelper::new(size)));
        }

        let camera = PerspectiveCamera::from_config(&self.config.camera, viewport);

        let mut loader = AssetLoader::new(self.source.clone());
        loader.load_environment(self.paths.environment_map.clone());
        loader.load_model(
            self.paths.model.clone(),
            DecoderConfig::new(self.paths.decoder_dir.clone()),
        );

        let controls = OrbitControls::new(viewport)
            .with_distance_limits(camera.near, camera.far);
        let resize = surface.resize_signal().subscribe();

        let mut frame_loop = FrameLoop::new(surface.scheduler());
        frame_loop.begin();

        log::info!(
            "Viewer started at {}x{} (pixel ratio {})",
            viewport.width,
            viewport.height,
            viewport.pixel_ratio
        );

        self.running = Some(Running {
            scene,
            camera,
            device,
            controls,
            loader,
            resize,
            frame_loop,
            viewport,
            fps: FpsCounter::new(),
        });
        self.state = LifecycleState::Running;
    }

    /// Match camera aspect, framebuffer size and pixel ratio to the surface
    pub fn on_resize(&mut self, viewport: Viewport) {
        let Some(running) = self.running.as_mut() else {
            return;
        };

        if viewport.is_degenerate() {
            log::warn!(
                "Resize to {}x{}; clamping to at least one pixel",
                viewport.width,
                viewport.height
            );
        }
        let viewport = viewport.clamped();

        log::info!(
            "Resize {}x{} -> {}x{}",
            running.viewport.width,
            running.viewport.height,
            viewport.width,
            viewport.height
        );

        running.camera.update_aspect(viewport);
        running.device.resize(viewport.width, viewport.height);
        running.device.set_pixel_ratio(viewport.pixel_ratio);
        running.controls.resize(viewport);
        running.viewport = viewport;
    }

    /// Apply the latest resize emitted by the surface, if any
    pub fn process_resize(&mut self) -> bool {
        let pending = self.running.as_ref().and_then(|r| r.resize.take());
        match pending {
            Some(viewport) => {
                self.on_resize(viewport);
                true
            }
            None => false,
        }
    }

    /// Install every asset load that finished since the last call.
    /// Returns how many completions were handled.
    pub fn poll_loads(&mut self) -> usize {
        let Some(running) = self.running.as_mut() else {
            return 0;
        };

        let completions = running.loader.poll();
        let handled = completions.len();

        for completion in completions {
            match completion {
                LoadCompletion::Environment { path, result } => match result {
                    Ok(map) => {
                        log::info!(
                            "Installed environment map {:?} ({} levels)",
                            path,
                            map.mip_count()
                        );
                        running.scene.set_environment(Arc::new(map));
                    }
                    Err(e) => log::error!("Environment map {:?} failed to load: {}", path, e),
                },
                LoadCompletion::Model { path, result } => match result {
                    Ok(model) => {
                        log::info!(
                            "Attached model {:?} ({} triangles)",
                            path,
                            model.triangle_count()
                        );
                        running.scene.add(SceneObject::Model(Arc::new(model)));
                    }
                    Err(e) => log::error!("Model {:?} failed to load: {}", path, e),
                },
            }
        }

        handled
    }

    /// One frame loop iteration: render the current scene and camera, then
    /// reschedule. Returns `None` when no frame slot was due.
    pub fn tick(&mut self) -> Option<FrameInfo> {
        self.process_resize();
        self.poll_loads();

        let status = self.status();
        let running = self.running.as_mut()?;
        let frame = running.frame_loop.next_frame()?;

        running.controls.update(&mut running.camera);
        running.fps.record(frame.delta);

        if let Some(status) = status {
            running.device.set_status(&status);
        }
        if let Err(e) = running.device.draw_frame(&running.scene, &running.camera) {
            log::error!("Frame {} failed to render: {}", frame.number, e);
        }

        running.frame_loop.reschedule();
        Some(frame)
    }

    pub fn handle_input(&mut self, input: PointerInput) {
        if let Some(running) = self.running.as_mut() {
            running.controls.handle_input(input);
        }
    }

    /// Stop the frame loop and release everything `start` created.
    /// In-flight loads are abandoned and their results discarded.
    pub fn dispose(&mut self) {
        if let Some(running) = self.running.take() {
            Self::teardown(running);
        }
        if self.state != LifecycleState::Disposed {
            log::info!("Viewer disposed");
        }
        self.state = LifecycleState::Disposed;
    }

    fn teardown(mut running: Running<B::Device>) {
        running.frame_loop.stop();
        running.loader.abandon();
        log::debug!(
            "Released viewer after {} frames",
            running.frame_loop.frame_count()
        );
        // Dropping the subscription unsubscribes; device and scene go with it.
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LifecycleState::Running
    }

    pub fn status(&self) -> Option<ViewerStatus> {
        let running = self.running.as_ref()?;
        Some(ViewerStatus {
            fps: running.fps.fps(),
            frame: running.frame_loop.frame_count(),
            viewport: running.viewport,
            camera_position: running.camera.position,
            camera_target: running.camera.target,
            environment: running.loader.environment_state(),
            model: running.loader.model_state(),
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn asset_paths(&self) -> &AssetPaths {
        &self.paths
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.running.as_ref().map(|r| &r.scene)
    }

    pub fn camera(&self) -> Option<&PerspectiveCamera> {
        self.running.as_ref().map(|r| &r.camera)
    }

    pub fn device(&self) -> Option<&B::Device> {
        self.running.as_ref().map(|r| &r.device)
    }

    pub fn device_mut(&mut self) -> Option<&mut B::Device> {
        self.running.as_mut().map(|r| &mut r.device)
    }

    pub fn controls(&self) -> Option<&OrbitControls> {
        self.running.as_ref().map(|r| &r.controls)
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.running.as_ref().map(|r| r.viewport)
    }

    pub fn has_pending_loads(&self) -> bool {
        self.running.as_ref().is_some_and(|r| r.loader.has_pending())
    }
}
