use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use scene_viewer::cli::Cli;
use scene_viewer::config::ViewerConfig;
use scene_viewer::core::PointerAdapter;
use scene_viewer::lifecycle::SceneLifecycleManager;
use scene_viewer::loaders::FileAssets;
use scene_viewer::renderer::WgpuBackend;
use scene_viewer::window::WindowSurface;

// === Application ===

struct App {
    config: ViewerConfig,
    overlay: bool,
    surface: Option<WindowSurface>,
    viewer: Option<SceneLifecycleManager<WgpuBackend>>,
    pointer: PointerAdapter,
}

impl App {
    fn new(config: ViewerConfig, overlay: bool) -> Self {
        Self {
            config,
            overlay,
            surface: None,
            viewer: None,
            pointer: PointerAdapter::new(),
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(viewer) = self.viewer.as_mut() {
            viewer.dispose();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.surface.is_some() {
            return;
        }

        let window = match event_loop.create_window(
            Window::default_attributes()
                .with_title(self.config.window.title.clone())
                .with_inner_size(winit::dpi::LogicalSize::new(
                    self.config.window.width,
                    self.config.window.height,
                )),
        ) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let mut surface = WindowSurface::new(window);
        let mut viewer = SceneLifecycleManager::new(
            self.config.clone(),
            WgpuBackend::new(self.overlay),
            Arc::new(FileAssets),
        );

        viewer.start(&mut surface);
        if !viewer.is_running() {
            eprintln!("No compatible rendering backend; the viewer cannot start");
            event_loop.exit();
            return;
        }

        self.surface = Some(surface);
        self.viewer = Some(viewer);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let (Some(surface), Some(viewer)) = (&self.surface, &mut self.viewer) else {
            return;
        };

        // Let egui handle the event first
        if let Some(device) = viewer.device_mut() {
            if device.handle_window_event(&event) {
                self.pointer.process_consumed_event(&event);
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => self.shutdown(event_loop),
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                surface.notify_resized();
                viewer.process_resize();
            }
            WindowEvent::RedrawRequested => {
                viewer.tick();
            }
            ref pointer_event => {
                if let Some(input) = self.pointer.process_event(pointer_event) {
                    viewer.handle_input(input);
                }
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        // Asset completions must not wait for the next redraw to be installed
        if let Some(viewer) = self.viewer.as_mut() {
            viewer.poll_loads();
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = ViewerConfig::from_cli(&cli).context("Failed to load viewer configuration")?;

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, !cli.no_ui);

    log::info!("Scene Viewer - drag to orbit, right-drag to pan, scroll to zoom, Escape to quit");
    event_loop.run_app(&mut app)?;

    Ok(())
}
