use std::sync::Arc;
use winit::window::Window as WinitWindow;

use crate::core::viewport::{CanvasId, ResizeSignal, Viewport};
use crate::traits::{FrameScheduler, ViewportSurface};

impl FrameScheduler for WinitWindow {
    fn request_frame(&self) {
        self.request_redraw();
    }
}

/// Wrapper around a winit window acting as the viewer's container
pub struct WindowSurface {
    inner: Arc<WinitWindow>,
    resize_signal: ResizeSignal,
    canvases: Vec<CanvasId>,
}

impl WindowSurface {
    pub fn new(window: Arc<WinitWindow>) -> Self {
        Self {
            inner: window,
            resize_signal: ResizeSignal::new(),
            canvases: Vec::new(),
        }
    }

    pub fn inner(&self) -> &Arc<WinitWindow> {
        &self.inner
    }

    /// Forward a host resize or scale change to subscribers
    pub fn notify_resized(&self) {
        self.resize_signal.emit(self.viewport());
    }
}

impl ViewportSurface for WindowSurface {
    fn viewport(&self) -> Viewport {
        let size = self.inner.inner_size();
        Viewport::new(size.width, size.height).with_pixel_ratio(self.inner.scale_factor())
    }

    fn resize_signal(&self) -> &ResizeSignal {
        &self.resize_signal
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
        self.inner.clone()
    }
}
