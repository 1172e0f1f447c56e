use crate::camera::PerspectiveCamera;
use crate::core::viewport::CanvasId;
use crate::error::DeviceError;
use crate::lifecycle::ViewerStatus;
use crate::scene::Scene;

use super::window::ViewportSurface;

/// Rendering context bound to one surface
pub trait RenderDevice {
    /// The canvas this device draws into
    fn canvas(&self) -> CanvasId;

    /// Resize the framebuffer; takes effect for the next `draw_frame`
    fn resize(&mut self, width: u32, height: u32);

    fn set_pixel_ratio(&mut self, ratio: f64);

    fn framebuffer_size(&self) -> (u32, u32);

    /// Render one frame synchronously. No frames are queued.
    fn draw_frame(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), DeviceError>;

    /// Latest viewer status for devices that draw a diagnostics overlay
    fn set_status(&mut self, _status: &ViewerStatus) {}
}

/// Creates render devices for one kind of surface
pub trait RenderBackend {
    type Surface: ViewportSurface;
    type Device: RenderDevice;

    /// Bind a new rendering context to the surface.
    /// Fails when the platform has no compatible backend.
    fn initialize(&mut self, surface: &Self::Surface) -> Result<Self::Device, DeviceError>;
}
