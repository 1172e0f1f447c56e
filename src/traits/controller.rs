use crate::camera::PerspectiveCamera;
use crate::core::viewport::Viewport;

/// Pointer and wheel input, already separated from the windowing system
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    /// Drag with the rotate button held, in pixels
    Rotate { dx: f32, dy: f32 },
    /// Drag with the pan button held, in pixels
    Pan { dx: f32, dy: f32 },
    /// Wheel steps; positive zooms in
    Zoom { delta: f32 },
}

/// Turns user input into camera pose changes.
/// Built once per camera and kept for the viewer's lifetime.
pub trait CameraController {
    fn handle_input(&mut self, input: PointerInput);

    /// Apply accumulated input to the camera pose
    fn update(&mut self, camera: &mut PerspectiveCamera);

    /// The input element changed size. Controller state must survive this.
    fn resize(&mut self, _viewport: Viewport) {}
}
