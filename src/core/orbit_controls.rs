use glam::{Vec2, Vec3};
use std::f32::consts::PI;

use crate::camera::PerspectiveCamera;
use crate::core::viewport::Viewport;
use crate::traits::{CameraController, PointerInput};

const POLE_MARGIN: f32 = 0.01;
const ZOOM_BASE: f32 = 0.95;

/// Orbit camera controls: rotate around a target point, dolly toward it,
/// and pan the target in the view plane.
///
/// Input is accumulated between frames and applied in [`CameraController::update`].
/// The orbit is re-derived from the camera pose each update, so the camera
/// remains the source of truth.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    element_height: f32,
    pending_rotate: Vec2,
    pending_pan: Vec2,
    pending_zoom: f32,
}

impl OrbitControls {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.1,
            max_distance: 1000.0,
            element_height: viewport.clamped().height as f32,
            pending_rotate: Vec2::ZERO,
            pending_pan: Vec2::ZERO,
            pending_zoom: 0.0,
        }
    }

    pub fn with_distance_limits(mut self, min: f32, max: f32) -> Self {
        self.min_distance = min;
        self.max_distance = max.max(min);
        self
    }

    pub fn element_height(&self) -> f32 {
        self.element_height
    }

    pub fn has_pending_input(&self) -> bool {
        self.pending_rotate != Vec2::ZERO || self.pending_pan != Vec2::ZERO || self.pending_zoom != 0.0
    }
}

impl CameraController for OrbitControls {
    fn handle_input(&mut self, input: PointerInput) {
        match input {
            PointerInput::Rotate { dx, dy } => self.pending_rotate += Vec2::new(dx, dy),
            PointerInput::Pan { dx, dy } => self.pending_pan += Vec2::new(dx, dy),
            PointerInput::Zoom { delta } => self.pending_zoom += delta,
        }
    }

    fn update(&mut self, camera: &mut PerspectiveCamera) {
        if !self.has_pending_input() {
            return;
        }

        let mut offset = camera.position - camera.target;
        let mut radius = offset.length();
        if radius <= f32::EPSILON {
            radius = self.min_distance;
            offset = Vec3::Z * radius;
        }

        // Pan in the current view plane, scaled so the target tracks the cursor
        if self.pending_pan != Vec2::ZERO {
            let forward = -offset / radius;
            let right = forward.cross(camera.up).normalize_or_zero();
            let up = right.cross(forward);
            let half_fov = (camera.fov.to_radians() * 0.5).tan();
            let scale = 2.0 * radius * half_fov / self.element_height * self.pan_speed;
            camera.target += -right * self.pending_pan.x * scale + up * self.pending_pan.y * scale;
        }

        let mut yaw = offset.x.atan2(offset.z);
        let mut pitch = (offset.y / radius).clamp(-1.0, 1.0).asin();

        let angle = 2.0 * PI / self.element_height * self.rotate_speed;
        yaw -= self.pending_rotate.x * angle;
        pitch = (pitch + self.pending_rotate.y * angle)
            .clamp(-PI / 2.0 + POLE_MARGIN, PI / 2.0 - POLE_MARGIN);

        radius *= ZOOM_BASE.powf(self.pending_zoom * self.zoom_speed);
        radius = radius.clamp(self.min_distance, self.max_distance);

        let orbit = Vec3::new(
            radius * pitch.cos() * yaw.sin(),
            radius * pitch.sin(),
            radius * pitch.cos() * yaw.cos(),
        );
        camera.position = camera.target + orbit;

        self.pending_rotate = Vec2::ZERO;
        self.pending_pan = Vec2::ZERO;
        self.pending_zoom = 0.0;
    }

    fn resize(&mut self, viewport: Viewport) {
        self.element_height = viewport.clamped().height as f32;
    }
}
