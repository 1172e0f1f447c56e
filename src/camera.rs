use glam::{Mat4, Vec3};

use crate::config::CameraConfig;
use crate::core::viewport::Viewport;
use crate::types::CameraUniform;

/// Perspective camera.
///
/// The aspect ratio is derived from the surface: it can only be changed
/// through [`PerspectiveCamera::update_aspect`], which also refreshes the
/// cached projection matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    aspect: f32,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov: f32, viewport: Viewport, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov,
            near,
            far,
            position: Vec3::ZERO,
            target: Vec3::NEG_Z,
            up: Vec3::Y,
            aspect: viewport.aspect(),
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn from_config(config: &CameraConfig, viewport: Viewport) -> Self {
        let mut camera = Self::new(config.fov, viewport, config.near, config.far);
        camera.position = Vec3::from_array(config.position);
        camera.target = Vec3::from_array(config.target);
        camera
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Re-derive the aspect ratio from the surface and rebuild the projection
    pub fn update_aspect(&mut self, viewport: Viewport) {
        self.aspect = viewport.aspect();
        self.update_projection_matrix();
    }

    /// Recompute the projection after changing fov or clip planes
    pub fn update_projection_matrix(&mut self) {
        self.projection =
            Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far);
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or(Vec3::NEG_Z)
    }

    pub fn to_uniform(&self) -> CameraUniform {
        let view = self.view_matrix();
        // Rotation-only inverse for reconstructing world-space view rays
        let inv_view_rotation = Mat4::from_mat3(glam::Mat3::from_mat4(view).transpose());
        CameraUniform {
            view_proj: self.view_projection().to_cols_array_2d(),
            inv_proj: self.projection.inverse().to_cols_array_2d(),
            inv_view_rotation: inv_view_rotation.to_cols_array_2d(),
            position: self.position.to_array(),
            _pad: 0.0,
        }
    }
}
