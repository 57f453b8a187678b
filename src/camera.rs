//! Orbit camera for the label scene.
//!
//! Yaw and pitch are kept separately and pitch is clamped short of the poles, so the world up
//! axis stays up and labels never appear upside down.

use glam::{Mat4, Vec3};

const MAX_PITCH: f32 = 1.4;

pub struct Camera {
    pub distance: f32,
    /// Rotation around the world Y axis, radians. Zero looks down -Z.
    pub yaw: f32,
    /// Elevation above the XZ plane, radians.
    pub pitch: f32,
    pub target: Vec3,
    pub aspect: f32,
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            distance: 12.0,
            yaw: 0.0,
            pitch: 0.15,
            target: Vec3::ZERO,
            aspect: width as f32 / height.max(1) as f32,
            fovy: 45.0_f32.to_radians(),
            znear: 0.1,
            zfar: 1000.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let offset = Vec3::new(sin_yaw * cos_pitch, sin_pitch, cos_yaw * cos_pitch);
        self.target + offset * self.distance
    }

    /// Orbit by screen-space deltas in radians.
    pub fn rotate(&mut self, delta_x: f32, delta_y: f32) {
        self.yaw += delta_x;
        self.pitch = (self.pitch + delta_y).clamp(-MAX_PITCH, MAX_PITCH);
    }

    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance + delta).clamp(1.0, 200.0);
    }

    pub fn build_view_projection_matrix(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.position(), self.target, Vec3::Y);
        let proj = Mat4::perspective_rh(self.fovy, self.aspect, self.znear, self.zfar);
        proj * view
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }
}
