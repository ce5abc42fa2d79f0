//! Pinhole camera model (C7 data side — ray generation lives in
//! [`crate::camera_rays`]).

use glam::{Affine3A, Mat4, Vec3};

/// A pinhole camera described by its four frustum-corner directions at unit depth,
/// matching §3's "Camera" entity and `original_source`'s `RTPinholeCamera` layout
/// (`r00, r10, r01, r11`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub world_to_clip: Mat4,
    /// Unnormalized ray direction through the bottom-left corner of the image at
    /// unit depth.
    pub r00: Vec3,
    /// Bottom-right corner direction.
    pub r10: Vec3,
    /// Top-left corner direction.
    pub r01: Vec3,
    /// Top-right corner direction.
    pub r11: Vec3,
    /// Physical width of the virtual image plane at unit depth.
    pub width: f32,
    /// Physical height of the virtual image plane at unit depth.
    pub height: f32,
}

impl Camera {
    /// Builds a pinhole camera from a look-at transform and vertical FOV, matching
    /// the teacher's `Camera`/`Frustum` construction in spirit (`scene::camera`) but
    /// producing the four-corner-direction layout this design's integrators need.
    #[must_use]
    pub fn perspective(eye: Vec3, target: Vec3, up: Vec3, vfov_degrees: f32, aspect: f32) -> Self {
        let forward = (target - eye).normalize();
        let right = forward.cross(up).normalize();
        let true_up = right.cross(forward).normalize();

        let half_h = (vfov_degrees.to_radians() * 0.5).tan();
        let half_w = half_h * aspect;

        let r00 = forward - right * half_w - true_up * half_h;
        let r10 = forward + right * half_w - true_up * half_h;
        let r01 = forward - right * half_w + true_up * half_h;
        let r11 = forward + right * half_w + true_up * half_h;

        let view = Affine3A::look_at_rh(eye, target, up);
        let proj = Mat4::perspective_rh(vfov_degrees.to_radians(), aspect, 1e-3, 1.0e4);
        let world_to_clip = proj * Mat4::from(view);

        Self {
            position: eye,
            forward,
            world_to_clip,
            r00,
            r10,
            r01,
            r11,
            width: 2.0 * half_w,
            height: 2.0 * half_h,
        }
    }

    /// Area of the virtual image plane at unit depth, used by the BDPT camera
    /// vertex's forward-PDF conversion (`1 / (area * cos⁴θ_ndc)`, §4.8).
    #[must_use]
    pub fn image_plane_area(&self) -> f32 {
        self.width * self.height
    }
}

/// Plain-old-data mirror of [`Camera`] for device upload, overwritten wholesale
/// every frame (§3 lifecycle: "the camera block is overwritten each frame").
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RenderCamera {
    pub position: [f32; 4],
    pub r00: [f32; 4],
    pub r10: [f32; 4],
    pub r01: [f32; 4],
    pub r11: [f32; 4],
    pub width: f32,
    pub height: f32,
    pub area: f32,
    pub _pad: f32,
}

impl From<&Camera> for RenderCamera {
    fn from(c: &Camera) -> Self {
        Self {
            position: [c.position.x, c.position.y, c.position.z, 1.0],
            r00: [c.r00.x, c.r00.y, c.r00.z, 0.0],
            r10: [c.r10.x, c.r10.y, c.r10.z, 0.0],
            r01: [c.r01.x, c.r01.y, c.r01.z, 0.0],
            r11: [c.r11.x, c.r11.y, c.r11.z, 0.0],
            width: c.width,
            height: c.height,
            area: c.image_plane_area(),
            _pad: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_plane_area_is_positive_for_a_valid_fov() {
        let cam = Camera::perspective(Vec3::ZERO, Vec3::Z, Vec3::Y, 60.0, 16.0 / 9.0);
        assert!(cam.image_plane_area() > 0.0);
    }

    #[test]
    fn render_camera_round_trips_position() {
        let cam = Camera::perspective(Vec3::new(1.0, 2.0, 3.0), Vec3::Z, Vec3::Y, 45.0, 1.0);
        let rc = RenderCamera::from(&cam);
        assert_eq!(rc.position[0], 1.0);
        assert_eq!(rc.position[1], 2.0);
        assert_eq!(rc.position[2], 3.0);
    }
}
