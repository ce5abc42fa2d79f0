//! Primary ray generation (C7, §4.6).

use crate::oracle::Ray;
use crate::scene::camera::Camera;
use glam::Vec3;

/// A primary ray plus its differentials with respect to pixel x/y, used by texture
/// filtering and by BDPT's camera-subpath area-measure PDF conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayDifferential {
    pub ray: Ray,
    pub d_origin_dx: Vec3,
    pub d_origin_dy: Vec3,
    pub d_direction_dx: Vec3,
    pub d_direction_dy: Vec3,
}

/// Bilinearly interpolates the camera's four frustum-corner directions at
/// `(u, v) ∈ [0,1]²`.
#[must_use]
fn corner_lerp(camera: &Camera, u: f32, v: f32) -> Vec3 {
    let top = camera.r00.lerp(camera.r10, u);
    let bottom = camera.r01.lerp(camera.r11, u);
    top.lerp(bottom, v)
}

/// Generates the primary ray for pixel `(x, y)` of a `width × height` image, with
/// per-pixel jitter `(jx, jy) ∈ [-r_x, r_x] × [-r_y, r_y]` (§4.6). `Ray.o` is the
/// camera position; `Ray.maxRange` is `RT_MAX_TRACE_DISTANCE`.
#[must_use]
pub fn generate(camera: &Camera, x: u32, y: u32, width: u32, height: u32, jitter: (f32, f32)) -> RayDifferential {
    let u = (x as f32 + 0.5 + jitter.0) / width as f32;
    let v = (y as f32 + 0.5 + jitter.1) / height as f32;
    let direction = corner_lerp(camera, u, v).normalize();

    let du = 1.0 / width as f32;
    let dv = 1.0 / height as f32;
    let dir_dx = corner_lerp(camera, (u + du).min(1.0), v).normalize() - direction;
    let dir_dy = corner_lerp(camera, u, (v + dv).min(1.0)).normalize() - direction;

    RayDifferential {
        ray: Ray::new(camera.position, direction),
        d_origin_dx: Vec3::ZERO,
        d_origin_dy: Vec3::ZERO,
        d_direction_dx: dir_dx,
        d_direction_dy: dir_dy,
    }
}

/// Forward-sampling density of the camera vertex in area measure:
/// `1 / (A_image · cos⁴θ_ndc)` for the pinhole, where `θ_ndc` is measured between
/// the camera's forward axis and the generated ray direction (§4.8 MIS details).
#[must_use]
pub fn pdf_camera_area(camera: &Camera, ray_direction: Vec3) -> f32 {
    let cos_theta = camera.forward.dot(ray_direction).max(1e-8);
    let area = camera.image_plane_area().max(1e-8);
    1.0 / (area * cos_theta.powi(4))
}
