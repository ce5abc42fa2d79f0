//! Surface interaction record (§3 "Interaction").

use glam::{Vec2, Vec3};

/// A single ray-surface hit, populated by the intersection oracle's barycentric
/// output and the shading kernel's frame construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interaction {
    /// Direction back toward the ray origin (`-ray.direction`).
    pub wo: Vec3,
    pub p: Vec3,
    pub uv: Vec2,
    /// Ray-offset epsilon derived from the hit's barycentric error, applied along
    /// the signed geometric normal when spawning new rays (§4.4 ray-offset policy).
    pub trace_error_offset: f32,
    pub shape_index: usize,
    /// Geometric triangle normal — never perturbed by normal mapping.
    pub gn: Vec3,
    /// Shading normal — may be perturbed by a tangent-space normal map.
    pub sn: Vec3,
    pub tangent: Vec3,
    pub binormal: Vec3,
}

/// Minimum ray-offset epsilon, matching `original_source`'s `RT_TRACE_OFFSET`.
pub const TRACE_OFFSET: f32 = 0.00001;

/// Maximum ray length, matching `original_source`'s `RT_MAX_TRACE_DISTANCE`.
pub const MAX_TRACE_DISTANCE: f32 = 1000.0;

/// Per-pixel/per-path radiance clamp suppressing fireflies, matching
/// `original_source`'s `RT_MAX_ALLOWED_RADIANCE`.
pub const MAX_ALLOWED_RADIANCE: f32 = 1000.0;

impl Interaction {
    /// Offset to apply along `side` (the signed geometric normal of the outgoing
    /// side) before spawning a new ray from this interaction, per §4.4's ray-offset
    /// policy: `max(TRACE_OFFSET, trace_error_offset)`.
    #[must_use]
    pub fn ray_offset(&self) -> f32 {
        TRACE_OFFSET.max(self.trace_error_offset)
    }

    /// Spawn point for a ray leaving along `direction`, offset along the geometric
    /// normal on whichever side `direction` points toward.
    #[must_use]
    pub fn spawn_point(&self, direction: Vec3) -> Vec3 {
        let side = if self.gn.dot(direction) >= 0.0 {
            self.gn
        } else {
            -self.gn
        };
        self.p + side * self.ray_offset()
    }
}
