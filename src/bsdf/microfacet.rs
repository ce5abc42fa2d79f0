//! Anisotropic GGX (Trowbridge-Reitz) microfacet distribution with Smith
//! masking-shadowing, evaluated in a local shading frame where `z` is the normal.
//!
//! Sampling follows the non-visible-normal-distribution GGX construction (Walter et
//! al. 2007): simpler than VNDF sampling and sufficient for this core's testable
//! properties, at some cost to sampling efficiency at grazing angles.

use glam::Vec2;
use glam::Vec3;

#[inline]
fn cos_theta(w: Vec3) -> f32 {
    w.z
}

#[inline]
fn cos2_theta(w: Vec3) -> f32 {
    w.z * w.z
}

#[inline]
fn tan2_theta(w: Vec3) -> f32 {
    let c2 = cos2_theta(w);
    (1.0 - c2).max(0.0) / c2.max(1e-12)
}

#[inline]
fn cos_phi_sin_phi(w: Vec3) -> (f32, f32) {
    let sin_theta = (1.0 - cos2_theta(w)).max(0.0).sqrt();
    if sin_theta < 1e-8 {
        (1.0, 0.0)
    } else {
        (w.x / sin_theta, w.y / sin_theta)
    }
}

/// GGX normal-distribution function `D(wh)`.
#[must_use]
pub fn ggx_d(wh: Vec3, ax: f32, ay: f32) -> f32 {
    let tan2 = tan2_theta(wh);
    if !tan2.is_finite() {
        return 0.0;
    }
    let (cos_phi, sin_phi) = cos_phi_sin_phi(wh);
    let e = (cos_phi * cos_phi) / (ax * ax) + (sin_phi * sin_phi) / (ay * ay);
    let cos4 = cos2_theta(wh) * cos2_theta(wh);
    if cos4 < 1e-16 {
        return 0.0;
    }
    1.0 / (std::f32::consts::PI * ax * ay * cos4 * (1.0 + e * tan2).powi(2))
}

fn lambda(w: Vec3, ax: f32, ay: f32) -> f32 {
    let tan2 = tan2_theta(w);
    if !tan2.is_finite() {
        return 0.0;
    }
    let (cos_phi, sin_phi) = cos_phi_sin_phi(w);
    let alpha2 = cos_phi * cos_phi * ax * ax + sin_phi * sin_phi * ay * ay;
    ((1.0 + alpha2 * tan2).sqrt() - 1.0) * 0.5
}

/// Smith masking term for a single direction.
#[must_use]
pub fn smith_g1(w: Vec3, ax: f32, ay: f32) -> f32 {
    1.0 / (1.0 + lambda(w, ax, ay))
}

/// Separable Smith masking-shadowing term for the full reflection/transmission
/// pair.
#[must_use]
pub fn smith_g(wo: Vec3, wi: Vec3, ax: f32, ay: f32) -> f32 {
    smith_g1(wo, ax, ay) * smith_g1(wi, ax, ay)
}

/// Draws a half-vector from the (non-visible-normal) GGX distribution.
#[must_use]
pub fn sample_wh(wo: Vec3, ax: f32, ay: f32, u: Vec2) -> Vec3 {
    let phi = if (ax - ay).abs() < 1e-7 {
        2.0 * std::f32::consts::PI * u.x
    } else {
        let mut phi = (ay / ax * (2.0 * std::f32::consts::PI * u.x + 0.5 * std::f32::consts::PI).tan())
            .atan();
        if u.x > 0.5 {
            phi += std::f32::consts::PI;
        }
        phi
    };
    let (sin_phi, cos_phi) = phi.sin_cos();
    let alpha2 = 1.0 / (cos_phi * cos_phi / (ax * ax) + sin_phi * sin_phi / (ay * ay));
    let tan_theta2 = alpha2 * u.y / (1.0 - u.y).max(1e-7);
    let cos_theta = 1.0 / (1.0 + tan_theta2).sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();

    let mut wh = Vec3::new(sin_theta * cos_phi, sin_theta * sin_phi, cos_theta);
    if wo.z < 0.0 {
        wh = -wh;
    }
    wh
}

/// PDF (solid angle measure, with respect to `wh`) of the half-vector drawn by
/// [`sample_wh`].
#[must_use]
pub fn pdf_wh(wh: Vec3, ax: f32, ay: f32) -> f32 {
    ggx_d(wh, ax, ay) * cos_theta(wh).abs()
}
