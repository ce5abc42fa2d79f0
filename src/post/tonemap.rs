//! Reinhard tone-mapping (C11, §4.10).

use glam::Vec3;

/// Relative luminance weights (Rec. 709).
const LUMA_R: f32 = 0.2126;
const LUMA_G: f32 = 0.7152;
const LUMA_B: f32 = 0.0722;

#[must_use]
pub fn luminance(c: Vec3) -> f32 {
    LUMA_R * c.x + LUMA_G * c.y + LUMA_B * c.z
}

/// Applies the Reinhard operator with white point `l_white` to one color's
/// luminance, scaling chrominance uniformly: `L' = L·(1+L/L_white²)/(1+L)`.
#[must_use]
pub fn reinhard(c: Vec3, l_white: f32) -> Vec3 {
    let l = luminance(c).max(0.0);
    if l <= 0.0 {
        return Vec3::ZERO;
    }
    let l_white2 = (l_white * l_white).max(1e-8);
    let l_mapped = l * (1.0 + l / l_white2) / (1.0 + l);
    c * (l_mapped / l)
}

/// Tone-maps an entire frame, using `L_white = max(min_luminance, observed max)`
/// over the frame — only an in-frame maximum is used, no temporal adaptation
/// (§4.10).
pub fn tonemap_frame(pixels: &mut [Vec3], min_luminance: f32) {
    let observed_max = pixels
        .iter()
        .map(|&c| luminance(c))
        .fold(0.0f32, f32::max);
    let l_white = min_luminance.max(observed_max);
    for p in pixels.iter_mut() {
        *p = reinhard(*p, l_white);
    }
}
