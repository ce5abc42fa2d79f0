//! Bilateral cross-denoise (C11, §4.10).
//!
//! Pure color cross-weighting — no normal/albedo guide buffers in this core.

use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BilateralParams {
    /// Filter radius in pixels, `[0, 10]`.
    pub radius: u32,
    pub sigma_spatial: f32,
    pub sigma_range: f32,
}

impl Default for BilateralParams {
    fn default() -> Self {
        Self {
            radius: 3,
            sigma_spatial: 2.0,
            sigma_range: 0.2,
        }
    }
}

impl BilateralParams {
    pub fn clamp(&mut self) {
        self.radius = self.radius.min(10);
        self.sigma_spatial = self.sigma_spatial.max(1e-3);
        self.sigma_range = self.sigma_range.max(1e-3);
    }
}

/// Applies bilateral cross-denoise to `pixels` (row-major, `width × height`),
/// writing the result into `out`. `pixels` and `out` must have equal length and
/// must not alias.
pub fn bilateral_denoise(pixels: &[Vec3], width: u32, height: u32, params: &BilateralParams, out: &mut [Vec3]) {
    debug_assert_eq!(pixels.len(), out.len());
    let r = params.radius as i64;
    let inv_2_sigma_s2 = 1.0 / (2.0 * params.sigma_spatial * params.sigma_spatial);
    let inv_2_sigma_r2 = 1.0 / (2.0 * params.sigma_range * params.sigma_range);

    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let center = pixels[(y * width as i64 + x) as usize];
            let mut sum = Vec3::ZERO;
            let mut weight_sum = 0.0f32;
            for dy in -r..=r {
                let ny = y + dy;
                if ny < 0 || ny >= height as i64 {
                    continue;
                }
                for dx in -r..=r {
                    let nx = x + dx;
                    if nx < 0 || nx >= width as i64 {
                        continue;
                    }
                    let neighbor = pixels[(ny * width as i64 + nx) as usize];
                    let spatial2 = (dx * dx + dy * dy) as f32;
                    let range2 = (neighbor - center).length_squared();
                    let w = (-spatial2 * inv_2_sigma_s2).exp() * (-range2 * inv_2_sigma_r2).exp();
                    sum += neighbor * w;
                    weight_sum += w;
                }
            }
            out[(y * width as i64 + x) as usize] = if weight_sum > 0.0 {
                sum / weight_sum
            } else {
                center
            };
        }
    }
}
