//! Frame image output (§6 "Frame image output"): the final RGBA32F texture
//! handed to presentation, row-major with origin at the lower-left, alpha
//! always 1.

use crate::reconstruction::accumulate::Accumulator;
use glam::Vec3;

/// A row-major RGBA32F image, origin lower-left, `A = 1` for every texel.
#[derive(Debug, Clone)]
pub struct FrameImage {
    pub width: u32,
    pub height: u32,
    /// `width * height` texels, row 0 is the bottom row.
    texels: Vec<[f32; 4]>,
}

impl FrameImage {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            texels: vec![[0.0, 0.0, 0.0, 1.0]; (width * height) as usize],
        }
    }

    #[must_use]
    pub fn texel(&self, x: u32, y: u32) -> [f32; 4] {
        self.texels[(y * self.width + x) as usize]
    }

    pub fn set_texel(&mut self, x: u32, y: u32, rgb: Vec3) {
        self.texels[(y * self.width + x) as usize] = [rgb.x, rgb.y, rgb.z, 1.0];
    }

    #[must_use]
    pub fn as_slice(&self) -> &[[f32; 4]] {
        &self.texels
    }

    /// Packs an accumulator's running means into this frame image. The
    /// accumulator's pixel (0, 0) is conventionally top-left (matching screen
    /// raster order); this flips it so row 0 of the output is the bottom row.
    pub fn pack_from_accumulator(&mut self, acc: &Accumulator) {
        debug_assert_eq!(self.width, acc.width);
        debug_assert_eq!(self.height, acc.height);
        for y in 0..self.height {
            let src_y = self.height - 1 - y;
            for x in 0..self.width {
                let mean = acc.cell(x, src_y).mean();
                self.set_texel(x, y, mean);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_frame_image_has_alpha_one_everywhere() {
        let img = FrameImage::new(4, 4);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(img.texel(x, y)[3], 1.0);
            }
        }
    }

    #[test]
    fn pack_from_accumulator_flips_rows_to_lower_left_origin() {
        let mut acc = Accumulator::new(2, 2);
        let filter = crate::reconstruction::filter::FilterProperties {
            filter_type: crate::reconstruction::filter::FilterType::Box,
            radius: (0.5, 0.5),
            ..Default::default()
        };
        // Top row (accumulator row 0) gets red, bottom row (row 1) gets green.
        acc.splat(0, 0, (0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), &filter);
        acc.splat(1, 0, (0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), &filter);
        acc.splat(0, 1, (0.0, 0.0), Vec3::new(0.0, 1.0, 0.0), &filter);
        acc.splat(1, 1, (0.0, 0.0), Vec3::new(0.0, 1.0, 0.0), &filter);

        let mut img = FrameImage::new(2, 2);
        img.pack_from_accumulator(&acc);
        // Output row 0 (bottom) should now hold the green samples from accumulator row 1.
        assert!(img.texel(0, 0)[1] > 0.9);
        assert!(img.texel(0, 1)[0] > 0.9);
    }
}
