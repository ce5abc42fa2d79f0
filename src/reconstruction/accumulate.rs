//! Per-sample filtered splat into the frame accumulator (C10, §4.9).

use super::filter::FilterProperties;
use glam::Vec3;

/// Running weighted-mean accumulator for one pixel, reused across frames until
/// invalidated (§4.9 "reused across frames until invalidated").
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccumulatorCell {
    pub weighted_sum: Vec3,
    pub weight_accum: f32,
}

impl AccumulatorCell {
    #[must_use]
    pub fn mean(&self) -> Vec3 {
        if self.weight_accum > 0.0 {
            self.weighted_sum / self.weight_accum
        } else {
            Vec3::ZERO
        }
    }
}

/// The full-frame reconstruction buffer, one [`AccumulatorCell`] per pixel.
#[derive(Debug, Clone)]
pub struct Accumulator {
    pub width: u32,
    pub height: u32,
    cells: Vec<AccumulatorCell>,
}

impl Accumulator {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![AccumulatorCell::default(); (width * height) as usize],
        }
    }

    /// Clears every cell — called whenever the camera moves, resolution changes, or
    /// the scene rebuilds (§3 lifecycle).
    pub fn clear(&mut self) {
        self.cells.fill(AccumulatorCell::default());
    }

    #[must_use]
    pub fn cell(&self, x: u32, y: u32) -> AccumulatorCell {
        self.cells[(y * self.width + x) as usize]
    }

    /// Splats a filtered sample of radiance `l` generated at pixel `(px, py)` with
    /// sub-pixel jitter `(jx, jy)` into every pixel within the filter radius.
    pub fn splat(&mut self, px: i64, py: i64, jitter: (f32, f32), l: Vec3, filter: &FilterProperties) {
        let rx = filter.radius.0.ceil() as i64;
        let ry = filter.radius.1.ceil() as i64;
        for dy in -ry..=ry {
            let ny = py + dy;
            if ny < 0 || ny >= i64::from(self.height) {
                continue;
            }
            for dx in -rx..=rx {
                let nx = px + dx;
                if nx < 0 || nx >= i64::from(self.width) {
                    continue;
                }
                let u = (dx as f32) - jitter.0;
                let v = (dy as f32) - jitter.1;
                let h = filter.eval(u, v);
                if h <= 0.0 {
                    continue;
                }
                let idx = (ny as u32 * self.width + nx as u32) as usize;
                let cell = &mut self.cells[idx];
                cell.weighted_sum += l * h;
                cell.weight_accum += h;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruction::filter::FilterType;

    #[test]
    fn box_filter_single_sample_reproduces_constant_scene_mean() {
        let filter = FilterProperties {
            filter_type: FilterType::Box,
            radius: (0.5, 0.5),
            ..FilterProperties::default()
        };
        let mut acc = Accumulator::new(4, 4);
        for y in 0..4 {
            for x in 0..4 {
                acc.splat(x, y, (0.0, 0.0), Vec3::splat(1.0), &filter);
            }
        }
        for y in 0..4 {
            for x in 0..4 {
                let mean = acc.cell(x, y).mean();
                assert!((mean - Vec3::splat(1.0)).length() < 1e-5);
            }
        }
    }

    #[test]
    fn box_filter_running_mean_converges_across_many_frames() {
        let filter = FilterProperties {
            filter_type: FilterType::Box,
            radius: (0.5, 0.5),
            ..FilterProperties::default()
        };
        let mut acc = Accumulator::new(1, 1);
        for _ in 0..128 {
            acc.splat(0, 0, (0.0, 0.0), Vec3::splat(2.0), &filter);
        }
        assert!((acc.cell(0, 0).mean() - Vec3::splat(2.0)).length() < 1e-5);
        assert_eq!(acc.cell(0, 0).weight_accum, 128.0);
    }

    #[test]
    fn clear_resets_every_cell() {
        let filter = FilterProperties::default();
        let mut acc = Accumulator::new(2, 2);
        acc.splat(0, 0, (0.0, 0.0), Vec3::ONE, &filter);
        acc.clear();
        assert_eq!(acc.cell(0, 0).weight_accum, 0.0);
    }
}
