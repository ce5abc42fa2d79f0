//! Scrambled Sobol quasi-Monte-Carlo sampler (C1).
//!
//! Every random number consumed by the integrators comes from this module: there is
//! no PRNG anywhere else in the crate. A sample is addressed by `(pixel, sample
//! index, dimension)`; the per-pixel `scramble` is a deterministic hash of pixel
//! coordinates (see [`crate::util::hash::pixel_scramble`]), stable across every
//! bounce drawn within one frame for that pixel.

mod matrices;

use crate::util::hash::splitmix64;
use glam::Vec2;

/// Sobol dimensions consumed by the per-pixel TAA jitter, drawn once per frame
/// before any bounce dimensions.
pub const JITTER_DIMS: u32 = 2;

/// Nominal Sobol dimensions consumed per bounce: 1 for the NEE light choice, up to 3
/// for the NEE light-position sample (varies by light variant), 3 for the BSDF lobe
/// choice plus sampling direction, and 1 for the Russian-roulette decision. Used
/// only to keep a BDPT light subpath's dimension range disjoint from the camera
/// subpath's — actual per-bounce consumption can be smaller.
pub const DIMS_PER_BOUNCE: u32 = 8;

/// Draws one scrambled Sobol sample.
///
/// `v` starts from `scramble` — folded with a replica salt first, if `dimension`
/// falls beyond [`matrices::NUM_REAL_DIMENSIONS`]'s genuinely transcribed columns, so
/// that each replica of a reused real dimension is decorrelated from its others — and
/// XORs in the generator-matrix column for each set bit of `sample_idx`. The top 24
/// bits of the result become the returned value, keeping it in the half-open `[0,1)`
/// (using all 32 bits would round `0xFFFF_FFFF` up to exactly `1.0` in `f32`).
#[inline]
#[must_use]
pub fn sobol_sample(sample_idx: u32, dimension: u32, scramble: u32) -> f32 {
    let cols = matrices::columns(dimension);
    let real_dims = matrices::NUM_REAL_DIMENSIONS as u32;
    let replica = dimension / real_dims;
    let mut v = if replica == 0 {
        scramble
    } else {
        scramble ^ (splitmix64(0x9E37_79B9_7F4A_7C15 ^ u64::from(replica)) >> 32) as u32
    };
    let mut idx = sample_idx;
    let mut i = 0usize;
    while idx != 0 {
        if idx & 1 != 0 {
            v ^= cols[i];
        }
        idx >>= 1;
        i += 1;
    }
    (v >> 8) as f32 / (1u32 << 24) as f32
}

/// Shirley-Chiu concentric mapping from `[0,1)²` onto the unit disc. Used for lens
/// sampling and `DiskArea` light sampling, since it preserves area ratios better
/// than [`uniform_sample_disc`] for stratified inputs.
#[must_use]
pub fn concentric_sample_disc(u: Vec2) -> Vec2 {
    let offset = 2.0 * u - Vec2::ONE;
    if offset.x.abs() < 1e-8 && offset.y.abs() < 1e-8 {
        return Vec2::ZERO;
    }

    let (r, theta) = if offset.x.abs() > offset.y.abs() {
        (offset.x, std::f32::consts::FRAC_PI_4 * (offset.y / offset.x))
    } else {
        (
            offset.y,
            std::f32::consts::FRAC_PI_2
                - std::f32::consts::FRAC_PI_4 * (offset.x / offset.y),
        )
    };

    r * Vec2::new(theta.cos(), theta.sin())
}

/// Uniform (non-concentric) disc sampling via sqrt-radius mapping.
#[must_use]
pub fn uniform_sample_disc(u: Vec2) -> Vec2 {
    let r = u.x.sqrt();
    let theta = 2.0 * std::f32::consts::PI * u.y;
    r * Vec2::new(theta.cos(), theta.sin())
}

/// A per-path cursor over the Sobol sequence.
///
/// Holds the fixed `(sample_idx, scramble)` pair for one pixel sample and a
/// monotonically advancing dimension counter, so callers never have to track
/// dimension bookkeeping themselves. Cheap to construct; intended to be recreated
/// per path rather than reused.
#[derive(Debug, Clone, Copy)]
pub struct PathSampler {
    sample_idx: u32,
    scramble: u32,
    dim: u32,
}

impl PathSampler {
    #[must_use]
    pub fn new(sample_idx: u32, scramble: u32) -> Self {
        Self {
            sample_idx,
            scramble,
            dim: 0,
        }
    }

    /// Starts the cursor at an explicit dimension, used to give a BDPT light subpath
    /// a disjoint dimension range from its camera subpath counterpart.
    #[must_use]
    pub fn starting_at(sample_idx: u32, scramble: u32, dim: u32) -> Self {
        Self {
            sample_idx,
            scramble,
            dim,
        }
    }

    #[must_use]
    pub fn dimension(&self) -> u32 {
        self.dim
    }

    pub fn next_1d(&mut self) -> f32 {
        let s = sobol_sample(self.sample_idx, self.dim, self.scramble);
        self.dim += 1;
        s
    }

    pub fn next_2d(&mut self) -> Vec2 {
        let x = self.next_1d();
        let y = self.next_1d();
        Vec2::new(x, y)
    }
}

/// First dimension available to bounce sampling after the per-frame jitter.
#[must_use]
pub fn camera_subpath_base_dim() -> u32 {
    JITTER_DIMS
}

/// First dimension available to a BDPT light subpath: disjoint from the camera
/// subpath's `[JITTER_DIMS, JITTER_DIMS + max_depth * DIMS_PER_BOUNCE)` range.
#[must_use]
pub fn light_subpath_base_dim(max_depth: u32) -> u32 {
    JITTER_DIMS + max_depth * DIMS_PER_BOUNCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sobol_range_holds_for_many_indices() {
        for idx in 0..(1u32 << 16) {
            let s = sobol_sample(idx, 3, 0xABCD_1234);
            assert!((0.0..1.0).contains(&s), "sample {s} out of range at idx {idx}");
        }
    }

    #[test]
    fn sobol_sample_is_deterministic() {
        assert_eq!(
            sobol_sample(12345, 2, 42),
            sobol_sample(12345, 2, 42)
        );
    }

    #[test]
    fn path_sampler_advances_dimension_monotonically() {
        let mut s = PathSampler::new(7, 99);
        assert_eq!(s.dimension(), 0);
        s.next_1d();
        assert_eq!(s.dimension(), 1);
        s.next_2d();
        assert_eq!(s.dimension(), 3);
    }

    #[test]
    fn light_subpath_base_dim_is_disjoint_from_camera_range() {
        let max_depth = 5;
        let camera_end = camera_subpath_base_dim() + max_depth * DIMS_PER_BOUNCE;
        assert_eq!(light_subpath_base_dim(max_depth), camera_end);
    }

    #[test]
    fn concentric_disc_sample_stays_within_unit_disc() {
        for i in 0..100u32 {
            let u = Vec2::new(
                sobol_sample(i, 0, 1),
                sobol_sample(i, 1, 1),
            );
            let p = concentric_sample_disc(u);
            assert!(p.length() <= 1.0 + 1e-4);
        }
    }
}
