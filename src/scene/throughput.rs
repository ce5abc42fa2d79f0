//! Per-path state carried between bounces: the PT throughput cell and the BDPT
//! vertex record (§3).

use super::interaction::{Interaction, MAX_ALLOWED_RADIANCE};
use super::material::LobeMask;
use bitflags::bitflags;
use glam::Vec3;

/// Clamps every component of `radiance` to `[0, MAX_ALLOWED_RADIANCE]`, suppressing
/// fireflies (§4.7 "clamp per-bounce radiance contribution").
#[must_use]
pub fn clamp_radiance(radiance: Vec3) -> Vec3 {
    radiance.clamp(Vec3::ZERO, Vec3::splat(MAX_ALLOWED_RADIANCE))
}

/// Per-pixel path-tracer throughput state, carried from bounce to bounce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throughput {
    /// Path throughput `β ∈ ℝ³₊`, componentwise `<= MAX_ALLOWED_RADIANCE`.
    pub beta: Vec3,
    /// Lobe flags from the BSDF sample that produced the current ray, consulted by
    /// the shade kernel to decide whether a hit emitter's radiance was already
    /// accounted for by next-event estimation.
    pub prev_bsdf_flags: LobeMask,
    /// When set, the shadow ray's occlusion test is skipped — used for
    /// infinite/delta-direction lights where no scene geometry can plausibly
    /// intervene between hit point and light.
    pub ignore_occlusion: bool,
}

impl Throughput {
    #[must_use]
    pub fn initial() -> Self {
        Self {
            beta: Vec3::ONE,
            prev_bsdf_flags: LobeMask::empty(),
            ignore_occlusion: false,
        }
    }

    /// Multiplies `beta` by `factor` and clamps the result, matching the β update
    /// rule in §4.7 (`β ← β·f·|cosθ|/pdf`, then implicitly bounded).
    pub fn scale(&mut self, factor: Vec3) {
        self.beta = clamp_radiance(self.beta * factor);
    }

    /// Largest component of `beta`, the quantity Russian roulette survival
    /// probability is derived from.
    #[must_use]
    pub fn max_component(&self) -> f32 {
        self.beta.max_element()
    }
}

/// Which subpath root (if any) a [`BdptVertex`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BdptVertexType {
    Camera,
    Light,
    Surface,
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct BdptVertexFlags: u32 {
        /// Vertex may serve as a connection endpoint for some (s,t) strategy.
        const CONNECTIBLE = 1 << 0;
        /// Vertex is the root of a delta light (point/directional).
        const DELTA_LIGHT = 1 << 1;
        /// Vertex's incoming/outgoing distribution is itself a delta (specular
        /// surface bounce, or `DELTA_LIGHT`).
        const DELTA = 1 << 2;
        /// Vertex belongs to an infinite (directional) light subpath.
        const INFINITE_LIGHT = 1 << 3;
    }
}

/// One vertex of a BDPT camera or light subpath.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BdptVertex {
    pub beta: Vec3,
    pub interaction: Interaction,
    pub vertex_type: BdptVertexType,
    pub flags: BdptVertexFlags,
    /// Index into the light table; meaningful only for `Light` vertices.
    pub light_idx: Option<u32>,
    /// Index into the material table; meaningful only for `Surface` vertices.
    pub material_idx: Option<u32>,
    /// Forward-sampling density in area measure.
    pub pdf_fwd: f32,
    /// Reverse-sampling density in area measure, recomputed from the current BSDF
    /// whenever the subpath is extended past this vertex (§4.8 MIS details).
    pub pdf_rev: f32,
    /// Positional sampling density (area lights / camera lens), used by
    /// `pdfLe`/`pdfPos` conversions.
    pub pdf_pos: f32,
    /// Index into the per-pixel radiance accumulator this vertex's contribution
    /// (when generated as a `t=1` light-image splat) targets.
    pub radiance_buffer_idx: Option<u32>,
}

impl BdptVertex {
    /// A surface vertex with a delta BSDF lobe cannot serve as a connection
    /// endpoint except via the closed-form strategy matching that delta (§4.11
    /// BDPT-vertex state machine).
    #[must_use]
    pub fn is_connectible(&self) -> bool {
        self.flags.contains(BdptVertexFlags::CONNECTIBLE)
            && !self.flags.contains(BdptVertexFlags::DELTA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_radiance_suppresses_fireflies() {
        let hot = Vec3::splat(1.0e6);
        assert_eq!(clamp_radiance(hot), Vec3::splat(MAX_ALLOWED_RADIANCE));
    }

    #[test]
    fn throughput_scale_clamps_result() {
        let mut t = Throughput::initial();
        t.scale(Vec3::splat(1.0e9));
        assert!(t.max_component() <= MAX_ALLOWED_RADIANCE);
    }
}
