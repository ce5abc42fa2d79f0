//! Tracer and acceleration-structure configuration.
//!
//! These are the values consumed by the external intersection oracle (§6 of the
//! design): the core does not build acceleration structures itself, but it clamps
//! and forwards this configuration verbatim. Out-of-range values are clamped to the
//! documented bounds here rather than rejected — configuration problems are never
//! fatal.

/// Acceleration-structure variant requested from the external intersection oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccelType {
    /// Single flat BVH.
    #[default]
    Bvh,
    /// "Fat" BVH with wider nodes (SIMD-friendly traversal).
    FatBvh,
    /// Linear BVH built via Morton-code bucketing.
    HlBvh,
}

/// BVH construction heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BvhBuilder {
    /// Surface Area Heuristic.
    #[default]
    Sah,
    /// Median split.
    Median,
}

/// SAH-specific construction parameters.
///
/// | Field | Range | Default |
/// |---|---|---|
/// | `traversal_cost` | `[1, 100]` | `1.0` |
/// | `num_bins` | `[1, 256]` | `32` |
/// | `use_splits` | bool | `false` |
/// | `max_split_depth` | `[6, 18]` | `12` |
/// | `min_overlap` | `[0, 0.2]` | `0.0001` |
/// | `extra_node_budget` | `[0, 1]` | `0.25` |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SahConfig {
    pub traversal_cost: f32,
    pub num_bins: u32,
    pub use_splits: bool,
    pub max_split_depth: u32,
    pub min_overlap: f32,
    pub extra_node_budget: f32,
}

impl Default for SahConfig {
    fn default() -> Self {
        Self {
            traversal_cost: 1.0,
            num_bins: 32,
            use_splits: false,
            max_split_depth: 12,
            min_overlap: 0.0001,
            extra_node_budget: 0.25,
        }
    }
}

impl SahConfig {
    /// Clamps every field to its documented range. Never fails.
    pub fn clamp(&mut self) {
        self.traversal_cost = self.traversal_cost.clamp(1.0, 100.0);
        self.num_bins = self.num_bins.clamp(1, 256);
        self.max_split_depth = self.max_split_depth.clamp(6, 18);
        self.min_overlap = self.min_overlap.clamp(0.0, 0.2);
        self.extra_node_budget = self.extra_node_budget.clamp(0.0, 1.0);
    }
}

/// Acceleration-structure configuration forwarded to the external intersection
/// oracle. Field names mirror the `acc.*`/`bvh.*` configuration keys in the design.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelConfig {
    pub acc_type: AccelType,
    pub builder: BvhBuilder,
    pub force_two_level: bool,
    pub force_flat: bool,
    pub sah: SahConfig,
}

impl Default for AccelConfig {
    fn default() -> Self {
        Self {
            acc_type: AccelType::default(),
            builder: BvhBuilder::default(),
            force_two_level: false,
            force_flat: false,
            sah: SahConfig::default(),
        }
    }
}

impl AccelConfig {
    /// The simplest, most robust variant — the fallback used when a preferred build
    /// fails (see [`crate::errors::LumenError::OracleBuildFailed`] recovery policy).
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            acc_type: AccelType::Bvh,
            builder: BvhBuilder::Sah,
            force_two_level: false,
            force_flat: false,
            sah: SahConfig {
                use_splits: false,
                ..SahConfig::default()
            },
        }
    }

    pub fn clamp(&mut self) {
        self.sah.clamp();
    }
}

/// Top-level tracer configuration: integrator choice, bounce depth, TAA/denoise
/// toggles, and frame/time stop conditions (§4.11).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TracerConfig {
    pub integrator: IntegratorKind,
    /// Maximum bounce count (`maxDepth` throughout the design).
    pub max_depth: u32,
    pub taa_enabled: bool,
    pub denoise_enabled: bool,
    /// Stop issuing work once `frame_index == stop_at_frame`. `0` means unbounded.
    pub stop_at_frame: u64,
    /// Stop issuing work once accumulated render time reaches this many seconds.
    /// `0.0` means unbounded.
    pub stop_at_time: f32,
    pub accel: AccelConfig,
}

/// Which rendering strategy consumes the shared scene representation this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegratorKind {
    #[default]
    PathTracer,
    Bdpt,
    /// Rasterization preview — out of scope for this core; kept only so the frame
    /// loop's integrator-selection state machine has all three states from §4.11.
    Raster,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            integrator: IntegratorKind::default(),
            max_depth: 5,
            taa_enabled: true,
            denoise_enabled: false,
            stop_at_frame: 0,
            stop_at_time: 0.0,
            accel: AccelConfig::default(),
        }
    }
}

impl TracerConfig {
    pub fn clamp(&mut self) {
        self.max_depth = self.max_depth.clamp(1, 32);
        self.accel.clamp();
    }
}
