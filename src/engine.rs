//! Frame Loop (C12, §4.11)
//!
//! [`Engine`] is the single per-frame orchestrator: idempotent integrator
//! (re)instantiation, scene-dirty propagation into the [`SceneBuilder`], camera-move
//! invalidation, stop-condition pausing, integrator dispatch, and post-processing.
//! It owns `frame_index`, the scene, and the latched error bit — nothing here is a
//! global singleton (§9 "fold into an explicit `Engine` value threaded through the
//! frame loop; the frame index is owned by the loop").
//!
//! The intersection oracle itself (construction, commit, refit/rebuild) is an
//! external collaborator per §1/§6; `Engine::tick` only computes and returns the
//! [`AccelRequest`] the caller's oracle must service, and takes a `&dyn
//! IntersectionOracle` to query against for this frame's integration pass.

use crate::config::{IntegratorKind, TracerConfig};
use crate::errors::LumenError;
use crate::frame_image::FrameImage;
use crate::integrators::{bdpt, pt, SceneView};
use crate::oracle::IntersectionOracle;
use crate::post::denoise::{self, BilateralParams};
use crate::post::tonemap;
use crate::reconstruction::accumulate::Accumulator;
use crate::reconstruction::filter::FilterProperties;
use crate::scene::builder::{AccelRequest, DirtyFlags, SceneBuilder};
use crate::scene::camera::Camera;
use crate::scene::ids::{LightId, ShapeId};
use glam::Vec3;
use rustc_hash::FxHashMap;

/// The core engine instance orchestrating the light-transport frame loop.
///
/// `Engine` is a pure, window-agnostic core: it has no GPU device or surface
/// handle of its own (§1 "the core does not own device/window setup"). An outer
/// frontend owns the window, the real intersection-oracle instance, and presents
/// [`Engine::frame_image`] each frame.
pub struct Engine {
    pub builder: SceneBuilder,
    pub config: TracerConfig,
    pub filter: FilterProperties,
    pub denoise: BilateralParams,
    /// Tone-mapping white-point floor passed to [`tonemap::tonemap_frame`].
    pub tonemap_min_luminance: f32,

    /// Dense oracle shape-id assignment: `shape_order[i]` is the [`ShapeId`] the
    /// external oracle reports hits against as shape `i`. Refreshed whenever
    /// geometry is dirty or a rebuild is requested.
    shape_order: Vec<ShapeId>,
    light_order: Vec<LightId>,
    camera: Option<Camera>,
    accumulator: Accumulator,
    frame_image: FrameImage,
    width: u32,
    height: u32,

    frame_index: u64,
    total_render_time: f32,
    paused: bool,
    has_errors: bool,
    force_rebuild: bool,
    active_integrator: Option<IntegratorKind>,
}

impl Engine {
    #[must_use]
    pub fn new(width: u32, height: u32, config: TracerConfig) -> Self {
        Self {
            builder: SceneBuilder::new(),
            config,
            filter: FilterProperties::default(),
            denoise: BilateralParams::default(),
            tonemap_min_luminance: 1.0,
            shape_order: Vec::new(),
            light_order: Vec::new(),
            camera: None,
            accumulator: Accumulator::new(width, height),
            frame_image: FrameImage::new(width, height),
            width,
            height,
            frame_index: 0,
            total_render_time: 0.0,
            paused: false,
            has_errors: false,
            force_rebuild: true,
            active_integrator: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    #[inline]
    #[must_use]
    pub fn total_render_time(&self) -> f32 {
        self.total_render_time
    }

    #[inline]
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether a fatal/latched error (§7) is blocking frame production. Cleared
    /// only by [`Self::request_rebuild`].
    #[inline]
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    #[inline]
    #[must_use]
    pub fn frame_image(&self) -> &FrameImage {
        &self.frame_image
    }

    #[inline]
    #[must_use]
    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Which integrator pipeline is currently instantiated, or `None` before the
    /// first [`Self::tick`] (§4.11 "Integrator selection" state machine).
    #[inline]
    #[must_use]
    pub fn active_integrator(&self) -> Option<IntegratorKind> {
        self.active_integrator
    }

    /// Resizes the output. Always invalidates accumulation (§3 lifecycle:
    /// resolution change clears reconstruction accumulators).
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        self.accumulator = Accumulator::new(width, height);
        self.frame_image = FrameImage::new(width, height);
        self.frame_index = 0;
        self.total_render_time = 0.0;
    }

    /// Sets the active camera. A change in position/orientation resets
    /// `frame_index` and clears the reconstruction accumulator within the same
    /// call, satisfying §8 invariant 9 ("in ≤1 frame") trivially.
    pub fn set_camera(&mut self, camera: Camera) {
        let moved = self.camera != Some(camera);
        self.camera = Some(camera);
        self.builder.mark_camera_dirty();
        if moved {
            self.frame_index = 0;
            self.total_render_time = 0.0;
            self.accumulator.clear();
        }
    }

    /// Hotkey surface an outer frontend wires directly (§6 "CLI / hotkeys");
    /// mirrors the teacher's `Engine::resize`/`Engine::update` as the thin,
    /// window-agnostic API a frontend drives.
    pub fn set_integrator(&mut self, kind: IntegratorKind) {
        if self.config.integrator != kind {
            self.config.integrator = kind;
            self.frame_index = 0;
            self.total_render_time = 0.0;
            self.accumulator.clear();
        }
    }

    pub fn set_taa_enabled(&mut self, enabled: bool) {
        self.config.taa_enabled = enabled;
    }

    pub fn set_denoise_enabled(&mut self, enabled: bool) {
        self.config.denoise_enabled = enabled;
    }

    /// Hotkey "refresh scene": forces a full rebuild on the next [`Self::tick`] and
    /// clears any latched fatal error, matching §7's "recovery requires user
    /// action (recompile, reduce resolution)".
    pub fn request_rebuild(&mut self) {
        self.force_rebuild = true;
        self.has_errors = false;
    }

    /// Latches a fatal/latched error (§7): the frame loop stops producing frames
    /// until [`Self::request_rebuild`] is called. The caller's outer oracle
    /// collaborator is expected to call this when its own build/commit fails.
    pub fn report_fatal_error(&mut self, err: LumenError) {
        log::error!("{err}");
        self.has_errors = true;
    }

    /// Runs one frame of the pipeline described in §4.11. `oracle` is queried for
    /// this frame's integration pass (if any runs); `dt` is the wall-clock seconds
    /// elapsed since the previous call. Returns the acceleration-structure update
    /// the caller's oracle must service before the *next* tick — oracle
    /// construction/commit itself is outside this crate (§1).
    pub fn tick(&mut self, oracle: &dyn IntersectionOracle, dt: f32) -> AccelRequest {
        if self.has_errors {
            return AccelRequest::None;
        }

        // 1. Integrator (re)instantiation is idempotent here: switching kinds only
        // needs the accumulator invalidated, already handled by `set_integrator`.
        self.active_integrator = Some(self.config.integrator);

        // 2. Scene-dirty handling (C3).
        let accel_request = self.sync_scene();

        // 4. Stop conditions raise `pause` and skip integration.
        let stop_by_frame =
            self.config.stop_at_frame != 0 && self.frame_index >= self.config.stop_at_frame;
        let stop_by_time =
            self.config.stop_at_time > 0.0 && self.total_render_time >= self.config.stop_at_time;
        if stop_by_frame || stop_by_time {
            self.paused = true;
            return accel_request;
        }
        self.paused = false;

        let Some(camera) = self.camera else {
            return accel_request;
        };

        // 5. Integrator, then reconstruction (folded into the integrator's own
        // per-pixel splat), then optional denoise/tonemap.
        let view = SceneView::new(
            &self.shape_order,
            &self.builder.shapes,
            &self.builder.materials,
            &self.builder.lights,
            &self.light_order,
            &self.builder.streams,
            self.builder.scene_bbox(),
        );

        match self.config.integrator {
            IntegratorKind::PathTracer => {
                pt::render_frame(
                    &view,
                    oracle,
                    &camera,
                    &self.config,
                    &mut self.accumulator,
                    &self.filter,
                    self.frame_index,
                );
            }
            IntegratorKind::Bdpt => {
                bdpt::render_frame(
                    &view,
                    oracle,
                    &camera,
                    &self.config,
                    &mut self.accumulator,
                    &self.filter,
                    self.frame_index,
                );
            }
            IntegratorKind::Raster => {
                // Out of scope (§4.11 keeps this as a selectable state only).
            }
        }

        self.pack_post_process();

        // 6. Advance frame_index and accumulate elapsed time only while not paused.
        self.frame_index += 1;
        self.total_render_time += dt;

        accel_request
    }

    /// Step 2 of §4.11: applies dirty transforms, rebuilds the light table,
    /// refreshes the oracle-facing shape/light ordering, and returns what the
    /// caller's oracle needs to do this frame.
    fn sync_scene(&mut self) -> AccelRequest {
        let dirty = self.builder.dirty();
        if !self.force_rebuild && dirty == DirtyFlags::empty() {
            return AccelRequest::None;
        }

        let mut accel_request = AccelRequest::None;

        if self.force_rebuild || dirty.contains(DirtyFlags::GEOMETRY) {
            let stream_index_of: FxHashMap<ShapeId, u32> = self
                .builder
                .shapes
                .iter()
                .map(|(id, shape)| (id, shape.stream_index))
                .collect();
            let refit = self
                .builder
                .update_dirty_transforms(|id| stream_index_of.get(&id).copied().unwrap_or(0) as usize);
            accel_request = worse_request(accel_request, refit);
        }

        if self.force_rebuild || dirty.contains(DirtyFlags::LIGHT) {
            self.builder.rebuild_light_table();
        }

        self.builder.clear_dirty(DirtyFlags::MATERIAL | DirtyFlags::CAMERA);

        if self.force_rebuild {
            accel_request = AccelRequest::Rebuild;
        }
        self.shape_order = self.builder.shapes.keys().collect();
        self.light_order = self.builder.lights.keys().collect();
        self.force_rebuild = false;

        accel_request
    }

    /// Packs the accumulator's running means into `frame_image`, applying the
    /// optional bilateral denoise and the (always-on, since this core has no raw
    /// HDR output toggle) Reinhard tonemap in between (§4.10).
    fn pack_post_process(&mut self) {
        let width = self.accumulator.width;
        let height = self.accumulator.height;
        let mut pixels: Vec<Vec3> = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| self.accumulator.cell(x, y).mean())
            .collect();

        if self.config.denoise_enabled {
            let mut out = vec![Vec3::ZERO; pixels.len()];
            denoise::bilateral_denoise(&pixels, width, height, &self.denoise, &mut out);
            pixels = out;
        }

        tonemap::tonemap_frame(&mut pixels, self.tonemap_min_luminance);

        for y in 0..height {
            let dst_y = height - 1 - y;
            for x in 0..width {
                self.frame_image
                    .set_texel(x, dst_y, pixels[(y * width + x) as usize]);
            }
        }
    }
}

/// Picks the stronger of two acceleration-structure requests (`Rebuild` >
/// `Refit` > `None`), since a frame can simultaneously need a light-table
/// refresh and a full geometry rebuild.
fn worse_request(a: AccelRequest, b: AccelRequest) -> AccelRequest {
    match (a, b) {
        (AccelRequest::Rebuild, _) | (_, AccelRequest::Rebuild) => AccelRequest::Rebuild,
        (AccelRequest::Refit, _) | (_, AccelRequest::Refit) => AccelRequest::Refit,
        _ => AccelRequest::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::NullOracle;
    use glam::Vec3 as V3;

    fn test_camera() -> Camera {
        Camera::perspective(V3::new(0.0, 1.0, 3.0), V3::ZERO, V3::Y, 60.0, 1.0)
    }

    #[test]
    fn tick_without_a_camera_produces_no_integration() {
        let mut engine = Engine::new(4, 4, TracerConfig::default());
        let oracle = NullOracle;
        engine.tick(&oracle, 1.0 / 60.0);
        assert_eq!(engine.frame_index(), 0);
    }

    #[test]
    fn tick_with_a_camera_advances_frame_index() {
        let mut engine = Engine::new(4, 4, TracerConfig::default());
        engine.set_camera(test_camera());
        let oracle = NullOracle;
        engine.tick(&oracle, 1.0 / 60.0);
        assert_eq!(engine.frame_index(), 1);
        for &px in engine.frame_image().as_slice() {
            assert!(px.iter().all(|c| c.is_finite()));
        }
    }

    #[test]
    fn moving_the_camera_resets_frame_index() {
        let mut engine = Engine::new(4, 4, TracerConfig::default());
        engine.set_camera(test_camera());
        let oracle = NullOracle;
        engine.tick(&oracle, 1.0 / 60.0);
        engine.tick(&oracle, 1.0 / 60.0);
        assert_eq!(engine.frame_index(), 2);

        engine.set_camera(Camera::perspective(V3::new(1.0, 1.0, 3.0), V3::ZERO, V3::Y, 60.0, 1.0));
        assert_eq!(engine.frame_index(), 0);
    }

    #[test]
    fn stop_at_frame_pauses_and_halts_progress() {
        let mut config = TracerConfig::default();
        config.stop_at_frame = 2;
        let mut engine = Engine::new(4, 4, config);
        engine.set_camera(test_camera());
        let oracle = NullOracle;

        engine.tick(&oracle, 1.0 / 60.0);
        assert!(!engine.is_paused());
        engine.tick(&oracle, 1.0 / 60.0);
        assert!(engine.is_paused());
        assert_eq!(engine.frame_index(), 2);

        engine.tick(&oracle, 1.0 / 60.0);
        assert_eq!(engine.frame_index(), 2);
    }

    #[test]
    fn fatal_error_blocks_ticks_until_rebuild_is_requested() {
        let mut engine = Engine::new(4, 4, TracerConfig::default());
        engine.set_camera(test_camera());
        let oracle = NullOracle;

        engine.report_fatal_error(LumenError::OracleBuildFailed("test".into()));
        assert!(engine.has_errors());
        engine.tick(&oracle, 1.0 / 60.0);
        assert_eq!(engine.frame_index(), 0);

        engine.request_rebuild();
        assert!(!engine.has_errors());
        engine.tick(&oracle, 1.0 / 60.0);
        assert_eq!(engine.frame_index(), 1);
    }

    #[test]
    fn resize_clears_accumulation() {
        let mut engine = Engine::new(4, 4, TracerConfig::default());
        engine.set_camera(test_camera());
        let oracle = NullOracle;
        engine.tick(&oracle, 1.0 / 60.0);
        engine.resize(8, 8);
        assert_eq!(engine.size(), (8, 8));
        assert_eq!(engine.frame_index(), 0);
    }
}
