//! Reconstruction-filter invariants: a constant-radiance scene reconstructs to
//! exactly that constant under a single sample (no indirect, no NEE double-count
//! against the very emitter a path is standing on), and the Box filter's
//! accumulated weight grows by exactly one per frame.

mod common;

use glam::Vec3;
use lumentrace::integrators::{pt, SceneView};
use lumentrace::reconstruction::accumulate::Accumulator;
use lumentrace::reconstruction::filter::{FilterProperties, FilterType};
use lumentrace::scene::bbox::BoundingBox;
use lumentrace::scene::camera::Camera;
use lumentrace::TracerConfig;

fn no_jitter_config() -> TracerConfig {
    let mut config = TracerConfig::default();
    config.taa_enabled = false;
    config
}

#[test]
fn a_constant_emitter_reconstructs_to_its_own_radiance() {
    let scene = common::build_emitter_quad_scene(20.0, 5.0, Vec3::ONE);
    let view = SceneView::new(
        &scene.shape_order,
        &scene.shapes,
        &scene.materials,
        &scene.lights,
        &scene.light_order,
        &scene.streams,
        BoundingBox::default(),
    );
    let camera = Camera::perspective(Vec3::ZERO, Vec3::Z, Vec3::Y, 60.0, 1.0);
    let config = no_jitter_config();
    let filter = FilterProperties {
        filter_type: FilterType::Box,
        radius: (0.5, 0.5),
        ..FilterProperties::default()
    };

    let mut acc = Accumulator::new(8, 8);
    pt::render_frame(&view, &scene.oracle, &camera, &config, &mut acc, &filter, 0);

    for y in 0..8 {
        for x in 0..8 {
            let cell = acc.cell(x, y);
            assert_eq!(cell.weight_accum, 1.0);
            assert!((cell.mean() - Vec3::ONE).length() < 1e-5, "pixel ({x},{y}) mean was {:?}", cell.mean());
        }
    }
}

#[test]
fn box_filter_weight_grows_by_one_per_static_frame() {
    let scene = common::build_emitter_quad_scene(20.0, 5.0, Vec3::splat(0.5));
    let view = SceneView::new(
        &scene.shape_order,
        &scene.shapes,
        &scene.materials,
        &scene.lights,
        &scene.light_order,
        &scene.streams,
        BoundingBox::default(),
    );
    let camera = Camera::perspective(Vec3::ZERO, Vec3::Z, Vec3::Y, 60.0, 1.0);
    let config = no_jitter_config();
    let filter = FilterProperties {
        filter_type: FilterType::Box,
        radius: (0.5, 0.5),
        ..FilterProperties::default()
    };

    let mut acc = Accumulator::new(4, 4);
    for frame_index in 0..128u64 {
        pt::render_frame(&view, &scene.oracle, &camera, &config, &mut acc, &filter, frame_index);
    }

    for y in 0..4 {
        for x in 0..4 {
            let cell = acc.cell(x, y);
            assert_eq!(cell.weight_accum, 128.0);
            assert!((cell.mean() - Vec3::splat(0.5)).length() < 1e-4);
        }
    }
}
