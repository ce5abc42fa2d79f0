//! Ray-offset policy: a ray spawned from a resolved hit, cosine-sampled into the
//! hemisphere of its own geometric normal, must never re-hit the surface it was
//! spawned from (§4.4's `max(TRACE_OFFSET, trace_error_offset)` offset policy).

mod common;

use glam::{Vec2, Vec3};
use lumentrace::camera_rays;
use lumentrace::integrators::SceneView;
use lumentrace::oracle::{IntersectionOracle, Ray};
use lumentrace::sampler::{concentric_sample_disc, sobol_sample};
use lumentrace::scene::bbox::BoundingBox;
use lumentrace::scene::camera::Camera;
use lumentrace::util::hash::pixel_scramble;

/// Cosine-weighted hemisphere sample around `+Z` in local space, mapped to world
/// space by `frame`.
fn cosine_sample_world(frame: &lumentrace::integrators::ShadingFrame, u: Vec2) -> Vec3 {
    let d = concentric_sample_disc(u);
    let z = (1.0 - d.x * d.x - d.y * d.y).max(0.0).sqrt();
    frame.to_world(Vec3::new(d.x, d.y, z))
}

#[test]
fn ten_thousand_spawned_rays_never_self_intersect() {
    let scene = common::build_diffuse_quad_scene();
    let view = SceneView::new(
        &scene.shape_order,
        &scene.shapes,
        &scene.materials,
        &scene.lights,
        &scene.light_order,
        &scene.streams,
        BoundingBox::default(),
    );

    // Camera looking down +Z at the quad from z = -20, so every pixel in this
    // grid lands on the (very large) quad.
    let camera = Camera::perspective(Vec3::new(0.0, 0.0, -20.0), Vec3::ZERO, Vec3::Y, 60.0, 1.0);
    let (width, height) = (100u32, 100u32);
    let mut checked = 0u32;

    for y in 0..height {
        for x in 0..width {
            let rd = camera_rays::generate(&camera, x, y, width, height, (0.0, 0.0));
            let hit = scene.oracle.query_intersection(std::slice::from_ref(&rd.ray)).remove(0);
            assert!(hit.is_hit(), "pixel ({x},{y}) should hit the covering quad");

            let Some(record) = view.resolve_hit(&rd.ray, &hit) else {
                panic!("resolve_hit failed for a reported hit");
            };
            let interaction = record.interaction;

            let scramble = pixel_scramble(x, y, 0);
            let u = Vec2::new(sobol_sample(0, 4, scramble), sobol_sample(0, 5, scramble));
            let wi_world = cosine_sample_world(&record.frame, u);

            let origin = interaction.spawn_point(wi_world);
            let probe = Ray::new(origin, wi_world);
            let occluded = scene.oracle.query_occlusion(std::slice::from_ref(&probe)).remove(0);
            assert!(!occluded, "ray spawned at pixel ({x},{y}) self-intersected its origin surface");
            checked += 1;
        }
    }

    assert_eq!(checked, 10_000);
}
