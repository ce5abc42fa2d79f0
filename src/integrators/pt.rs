//! Wavefront unidirectional path tracer (C8, §4.7).
//!
//! Each logical "kernel" from the design (shade, shadow-query/commit, extend) is a
//! plain function over one path's state rather than a buffer-wide GPU launch — the
//! Design Notes' "stage operators over buffers, not coroutine-like kernel
//! iteration" collapses to a sequential per-path loop in this CPU core, since there
//! is no compute-dispatch backend here (see `DESIGN.md`).

use super::{power_heuristic, SceneView, ShadingFrame};
use crate::camera_rays;
use crate::config::TracerConfig;
use crate::lights::{self, LiSample};
use crate::oracle::{IntersectionOracle, Ray};
use crate::reconstruction::accumulate::Accumulator;
use crate::reconstruction::filter::FilterProperties;
use crate::sampler::{self, PathSampler};
use crate::scene::camera::Camera;
use crate::scene::ids::LightId;
use crate::scene::interaction::Interaction;
use crate::scene::light::{Light, LightKind};
use crate::scene::material::LobeMask;
use crate::scene::shape::Shape;
use crate::scene::throughput::{clamp_radiance, Throughput};
use crate::scene::vertex_streams::VertexStreams;
use crate::util::hash::pixel_scramble;
use glam::Vec3;

/// Samples direct illumination from `light` (identified by `light_id`) toward `p`,
/// dispatching the `TriangleMeshArea` variant (which needs the shape's geometry) to
/// its dedicated sampler since [`lights::sample_li`] cannot resolve it alone.
fn sample_light_li(view: &SceneView, light_id: LightId, light: &Light, p: Vec3, sampler: &mut PathSampler) -> LiSample {
    if let LightKind::TriangleMeshArea { shape_id } = light.kind {
        if let (Some(shape), Some(area_sampler)) = (view.shapes.get(shape_id), view.area_sampler(light_id)) {
            if let Some(streams) = view.streams.get(shape.stream_index as usize) {
                return sample_mesh_area_li(shape, streams, area_sampler, light, p, sampler);
            }
        }
        return LiSample { wi: Vec3::Z, li: Vec3::ZERO, pdf_dir: 0.0, distance: 0.0 };
    }
    lights::sample_li(light, p, view.scene_bbox, sampler)
}

fn sample_mesh_area_li(
    shape: &Shape,
    streams: &VertexStreams,
    area_sampler: &lights::TriangleMeshAreaSampler,
    light: &Light,
    p: Vec3,
    sampler: &mut PathSampler,
) -> LiSample {
    let u1 = sampler.next_1d();
    let u2 = sampler.next_2d();
    let (tri, bary) = area_sampler.sample_triangle(u1, u2);
    let bw = (1.0 - bary.x - bary.y).max(0.0);
    let base = tri * 3;
    let i0 = streams.indices[base] as usize;
    let i1 = streams.indices[base + 1] as usize;
    let i2 = streams.indices[base + 2] as usize;
    let p0 = streams.positions[i0];
    let p1 = streams.positions[i1];
    let p2 = streams.positions[i2];
    let local_p = p0 * bw + p1 * bary.x + p2 * bary.y;
    let world_p = shape.to_world.transform_point3(local_p);
    let gn_local = (p1 - p0).cross(p2 - p0).normalize_or_zero();
    let gn = (shape.to_world_inverse_transpose * gn_local).normalize_or_zero();

    let delta = world_p - p;
    let distance = delta.length().max(1e-8);
    let wi = delta / distance;
    let cos_light = (-wi).dot(gn).max(0.0);
    let total_area = area_sampler.total_area().max(1e-8);
    let pdf_dir = if cos_light > 1e-8 {
        (distance * distance) / (cos_light * total_area)
    } else {
        0.0
    };
    LiSample { wi, li: light.intensity, pdf_dir, distance }
}

/// Traces one full path for pixel `(x, y)`'s sample and returns its contribution to
/// `L_accum` (§4.7).
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn trace_path(
    view: &SceneView,
    oracle: &dyn IntersectionOracle,
    camera: &Camera,
    config: &TracerConfig,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    frame_index: u64,
    jitter: (f32, f32),
) -> Vec3 {
    let scramble = pixel_scramble(x, y, frame_index);
    let mut sampler = PathSampler::starting_at(frame_index as u32, scramble, sampler::camera_subpath_base_dim());

    let rd = camera_rays::generate(camera, x, y, width, height, jitter);
    let mut ray = rd.ray;
    let mut throughput = Throughput::initial();
    let mut l_accum = Vec3::ZERO;

    for bounce in 0..config.max_depth {
        if !ray.is_active() {
            break;
        }
        let hit = oracle.query_intersection(std::slice::from_ref(&ray)).remove(0);
        if !hit.is_hit() {
            break;
        }
        let Some(record) = view.resolve_hit(&ray, &hit) else { break };
        let interaction: Interaction = record.interaction;

        if let Some(light) = record.light {
            if bounce == 0 || throughput.prev_bsdf_flags.contains(LobeMask::DELTA) {
                l_accum += clamp_radiance(throughput.beta * light.intensity);
            }
        }

        let wo_local = record.frame.to_local(interaction.wo);

        if let Some(contribution) = sample_next_event(
            view,
            &record.frame,
            &interaction,
            record.material,
            &throughput,
            oracle,
            wo_local,
            &mut sampler,
        ) {
            l_accum += contribution;
        }

        let Some(bsdf_sample) = crate::bsdf::sample(record.material, wo_local, &mut sampler) else {
            break;
        };
        if bsdf_sample.pdf <= 0.0 || bsdf_sample.f == Vec3::ZERO {
            break;
        }

        let wi_world = record.frame.to_world(bsdf_sample.wi);
        let cos_i = bsdf_sample.wi.z.abs();
        throughput.scale(bsdf_sample.f * (cos_i / bsdf_sample.pdf));
        throughput.prev_bsdf_flags = bsdf_sample.flags;

        if bounce >= 3 {
            let q = (1.0 - throughput.max_component()).clamp(0.05, 0.95);
            if sampler.next_1d() < q {
                break;
            }
            throughput.beta = clamp_radiance(throughput.beta / (1.0 - q));
        }

        ray = Ray::new(interaction.spawn_point(wi_world), wi_world);
    }

    l_accum
}

/// The NEE half of the shade kernel: picks a light, samples it, evaluates the BSDF,
/// composes and fires the shadow ray, and returns the tentative contribution if it
/// passed occlusion (§4.7 step 1/2).
#[allow(clippy::too_many_arguments)]
fn sample_next_event(
    view: &SceneView,
    frame: &ShadingFrame,
    interaction: &Interaction,
    material: &crate::scene::material::UberMaterial,
    throughput: &Throughput,
    oracle: &dyn IntersectionOracle,
    wo_local: Vec3,
    sampler: &mut PathSampler,
) -> Option<Vec3> {
    if view.light_order.is_empty() {
        return None;
    }
    let choice_pdf = view.light_choice_pdf();
    let light_u = sampler.next_1d();
    let light_index = ((light_u * view.light_order.len() as f32) as usize).min(view.light_order.len() - 1);
    let light_id = view.light_order[light_index];
    let light = view.lights.get(light_id)?;

    let li_sample = sample_light_li(view, light_id, light, interaction.p, sampler);
    if li_sample.pdf_dir <= 0.0 || li_sample.li == Vec3::ZERO {
        return None;
    }

    let wi_local = frame.to_local(li_sample.wi);
    let f = crate::bsdf::evaluate(material, wo_local, wi_local);
    if f == Vec3::ZERO {
        return None;
    }
    let cos_theta = wi_local.z.abs();

    let is_delta = matches!(light.kind, LightKind::Point { .. } | LightKind::Directional { .. });
    let mis_weight = if is_delta {
        1.0
    } else {
        let bsdf_pdf = crate::bsdf::pdf(material, wo_local, wi_local);
        power_heuristic(li_sample.pdf_dir, bsdf_pdf)
    };

    let is_infinite = matches!(light.kind, LightKind::Directional { .. });
    let offset = interaction.ray_offset();
    let shadow_origin = interaction.spawn_point(li_sample.wi);
    let shadow_max_range = (li_sample.distance - 2.0 * offset).max(0.0);
    let mut shadow_ray = Ray::new(shadow_origin, li_sample.wi);
    shadow_ray.max_range = shadow_max_range;

    let contribution = clamp_radiance(
        throughput.beta * f * li_sample.li * (cos_theta * mis_weight / (choice_pdf * li_sample.pdf_dir)),
    );

    if is_infinite {
        return Some(contribution);
    }
    let occluded = oracle.query_occlusion(std::slice::from_ref(&shadow_ray)).remove(0);
    if occluded {
        None
    } else {
        Some(contribution)
    }
}

/// Renders one progressive frame (one sample per pixel, accumulated into `acc`'s
/// running mean) — the full C7→C4→C8→C10 pipeline slice for the path-tracer
/// integrator (§4.11 step 5).
#[allow(clippy::too_many_arguments)]
pub fn render_frame(
    view: &SceneView,
    oracle: &dyn IntersectionOracle,
    camera: &Camera,
    config: &TracerConfig,
    acc: &mut Accumulator,
    filter: &FilterProperties,
    frame_index: u64,
) {
    let width = acc.width;
    let height = acc.height;
    for y in 0..height {
        for x in 0..width {
            let jitter_scramble = pixel_scramble(x, y, frame_index);
            let jitter = if config.taa_enabled {
                (
                    sampler::sobol_sample(frame_index as u32, 0, jitter_scramble) - 0.5,
                    sampler::sobol_sample(frame_index as u32, 1, jitter_scramble) - 0.5,
                )
            } else {
                (0.0, 0.0)
            };
            let l = trace_path(view, oracle, camera, config, x, y, width, height, frame_index, jitter);
            acc.splat(i64::from(x), i64::from(y), jitter, l, filter);
        }
    }
}
