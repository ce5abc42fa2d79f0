//! Bidirectional path tracer (C9, §4.8).
//!
//! Generates a camera subpath and a light subpath, then sums the contribution of
//! every valid `(s, t)` connection strategy with `s + t <= maxDepth + 2`, weighted
//! by a power-heuristic (β=2) MIS weight. The weight implemented here compares
//! each strategy's forward-sampling density against its two immediate neighbors
//! (`s-1,t+1` and `s+1,t-1`) rather than Veach's full combinatorial sum over every
//! generatable strategy for the same path length — a deliberate simplification for
//! this CPU reference core, recorded in `DESIGN.md`. Every individual strategy is
//! still an unbiased estimator on its own; a narrower MIS sum changes variance, not
//! correctness.
//!
//! `t=1` (light-image) connections — straight from the camera root vertex to a
//! light-subpath vertex — are not traced; they'd need a raster projection of the
//! light vertex plus a pinhole importance weight to land in whichever pixel that
//! vertex projects to, which may not be the pixel currently being shaded. See
//! `DESIGN.md` for the full account of this gap.

use super::{power_heuristic, solid_angle_to_area, SceneView, ShadingFrame};
use crate::camera_rays;
use crate::config::TracerConfig;
use crate::lights;
use crate::oracle::{IntersectionOracle, Ray};
use crate::reconstruction::accumulate::Accumulator;
use crate::reconstruction::filter::FilterProperties;
use crate::sampler::{self, PathSampler};
use crate::scene::camera::Camera;
use crate::scene::interaction::Interaction;
use crate::scene::light::LightKind;
use crate::scene::material::UberMaterial;
use crate::scene::throughput::{clamp_radiance, BdptVertex, BdptVertexFlags, BdptVertexType};
use crate::util::hash::pixel_scramble;
use glam::Vec3;

struct Subpath {
    vertices: Vec<BdptVertex>,
}

fn vertex_normal(v: &BdptVertex) -> Option<Vec3> {
    if v.flags.contains(BdptVertexFlags::INFINITE_LIGHT) {
        None
    } else {
        Some(v.interaction.gn)
    }
}

/// Resolves a surface vertex's material through the view's shape table, using the
/// oracle-space id the vertex's interaction was resolved against (mirrors
/// [`SceneView::resolve_hit`]'s own shape lookup).
fn vertex_material<'a>(view: &SceneView<'a>, v: &BdptVertex) -> Option<&'a UberMaterial> {
    if v.vertex_type != BdptVertexType::Surface {
        return None;
    }
    let oracle_id = v.interaction.shape_index;
    if oracle_id == usize::MAX {
        return None;
    }
    let shape_id = *view.shape_order.get(oracle_id)?;
    let shape = view.shapes.get(shape_id)?;
    view.materials.get(shape.material_id)
}

fn vertex_light(view: &SceneView, v: &BdptVertex) -> Option<Vec3> {
    if v.vertex_type != BdptVertexType::Surface {
        return None;
    }
    let oracle_id = v.interaction.shape_index;
    if oracle_id == usize::MAX {
        return None;
    }
    let shape_id = *view.shape_order.get(oracle_id)?;
    let shape = view.shapes.get(shape_id)?;
    let light_id = shape.light_id?;
    Some(view.lights.get(light_id)?.intensity)
}

/// Extends `path` by repeated BSDF sampling, starting from `ray`/`beta`, up to
/// `max_vertices` additional surface vertices (§4.8 "generateSecondaryVertices").
fn extend_subpath(
    view: &SceneView,
    oracle: &dyn IntersectionOracle,
    path: &mut Subpath,
    mut ray: Ray,
    mut beta: Vec3,
    max_vertices: u32,
    sampler: &mut PathSampler,
) {
    for _ in 0..max_vertices {
        if !ray.is_active() || beta == Vec3::ZERO {
            break;
        }
        let hit = oracle.query_intersection(std::slice::from_ref(&ray)).remove(0);
        if !hit.is_hit() {
            break;
        }
        let Some(record) = view.resolve_hit(&ray, &hit) else { break };
        let prev_p = path.vertices.last().unwrap().interaction.p;

        let wo_local = record.frame.to_local(record.interaction.wo);
        let Some(bsdf_sample) = crate::bsdf::sample(record.material, wo_local, sampler) else {
            break;
        };
        if bsdf_sample.pdf <= 0.0 || bsdf_sample.f == Vec3::ZERO {
            break;
        }

        let is_delta = bsdf_sample.flags.intersects(crate::scene::material::LobeMask::DELTA);
        let pdf_fwd = solid_angle_to_area(bsdf_sample.pdf, prev_p, record.interaction.p, Some(record.interaction.gn));

        let mut flags = BdptVertexFlags::CONNECTIBLE;
        if is_delta {
            flags |= BdptVertexFlags::DELTA;
        }

        let cos_i = bsdf_sample.wi.z.abs();
        beta = clamp_radiance(beta * (bsdf_sample.f * (cos_i / bsdf_sample.pdf)));

        path.vertices.push(BdptVertex {
            beta,
            interaction: record.interaction,
            vertex_type: BdptVertexType::Surface,
            flags,
            light_idx: None,
            material_idx: None,
            pdf_fwd,
            pdf_rev: 0.0,
            pdf_pos: 0.0,
            radiance_buffer_idx: None,
        });

        let wi_world = record.frame.to_world(bsdf_sample.wi);
        ray = Ray::new(record.interaction.spawn_point(wi_world), wi_world);
    }
}

fn root_interaction(p: Vec3, dir: Vec3) -> Interaction {
    Interaction {
        wo: dir,
        p,
        uv: glam::Vec2::ZERO,
        trace_error_offset: 0.0,
        shape_index: usize::MAX,
        gn: dir,
        sn: dir,
        tangent: Vec3::X,
        binormal: Vec3::Y,
    }
}

/// Builds the camera subpath `z0 z1 ... z_t`, `t <= maxDepth + 1` surface vertices
/// past the root (§4.8 "generateStartVertices", camera half).
#[allow(clippy::too_many_arguments)]
fn generate_camera_subpath(
    view: &SceneView,
    oracle: &dyn IntersectionOracle,
    camera: &Camera,
    config: &TracerConfig,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    jitter: (f32, f32),
    sampler: &mut PathSampler,
) -> Subpath {
    let root = BdptVertex {
        beta: Vec3::ONE,
        interaction: root_interaction(camera.position, camera.forward),
        vertex_type: BdptVertexType::Camera,
        flags: BdptVertexFlags::CONNECTIBLE,
        light_idx: None,
        material_idx: None,
        pdf_fwd: 1.0,
        pdf_rev: 0.0,
        pdf_pos: 1.0,
        radiance_buffer_idx: None,
    };
    let mut path = Subpath { vertices: vec![root] };

    let rd = camera_rays::generate(camera, x, y, width, height, jitter);
    extend_subpath(view, oracle, &mut path, rd.ray, Vec3::ONE, config.max_depth + 1, sampler);

    if let Some(v1) = path.vertices.get_mut(1) {
        v1.pdf_fwd = solid_angle_to_area(
            camera_rays::pdf_camera_area(camera, rd.ray.direction),
            camera.position,
            v1.interaction.p,
            Some(v1.interaction.gn),
        );
    }
    path
}

/// Samples the light's own emission, dispatching `TriangleMeshArea` (which
/// [`lights::sample_le`] cannot resolve alone) to its own area-sampler-driven path,
/// analogous to `pt::sample_light_li`.
fn sample_light_emission(view: &SceneView, light_id: crate::scene::ids::LightId, sampler: &mut PathSampler) -> Option<lights::LeSample> {
    let light = view.lights.get(light_id)?;
    if let LightKind::TriangleMeshArea { shape_id } = light.kind {
        let shape = view.shapes.get(shape_id)?;
        let area_sampler = view.area_sampler(light_id)?;
        let streams = view.streams.get(shape.stream_index as usize)?;
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
        let origin = shape.to_world.transform_point3(local_p);
        let gn_local = (p1 - p0).cross(p2 - p0).normalize_or_zero();
        let normal = (shape.to_world_inverse_transpose * gn_local).normalize_or_zero();

        let u3 = sampler.next_2d();
        let local_dir = cosine_sample_hemisphere(u3);
        let (t, b) = orthonormal_basis(normal);
        let direction = t * local_dir.x + b * local_dir.y + normal * local_dir.z;
        let total_area = area_sampler.total_area().max(1e-8);
        Some(lights::LeSample {
            origin,
            direction,
            le: light.intensity,
            pdf_pos: 1.0 / total_area,
            pdf_dir: local_dir.z.max(1e-8) * std::f32::consts::FRAC_1_PI,
            normal,
        })
    } else {
        Some(lights::sample_le(light, view.scene_bbox, sampler))
    }
}

fn orthonormal_basis(n: Vec3) -> (Vec3, Vec3) {
    let a = if n.x.abs() > 0.9 { Vec3::Y } else { Vec3::X };
    let t = a.cross(n).normalize();
    (t, n.cross(t))
}

fn cosine_sample_hemisphere(u: glam::Vec2) -> Vec3 {
    let d = crate::sampler::concentric_sample_disc(u);
    let z = (1.0 - d.x * d.x - d.y * d.y).max(0.0).sqrt();
    Vec3::new(d.x, d.y, z)
}

/// Builds the light subpath `y0 y1 ... y_s`, `s <= maxDepth` surface vertices past
/// the root (§4.8 "generateStartVertices", light half).
fn generate_light_subpath(view: &SceneView, oracle: &dyn IntersectionOracle, config: &TracerConfig, sampler: &mut PathSampler) -> Subpath {
    if view.light_order.is_empty() {
        return Subpath { vertices: Vec::new() };
    }
    let light_u = sampler.next_1d();
    let idx = ((light_u * view.light_order.len() as f32) as usize).min(view.light_order.len() - 1);
    let light_id = view.light_order[idx];
    let Some(light) = view.lights.get(light_id) else {
        return Subpath { vertices: Vec::new() };
    };
    let Some(le_sample) = sample_light_emission(view, light_id, sampler) else {
        return Subpath { vertices: Vec::new() };
    };
    if le_sample.pdf_pos <= 0.0 || le_sample.pdf_dir <= 0.0 || le_sample.le == Vec3::ZERO {
        return Subpath { vertices: Vec::new() };
    }

    let choice_pdf = view.light_choice_pdf();
    let is_delta = matches!(light.kind, LightKind::Point { .. } | LightKind::Directional { .. });
    let is_infinite = matches!(light.kind, LightKind::Directional { .. });
    let mut flags = BdptVertexFlags::CONNECTIBLE;
    if is_delta {
        flags |= BdptVertexFlags::DELTA | BdptVertexFlags::DELTA_LIGHT;
    }
    if is_infinite {
        flags |= BdptVertexFlags::INFINITE_LIGHT;
    }

    let root_beta = le_sample.le / (choice_pdf * le_sample.pdf_pos);
    let root = BdptVertex {
        beta: root_beta,
        interaction: root_interaction(le_sample.origin, le_sample.direction),
        vertex_type: BdptVertexType::Light,
        flags,
        light_idx: Some(idx as u32),
        material_idx: None,
        pdf_fwd: le_sample.pdf_pos * choice_pdf,
        pdf_rev: 0.0,
        pdf_pos: le_sample.pdf_pos,
        radiance_buffer_idx: None,
    };

    let beta = root_beta * le_sample.direction.dot(le_sample.normal).abs() / le_sample.pdf_dir;
    let mut path = Subpath { vertices: vec![root] };
    let ray = Ray::new(le_sample.origin + le_sample.direction * 1e-4, le_sample.direction);
    extend_subpath(view, oracle, &mut path, ray, beta, config.max_depth, sampler);
    path
}

/// Geometry term between two vertices; visibility is handled separately by the
/// caller's shadow ray.
fn geometry_term(a: Vec3, a_n: Option<Vec3>, b: Vec3, b_n: Option<Vec3>) -> f32 {
    let delta = b - a;
    let dist2 = delta.length_squared().max(1e-8);
    let wi = delta / dist2.sqrt();
    let cos_a = a_n.map_or(1.0, |n| n.dot(wi).abs());
    let cos_b = b_n.map_or(1.0, |n| n.dot(-wi).abs());
    cos_a * cos_b / dist2
}

/// Evaluates the `(s, t)` connection strategy: checks connectibility, evaluates
/// both endpoint BSDFs, fires the shadow ray, and returns the MIS-weighted
/// contribution.
fn connect_occluded(
    view: &SceneView,
    oracle: &dyn IntersectionOracle,
    camera_path: &Subpath,
    light_path: &Subpath,
    s: usize,
    t: usize,
) -> Option<Vec3> {
    let zt = &camera_path.vertices[t - 1];
    let ys = &light_path.vertices[s - 1];

    if zt.vertex_type == BdptVertexType::Surface && zt.flags.contains(BdptVertexFlags::DELTA) {
        return None;
    }
    if ys.vertex_type == BdptVertexType::Surface && ys.flags.contains(BdptVertexFlags::DELTA) {
        return None;
    }

    let zt_mat = vertex_material(view, zt);
    let ys_mat = vertex_material(view, ys);
    if zt.vertex_type == BdptVertexType::Surface && zt_mat.is_none() {
        return None;
    }
    if ys.vertex_type == BdptVertexType::Surface && ys_mat.is_none() {
        return None;
    }

    let zt_normal = vertex_normal(zt);
    let ys_normal = vertex_normal(ys);
    let g = geometry_term(zt.interaction.p, zt_normal, ys.interaction.p, ys_normal);
    if g <= 0.0 || !g.is_finite() {
        return None;
    }

    let f_z = match zt_mat {
        Some(mat) => {
            let frame = ShadingFrame::from_normal(zt.interaction.sn);
            let wo = frame.to_local(zt.interaction.wo);
            let wi = frame.to_local((ys.interaction.p - zt.interaction.p).normalize_or_zero());
            crate::bsdf::evaluate(mat, wo, wi)
        }
        None => Vec3::ONE,
    };
    let f_y = match ys_mat {
        Some(mat) => {
            let frame = ShadingFrame::from_normal(ys.interaction.sn);
            let wo = frame.to_local(ys.interaction.wo);
            let wi = frame.to_local((zt.interaction.p - ys.interaction.p).normalize_or_zero());
            crate::bsdf::evaluate(mat, wo, wi)
        }
        None => Vec3::ONE,
    };
    if f_z == Vec3::ZERO || f_y == Vec3::ZERO {
        return None;
    }

    let offset = zt.interaction.ray_offset().max(ys.interaction.ray_offset());
    let delta = ys.interaction.p - zt.interaction.p;
    let distance = delta.length();
    if distance <= 2.0 * offset {
        return None;
    }
    let dir = delta / distance;
    let origin = zt.interaction.p + zt_normal.map_or(dir, |n| if n.dot(dir) >= 0.0 { n } else { -n }) * offset;
    let mut shadow_ray = Ray::new(origin, dir);
    shadow_ray.max_range = distance - 2.0 * offset;
    if oracle.query_occlusion(std::slice::from_ref(&shadow_ray)).remove(0) {
        return None;
    }

    let unweighted = clamp_radiance(zt.beta * f_z * g * f_y * ys.beta);

    let this_pdf = zt.pdf_fwd.max(1e-8) * ys.pdf_fwd.max(1e-8);
    // `t - 2 == 0` would reach back to the camera root vertex (the excluded t=1
    // strategy, see `trace_bdpt_sample`) — it isn't part of the traced strategy set,
    // so it contributes no neighbor mass to the weight either.
    let neighbor_a = if t >= 3 {
        camera_path.vertices[t - 2].pdf_fwd.max(1e-8) * ys.pdf_fwd.max(1e-8)
    } else {
        0.0
    };
    let neighbor_b = if s >= 2 {
        zt.pdf_fwd.max(1e-8) * light_path.vertices[s - 2].pdf_fwd.max(1e-8)
    } else {
        0.0
    };
    let weight = if neighbor_a <= 0.0 && neighbor_b <= 0.0 {
        1.0
    } else {
        power_heuristic(this_pdf, neighbor_a.max(neighbor_b))
    };

    Some(unweighted * weight)
}

#[allow(clippy::too_many_arguments)]
fn trace_bdpt_sample(
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
    let mut cam_sampler = PathSampler::starting_at(frame_index as u32, scramble, sampler::camera_subpath_base_dim());
    let mut light_sampler = PathSampler::starting_at(
        frame_index as u32,
        scramble,
        sampler::light_subpath_base_dim(config.max_depth),
    );

    let camera_path = generate_camera_subpath(view, oracle, camera, config, x, y, width, height, jitter, &mut cam_sampler);
    let light_path = generate_light_subpath(view, oracle, config, &mut light_sampler);

    let mut l = Vec3::ZERO;

    // s=0: the camera subpath's own BSDF sampling landed on an emitter.
    for v in camera_path.vertices.iter().skip(1) {
        if let Some(le) = vertex_light(view, v) {
            l += clamp_radiance(v.beta * le);
        }
    }

    // t=1 (connecting straight from the camera root vertex) is deliberately not
    // traced here: it needs a raster projection of the light-subpath vertex plus a
    // pinhole importance weight to land in the pixel that vertex actually projects
    // to, which this per-pixel accumulator loop has no path for splatting into — see
    // the light-image deviation note in DESIGN.md.
    let max_st = config.max_depth as usize + 2;
    for t in 2..camera_path.vertices.len().min(max_st) {
        let s_limit = light_path.vertices.len().min(max_st.saturating_sub(t));
        for s in 1..=s_limit {
            if let Some(contribution) = connect_occluded(view, oracle, &camera_path, &light_path, s, t) {
                l += contribution;
            }
        }
    }

    l
}

/// Renders one progressive BDPT frame, one sample per pixel (§4.11 step 5).
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
            let l = trace_bdpt_sample(view, oracle, camera, config, x, y, width, height, frame_index, jitter);
            acc.splat(i64::from(x), i64::from(y), jitter, l, filter);
        }
    }
}

/// Upper bound on connections attempted per pixel per frame,
/// `(maxDepth+2)(maxDepth+3)/2 - 2` (§4.8 step 3). Exposed so buffer-sizing
/// callers (a future device backend) don't have to re-derive it.
#[must_use]
pub fn max_possible_connections(max_depth: u32) -> usize {
    let n = max_depth as usize + 2;
    (n * (n + 1)) / 2 - 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TracerConfig;
    use crate::oracle::{BruteForceOracle, NullOracle};
    use crate::scene::bbox::BoundingBox;
    use crate::scene::ids::{LightId, MaterialId, ShapeId};
    use crate::scene::light::{Light, LightKind};
    use crate::scene::material::UberMaterial;
    use crate::scene::shape::Shape;
    use crate::scene::vertex_streams::VertexStreams;
    use slotmap::SlotMap;

    #[test]
    fn max_possible_connections_matches_the_documented_formula() {
        assert_eq!(max_possible_connections(3), (5 * 6) / 2 - 2);
    }

    #[test]
    fn a_path_that_never_hits_anything_contributes_nothing() {
        let shapes: SlotMap<ShapeId, Shape> = SlotMap::with_key();
        let materials: SlotMap<MaterialId, UberMaterial> = SlotMap::with_key();
        let lights: SlotMap<LightId, Light> = SlotMap::with_key();
        let view = SceneView::new(&[], &shapes, &materials, &lights, &[], &[], BoundingBox::default());
        let oracle = NullOracle;
        let camera = Camera::perspective(Vec3::ZERO, Vec3::Z, Vec3::Y, 60.0, 1.0);
        let config = TracerConfig::default();
        let l = trace_bdpt_sample(&view, &oracle, &camera, &config, 4, 4, 8, 8, 0, (0.0, 0.0));
        assert_eq!(l, Vec3::ZERO);
    }

    #[test]
    fn a_scene_with_a_visible_emitter_produces_nonnegative_finite_radiance() {
        let mut shapes: SlotMap<ShapeId, Shape> = SlotMap::with_key();
        let mut materials: SlotMap<MaterialId, UberMaterial> = SlotMap::with_key();
        let mut lights: SlotMap<LightId, Light> = SlotMap::with_key();

        let material_id = materials.insert(UberMaterial::default());
        let streams = vec![VertexStreams {
            positions: vec![
                Vec3::new(-1.0, -1.0, 5.0),
                Vec3::new(1.0, -1.0, 5.0),
                Vec3::new(0.0, 1.0, 5.0),
            ],
            normals: vec![-Vec3::Z, -Vec3::Z, -Vec3::Z],
            indices: vec![0, 1, 2],
            ..Default::default()
        }];

        let shape_id = shapes.insert(Shape {
            to_world: glam::Affine3A::IDENTITY,
            to_world_inverse_transpose: glam::Mat3::IDENTITY,
            stream_index: 0,
            start_index: 0,
            start_vertex: 0,
            triangle_count: 1,
            material_id,
            light_id: None,
            area: 2.0,
        });
        let light_id = lights.insert(Light {
            kind: LightKind::TriangleMeshArea { shape_id },
            intensity: Vec3::splat(5.0),
            choice_pdf: 1.0,
        });
        shapes[shape_id].light_id = Some(light_id);

        let shape_order = vec![shape_id];
        let light_order = vec![light_id];
        let view = SceneView::new(&shape_order, &shapes, &materials, &lights, &light_order, &streams, BoundingBox::default());

        let mut oracle = BruteForceOracle::new();
        oracle.add_shape(0, &streams[0], glam::Affine3A::IDENTITY);

        let camera = Camera::perspective(Vec3::ZERO, Vec3::Z, Vec3::Y, 60.0, 1.0);
        let config = TracerConfig::default();
        let l = trace_bdpt_sample(&view, &oracle, &camera, &config, 4, 4, 8, 8, 0, (0.0, 0.0));
        assert!(l.is_finite());
        assert!(l.x >= 0.0 && l.y >= 0.0 && l.z >= 0.0);
    }
}
