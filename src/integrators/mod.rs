//! Shared scene view and shading-frame plumbing for both integrators (C8, C9).
//!
//! Neither integrator owns its own copy of the scene: both borrow a [`SceneView`]
//! built once per frame by the frame loop from the current [`crate::scene::builder::SceneBuilder`]
//! state and the oracle's shape-id assignment.

pub mod bdpt;
pub mod pt;

use crate::lights::TriangleMeshAreaSampler;
use crate::oracle::{Hit, Ray};
use crate::scene::bbox::BoundingBox;
use crate::scene::ids::{LightId, MaterialId, ShapeId};
use crate::scene::interaction::Interaction;
use crate::scene::light::Light;
use crate::scene::material::UberMaterial;
use crate::scene::shape::Shape;
use crate::scene::vertex_streams::VertexStreams;
use glam::{Vec2, Vec3};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

/// A read-only snapshot of the scene an integrator needs for one frame: arena
/// tables plus the oracle's dense shape-id assignment (`shape_order[i]` is the
/// [`ShapeId`] the oracle reports hits against as shape `i`).
pub struct SceneView<'a> {
    pub shape_order: &'a [ShapeId],
    pub shapes: &'a SlotMap<ShapeId, Shape>,
    pub materials: &'a SlotMap<MaterialId, UberMaterial>,
    pub lights: &'a SlotMap<LightId, Light>,
    pub light_order: &'a [LightId],
    pub streams: &'a [VertexStreams],
    pub scene_bbox: BoundingBox,
    area_samplers: FxHashMap<LightId, TriangleMeshAreaSampler>,
}

/// A resolved ray-surface interaction plus the scene records it touched.
pub struct HitRecord<'a> {
    pub interaction: Interaction,
    pub material: &'a UberMaterial,
    pub light: Option<&'a Light>,
    /// Orthonormal local shading frame: `(tangent, binormal, sn)`.
    pub frame: ShadingFrame,
}

/// An orthonormal frame whose `z` axis is the shading normal, used to move `wo`/`wi`
/// between world space and the BSDF's local space (§4.4 "only `sn` is ever
/// perturbed").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingFrame {
    pub tangent: Vec3,
    pub binormal: Vec3,
    pub normal: Vec3,
}

impl ShadingFrame {
    #[must_use]
    pub fn from_normal(n: Vec3) -> Self {
        let a = if n.x.abs() > 0.9 { Vec3::Y } else { Vec3::X };
        let tangent = a.cross(n).normalize();
        let binormal = n.cross(tangent);
        Self { tangent, binormal, normal: n }
    }

    #[must_use]
    pub fn to_local(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.tangent), v.dot(self.binormal), v.dot(self.normal))
    }

    #[must_use]
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        self.tangent * v.x + self.binormal * v.y + self.normal * v.z
    }
}

impl<'a> SceneView<'a> {
    #[must_use]
    pub fn new(
        shape_order: &'a [ShapeId],
        shapes: &'a SlotMap<ShapeId, Shape>,
        materials: &'a SlotMap<MaterialId, UberMaterial>,
        lights: &'a SlotMap<LightId, Light>,
        light_order: &'a [LightId],
        streams: &'a [VertexStreams],
        scene_bbox: BoundingBox,
    ) -> Self {
        let mut area_samplers = FxHashMap::default();
        for &light_id in light_order {
            let Some(light) = lights.get(light_id) else { continue };
            if let crate::scene::light::LightKind::TriangleMeshArea { shape_id } = light.kind {
                if let Some(shape) = shapes.get(shape_id) {
                    if let Some(s) = streams.get(shape.stream_index as usize) {
                        area_samplers.insert(light_id, TriangleMeshAreaSampler::build(s, shape.to_world));
                    }
                }
            }
        }
        Self {
            shape_order,
            shapes,
            materials,
            lights,
            light_order,
            streams,
            scene_bbox,
            area_samplers,
        }
    }

    #[must_use]
    pub fn light_choice_pdf(&self) -> f32 {
        if self.light_order.is_empty() {
            0.0
        } else {
            1.0 / self.light_order.len() as f32
        }
    }

    #[must_use]
    pub fn area_sampler(&self, light_id: LightId) -> Option<&TriangleMeshAreaSampler> {
        self.area_samplers.get(&light_id)
    }

    /// Resolves an oracle [`Hit`] into a full shading record: world-space position,
    /// interpolated geometric/shading normals and UV, the hit shape's material, and
    /// its light (if it is an emitter).
    #[must_use]
    pub fn resolve_hit(&self, ray: &Ray, hit: &Hit) -> Option<HitRecord<'a>> {
        let oracle_id = hit.shape_id?;
        let shape_id = *self.shape_order.get(oracle_id as usize)?;
        let shape = self.shapes.get(shape_id)?;
        let streams = self.streams.get(shape.stream_index as usize)?;
        let tri = hit.primitive_id as usize;
        if tri >= streams.triangle_count() {
            return None;
        }
        let base = tri * 3;
        let i0 = streams.indices[base] as usize;
        let i1 = streams.indices[base + 1] as usize;
        let i2 = streams.indices[base + 2] as usize;

        let (bu, bv) = hit.barycentric;
        let bw = (1.0 - bu - bv).max(0.0);

        let p0 = streams.positions[i0];
        let p1 = streams.positions[i1];
        let p2 = streams.positions[i2];
        let local_p = p0 * bw + p1 * bu + p2 * bv;
        let world_p = shape.to_world.transform_point3(local_p);

        let gn_local = (p1 - p0).cross(p2 - p0).normalize_or_zero();
        let gn = (shape.to_world_inverse_transpose * gn_local).normalize_or_zero();

        let sn = if !streams.normals.is_empty() {
            let n = streams.normals[i0] * bw + streams.normals[i1] * bu + streams.normals[i2] * bv;
            let world_n = (shape.to_world_inverse_transpose * n).normalize_or_zero();
            if world_n != Vec3::ZERO { world_n } else { gn }
        } else {
            gn
        };

        let uv = if !streams.uvs.is_empty() {
            streams.uvs[i0] * bw + streams.uvs[i1] * bu + streams.uvs[i2] * bv
        } else {
            Vec2::ZERO
        };

        let frame = ShadingFrame::from_normal(sn);

        let interaction = Interaction {
            wo: -ray.direction,
            p: world_p,
            uv,
            trace_error_offset: (hit.t * 1e-5).max(crate::scene::interaction::TRACE_OFFSET),
            shape_index: oracle_id as usize,
            gn,
            sn,
            tangent: frame.tangent,
            binormal: frame.binormal,
        };

        let material = self.materials.get(shape.material_id)?;
        let light = shape.light_id.and_then(|lid| self.lights.get(lid));

        Some(HitRecord { interaction, material, light, frame })
    }
}

/// Power-heuristic MIS weight (β=2) of strategy `pdf_a` among competing densities
/// `pdf_a, pdf_b` (§4.7, §4.8).
#[must_use]
pub fn power_heuristic(pdf_a: f32, pdf_b: f32) -> f32 {
    let a2 = pdf_a * pdf_a;
    let b2 = pdf_b * pdf_b;
    if a2 + b2 <= 0.0 {
        0.0
    } else {
        a2 / (a2 + b2)
    }
}

/// Converts a solid-angle density at `from` looking toward `to` (surface normal
/// `to_normal`, possibly `None` for an infinite/delta-direction vertex) into area
/// measure: `p_area = p_dir · |cosθ| / d²` (§4.8 MIS details).
#[must_use]
pub fn solid_angle_to_area(pdf_dir: f32, from: Vec3, to: Vec3, to_normal: Option<Vec3>) -> f32 {
    let delta = to - from;
    let dist2 = delta.length_squared();
    if dist2 <= 1e-12 {
        return 0.0;
    }
    let wi = delta / dist2.sqrt();
    let cos_term = to_normal.map_or(1.0, |n| n.dot(-wi).abs());
    pdf_dir * cos_term / dist2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_heuristic_favors_the_larger_density() {
        assert!(power_heuristic(10.0, 1.0) > power_heuristic(1.0, 10.0));
    }

    #[test]
    fn power_heuristic_is_symmetric_complement() {
        let a = power_heuristic(2.0, 3.0);
        let b = power_heuristic(3.0, 2.0);
        assert!((a + b - 1.0).abs() < 1e-6);
    }

    #[test]
    fn shading_frame_round_trips_an_arbitrary_vector() {
        let frame = ShadingFrame::from_normal(Vec3::new(0.2, 0.9, 0.3).normalize());
        let v = Vec3::new(0.4, -0.2, 0.1);
        let local = frame.to_local(v);
        let back = frame.to_world(local);
        assert!((back - v).length() < 1e-5);
    }
}
