//! The intersection oracle contract (C4, §6).
//!
//! Acceleration-structure construction and ray-scene intersection are an external
//! black box per §1; this crate depends only on the [`IntersectionOracle`] trait.
//! [`NullOracle`] and [`BruteForceOracle`] are test-only stand-ins — neither is a
//! production BVH.

use crate::scene::interaction::MAX_TRACE_DISTANCE;
use crate::scene::vertex_streams::VertexStreams;
use glam::Vec3;

/// One traced ray. `active` mirrors the "flag != 0 AND finite direction" gate from
/// §6 — an inactive ray must produce no further work in subsequent launches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub max_range: f32,
    pub active: bool,
}

impl Ray {
    #[must_use]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            max_range: MAX_TRACE_DISTANCE,
            active: true,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active && self.direction.is_finite()
    }
}

/// Result of a `QueryIntersection` call for one ray. `shape_id = None` means no hit
/// (or `t > ray.max_range`), matching §6's `shapeId = -1` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hit {
    pub shape_id: Option<u32>,
    pub primitive_id: u32,
    /// Barycentric `(u, v)`; `w = 1 - u - v` is implicit.
    pub barycentric: (f32, f32),
    /// Euclidean hit distance.
    pub t: f32,
}

impl Hit {
    #[must_use]
    pub fn miss() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_hit(&self) -> bool {
        self.shape_id.is_some()
    }
}

/// The two operations an external acceleration structure must provide (§6).
pub trait IntersectionOracle {
    /// For each active ray, returns its nearest hit (or a miss). Inactive rays must
    /// yield a miss without being traced.
    fn query_intersection(&self, rays: &[Ray]) -> Vec<Hit>;

    /// For each active ray, returns whether *anything* is hit within
    /// `ray.max_range`. Inactive rays are reported unoccluded.
    fn query_occlusion(&self, rays: &[Ray]) -> Vec<bool>;
}

/// An oracle that never hits anything — useful for isolating sampler/BSDF/filter
/// tests from scene intersection entirely.
#[derive(Debug, Default)]
pub struct NullOracle;

impl IntersectionOracle for NullOracle {
    fn query_intersection(&self, rays: &[Ray]) -> Vec<Hit> {
        vec![Hit::miss(); rays.len()]
    }

    fn query_occlusion(&self, rays: &[Ray]) -> Vec<bool> {
        vec![false; rays.len()]
    }
}

/// One triangle, fully expanded to world space, for the brute-force scan.
struct WorldTriangle {
    shape_id: u32,
    primitive_id: u32,
    a: Vec3,
    b: Vec3,
    c: Vec3,
}

/// A linear triangle-scan oracle, grounded on `original_source`'s `RTScene.cpp`
/// Möller–Trumbore intersection helper. Quadratic in scene size — test fixtures
/// only, never a production acceleration structure (§4.12).
#[derive(Default)]
pub struct BruteForceOracle {
    triangles: Vec<WorldTriangle>,
}

impl BruteForceOracle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every triangle of `streams` transformed by `to_world`, tagged with
    /// `shape_id`.
    pub fn add_shape(&mut self, shape_id: u32, streams: &VertexStreams, to_world: glam::Affine3A) {
        for tri in 0..streams.triangle_count() {
            let (a, b, c) = streams.triangle(tri);
            self.triangles.push(WorldTriangle {
                shape_id,
                primitive_id: tri as u32,
                a: to_world.transform_point3(a),
                b: to_world.transform_point3(b),
                c: to_world.transform_point3(c),
            });
        }
    }

    fn intersect_triangle(ray: &Ray, tri: &WorldTriangle) -> Option<(f32, f32, f32)> {
        const EPS: f32 = 1e-8;
        let edge1 = tri.b - tri.a;
        let edge2 = tri.c - tri.a;
        let pvec = ray.direction.cross(edge2);
        let det = edge1.dot(pvec);
        if det.abs() < EPS {
            return None;
        }
        let inv_det = 1.0 / det;
        let tvec = ray.origin - tri.a;
        let u = tvec.dot(pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let qvec = tvec.cross(edge1);
        let v = ray.direction.dot(qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = edge2.dot(qvec) * inv_det;
        if t <= 0.0 || t > ray.max_range {
            return None;
        }
        Some((t, u, v))
    }

    fn trace_one(&self, ray: &Ray) -> Hit {
        if !ray.is_active() {
            return Hit::miss();
        }
        let mut best: Option<(f32, &WorldTriangle, f32, f32)> = None;
        for tri in &self.triangles {
            if let Some((t, u, v)) = Self::intersect_triangle(ray, tri) {
                let better = match best {
                    Some((bt, ..)) => t < bt,
                    None => true,
                };
                if better {
                    best = Some((t, tri, u, v));
                }
            }
        }
        match best {
            Some((t, tri, u, v)) => Hit {
                shape_id: Some(tri.shape_id),
                primitive_id: tri.primitive_id,
                barycentric: (u, v),
                t,
            },
            None => Hit::miss(),
        }
    }
}

impl IntersectionOracle for BruteForceOracle {
    fn query_intersection(&self, rays: &[Ray]) -> Vec<Hit> {
        rays.iter().map(|r| self.trace_one(r)).collect()
    }

    fn query_occlusion(&self, rays: &[Ray]) -> Vec<bool> {
        rays.iter().map(|r| self.trace_one(r).is_hit()).collect()
    }
}
