//! Shared fixture builders for integration tests.
//!
//! These construct scenes directly against the arena types ([`SlotMap`] tables,
//! [`VertexStreams`]) the same way the integrators' own unit tests do, rather than
//! through [`lumentrace::SceneBuilder`] — that keeps each fixture a plain, fully
//! inspectable value with no hidden dirty-tracking state.

use glam::{Affine3A, Vec3};
use lumentrace::oracle::BruteForceOracle;
use lumentrace::scene::ids::{LightId, MaterialId, ShapeId};
use lumentrace::scene::light::{Light, LightKind};
use lumentrace::scene::material::UberMaterial;
use lumentrace::scene::shape::Shape;
use lumentrace::scene::vertex_streams::VertexStreams;
use slotmap::SlotMap;

#[allow(dead_code)]
pub struct EmitterQuadScene {
    pub shapes: SlotMap<ShapeId, Shape>,
    pub materials: SlotMap<MaterialId, UberMaterial>,
    pub lights: SlotMap<LightId, Light>,
    pub streams: Vec<VertexStreams>,
    pub shape_order: Vec<ShapeId>,
    pub light_order: Vec<LightId>,
    pub oracle: BruteForceOracle,
}

/// A large quad at `z`, facing a camera at the origin looking down `+Z`, tagged as
/// a pure emitter: zero reflectance in every lobe, so [`lumentrace::bsdf::sample`]
/// returns `None` and every path terminates right after its one emission term —
/// no indirect bounce, no NEE self-sample of the surface a path is standing on.
#[allow(dead_code)]
#[must_use]
pub fn build_emitter_quad_scene(half_extent: f32, z: f32, intensity: Vec3) -> EmitterQuadScene {
    let mut shapes: SlotMap<ShapeId, Shape> = SlotMap::with_key();
    let mut materials: SlotMap<MaterialId, UberMaterial> = SlotMap::with_key();
    let mut lights: SlotMap<LightId, Light> = SlotMap::with_key();

    let material_id = materials.insert(UberMaterial {
        kd: [0.0; 3],
        ks: [0.0; 3],
        kr: [0.0; 3],
        kt: [0.0; 4],
        ..UberMaterial::default()
    });

    let streams = vec![VertexStreams {
        positions: vec![
            Vec3::new(-half_extent, -half_extent, z),
            Vec3::new(half_extent, -half_extent, z),
            Vec3::new(half_extent, half_extent, z),
            Vec3::new(-half_extent, half_extent, z),
        ],
        normals: vec![-Vec3::Z; 4],
        indices: vec![0, 1, 2, 0, 2, 3],
        ..Default::default()
    }];

    let shape_id = shapes.insert(Shape {
        to_world: Affine3A::IDENTITY,
        to_world_inverse_transpose: glam::Mat3::IDENTITY,
        stream_index: 0,
        start_index: 0,
        start_vertex: 0,
        triangle_count: 2,
        material_id,
        light_id: None,
        area: (2.0 * half_extent) * (2.0 * half_extent),
    });
    let light_id = lights.insert(Light {
        kind: LightKind::TriangleMeshArea { shape_id },
        intensity,
        choice_pdf: 1.0,
    });
    shapes[shape_id].light_id = Some(light_id);

    let mut oracle = BruteForceOracle::new();
    oracle.add_shape(0, &streams[0], Affine3A::IDENTITY);

    EmitterQuadScene {
        shape_order: vec![shape_id],
        light_order: vec![light_id],
        shapes,
        materials,
        lights,
        streams,
        oracle,
    }
}

/// A large flat quad with a purely diffuse, non-emitting material — used by the
/// ray-offset test, which only cares about self-intersection, not radiance.
#[allow(dead_code)]
pub struct DiffuseQuadScene {
    pub shapes: SlotMap<ShapeId, Shape>,
    pub materials: SlotMap<MaterialId, UberMaterial>,
    pub lights: SlotMap<LightId, Light>,
    pub streams: Vec<VertexStreams>,
    pub shape_order: Vec<ShapeId>,
    pub light_order: Vec<LightId>,
    pub oracle: BruteForceOracle,
}

#[allow(dead_code)]
#[must_use]
pub fn build_diffuse_quad_scene() -> DiffuseQuadScene {
    let mut shapes: SlotMap<ShapeId, Shape> = SlotMap::with_key();
    let mut materials: SlotMap<MaterialId, UberMaterial> = SlotMap::with_key();
    let lights: SlotMap<LightId, Light> = SlotMap::with_key();

    let material_id = materials.insert(UberMaterial::default());

    // A flat quad, large enough to fill a 60-degree-FOV camera's frustum at this
    // depth in full, so every pixel of a full-frame scan reports a hit.
    let half_extent = 15.0;
    let streams = vec![VertexStreams {
        positions: vec![
            Vec3::new(-half_extent, -half_extent, 0.0),
            Vec3::new(half_extent, -half_extent, 0.0),
            Vec3::new(half_extent, half_extent, 0.0),
            Vec3::new(-half_extent, half_extent, 0.0),
        ],
        normals: vec![Vec3::Z; 4],
        indices: vec![0, 1, 2, 0, 2, 3],
        ..Default::default()
    }];

    let shape_id = shapes.insert(Shape {
        to_world: Affine3A::IDENTITY,
        to_world_inverse_transpose: glam::Mat3::IDENTITY,
        stream_index: 0,
        start_index: 0,
        start_vertex: 0,
        triangle_count: 2,
        material_id,
        light_id: None,
        area: (2.0 * half_extent) * (2.0 * half_extent),
    });

    let mut oracle = BruteForceOracle::new();
    oracle.add_shape(0, &streams[0], Affine3A::IDENTITY);

    DiffuseQuadScene {
        shape_order: vec![shape_id],
        light_order: Vec::new(),
        shapes,
        materials,
        lights,
        streams,
        oracle,
    }
}
