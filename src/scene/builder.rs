//! The Scene Builder (C3): translates host entity/material/light notifications into
//! the Scene Store, and drives refit/rebuild requests against the external
//! intersection oracle.

use super::bbox::BoundingBox;
use super::ids::{LightId, MaterialId, ShapeId, TransformId};
use super::light::{Light, LightTable};
use super::material::UberMaterial;
use super::shape::Shape;
use super::vertex_streams::VertexStreams;
use crate::config::AccelConfig;
use bitflags::bitflags;
use glam::{Affine3A, Quat, Vec2, Vec3};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

bitflags! {
    /// Which classes of scene state changed since the integrator last ran,
    /// computed before the integrator consumes the scene and cleared after
    /// (Design Notes: "listener lists" replaced by an explicit dirty bitset).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct DirtyFlags: u32 {
        const GEOMETRY = 1 << 0;
        const MATERIAL = 1 << 1;
        const LIGHT    = 1 << 2;
        const CAMERA   = 1 << 3;
    }
}

/// What kind of acceleration-structure update the frame loop must request from the
/// external oracle this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccelRequest {
    None,
    Refit,
    Rebuild,
}

/// One sub-mesh of an externally-imported model, matching the on-disk cache layout
/// in §6 field-for-field. An external importer (out of scope) fills these in; this
/// crate only supplies the struct shape as a contract.
#[derive(Debug, Clone, Default)]
pub struct SubMeshData {
    pub indices: Vec<u32>,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec3>,
    pub bitangents: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub colors: Vec<Vec3>,
}

/// An externally-imported model: a transform, its sub-meshes, material
/// assignments, and nested child models (§6 on-disk cache layout).
#[derive(Debug, Clone, Default)]
pub struct ImportedModel {
    pub name: String,
    pub position: Vec3,
    pub scale: Vec3,
    pub rotation: Quat,
    pub sub_meshes: Vec<SubMeshData>,
    pub material_indices: Vec<u32>,
    pub children: Vec<ImportedModel>,
}

/// Mesh identity used to detect repeated instances of the same source mesh for
/// the instancing policy (§4.3). An external caller decides what counts as "the
/// same mesh" (e.g. a hash of the imported asset path plus sub-mesh index).
pub type MeshKey = u64;

#[derive(Debug, Clone, Copy)]
struct MasterMesh {
    stream_index: usize,
}

/// Host-to-device scene translator. Owns the arena tables and the incrementally
/// maintained scene bounding box; does not own the Scene Store's `CpuBuffer`s
/// directly (those are written back by `Engine` after a builder pass, mirroring the
/// teacher's separation between `SceneManager` and the render-resource layer).
pub struct SceneBuilder {
    pub shapes: SlotMap<ShapeId, Shape>,
    pub materials: SlotMap<MaterialId, UberMaterial>,
    pub lights: SlotMap<LightId, Light>,
    pub transforms: SlotMap<TransformId, Affine3A>,
    pub streams: Vec<VertexStreams>,
    master_meshes: FxHashMap<MeshKey, MasterMesh>,
    dirty_transforms: Vec<ShapeId>,
    dirty_materials: Vec<MaterialId>,
    dirty: DirtyFlags,
    scene_bbox: BoundingBox,
    /// Optional debug aid: inject random per-vertex colors into meshes with none
    /// (§9 Open Question 5 — off by default).
    pub inject_debug_vertex_colors: bool,
}

impl Default for SceneBuilder {
    fn default() -> Self {
        Self {
            shapes: SlotMap::with_key(),
            materials: SlotMap::with_key(),
            lights: SlotMap::with_key(),
            transforms: SlotMap::with_key(),
            streams: Vec::new(),
            master_meshes: FxHashMap::default(),
            dirty_transforms: Vec::new(),
            dirty_materials: Vec::new(),
            dirty: DirtyFlags::empty(),
            scene_bbox: BoundingBox::default(),
            inject_debug_vertex_colors: false,
        }
    }
}

impl SceneBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn scene_bbox(&self) -> BoundingBox {
        self.scene_bbox
    }

    #[must_use]
    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    /// Registers a mesh's vertex streams the first time `mesh_key` is seen, and
    /// reuses the existing stream range on every subsequent call — the instancing
    /// policy from §4.3.
    pub fn register_mesh(&mut self, mesh_key: MeshKey, mut streams: VertexStreams) -> usize {
        if let Some(existing) = self.master_meshes.get(&mesh_key) {
            return existing.stream_index;
        }
        if self.inject_debug_vertex_colors && streams.colors.is_empty() {
            let n = streams.vertex_count();
            streams.colors = (0..n)
                .map(|i| {
                    let h = crate::util::hash::splitmix64(i as u64);
                    Vec3::new(
                        (h & 0xFF) as f32 / 255.0,
                        ((h >> 8) & 0xFF) as f32 / 255.0,
                        ((h >> 16) & 0xFF) as f32 / 255.0,
                    )
                })
                .collect();
        }
        let index = self.streams.len();
        self.streams.push(streams);
        self.master_meshes.insert(mesh_key, MasterMesh { stream_index: index });
        self.dirty |= DirtyFlags::GEOMETRY;
        index
    }

    /// Creates a new instance of a registered mesh with its own transform and
    /// material.
    pub fn insert_instance(
        &mut self,
        stream_index: usize,
        to_world: Affine3A,
        material_id: MaterialId,
    ) -> ShapeId {
        let streams = &self.streams[stream_index];
        let mut shape = Shape {
            to_world,
            to_world_inverse_transpose: glam::Mat3::IDENTITY,
            stream_index: stream_index as u32,
            start_index: 0,
            start_vertex: 0,
            triangle_count: streams.triangle_count() as u32,
            material_id,
            light_id: None,
            area: 0.0,
        };
        shape.update_normal_matrix();
        let id = self.shapes.insert(shape);
        self.mark_transform_dirty(id);
        id
    }

    pub fn mark_transform_dirty(&mut self, id: ShapeId) {
        self.dirty_transforms.push(id);
        self.dirty |= DirtyFlags::GEOMETRY;
    }

    pub fn mark_material_dirty(&mut self, id: MaterialId) {
        self.dirty_materials.push(id);
        self.dirty |= DirtyFlags::MATERIAL;
    }

    pub fn mark_light_dirty(&mut self) {
        self.dirty |= DirtyFlags::LIGHT;
    }

    pub fn mark_camera_dirty(&mut self) {
        self.dirty |= DirtyFlags::CAMERA;
    }

    /// Recomputes `toWorld`/`toWorldInverseTranspose`/`area` for every dirty shape,
    /// folds each updated shape's world AABB into the scene bbox, and returns what
    /// acceleration-structure update the oracle needs this frame (§4.3 "dirty
    /// transforms"). Never touches geometry that is not marked dirty.
    pub fn update_dirty_transforms(&mut self, stream_index_of: impl Fn(ShapeId) -> usize) -> AccelRequest {
        if self.dirty_transforms.is_empty() {
            return AccelRequest::None;
        }
        // stream_index_of lets the caller map a shape back to its vertex range;
        // kept as a closure so this module doesn't need an extra shape->stream map.
        let dirty: Vec<ShapeId> = self.dirty_transforms.drain(..).collect();
        for id in dirty {
            let stream_index = stream_index_of(id);
            let streams = self.streams[stream_index].clone();
            if let Some(shape) = self.shapes.get_mut(id) {
                shape.update_normal_matrix();
                let mut area = 0.0;
                for tri in 0..streams.triangle_count() {
                    area += streams.triangle_area(tri, shape.to_world);
                }
                shape.area = area;
                let local_bbox = BoundingBox::from_points(&streams.positions);
                self.scene_bbox.union(local_bbox.transformed(shape.to_world));
            }
        }
        self.dirty.remove(DirtyFlags::GEOMETRY);
        AccelRequest::Refit
    }

    /// Rebuilds the entire light table and recomputes the uniform `choicePdf`
    /// (§4.3 "dirty lights" — light counts are small, so this is always a full
    /// rebuild, never incremental).
    pub fn rebuild_light_table(&mut self) -> LightTable {
        let mut table = LightTable {
            lights: self.lights.values().copied().collect(),
        };
        table.rebuild_choice_pdf();
        for (shape_id, light_id) in self.lights.iter().filter_map(|(lid, l)| {
            l.kind.shape_id().map(|sid| (sid, lid))
        }) {
            if let Some(shape) = self.shapes.get_mut(shape_id) {
                shape.light_id = Some(light_id);
            }
        }
        self.dirty.remove(DirtyFlags::LIGHT);
        table
    }

    /// Clears the given dirty classes once the frame loop has consumed them (§9
    /// "the integrator consults it once and then clears it"). `GEOMETRY`/`LIGHT`
    /// are already cleared as a side effect of [`Self::update_dirty_transforms`] and
    /// [`Self::rebuild_light_table`]; this covers `MATERIAL`/`CAMERA`, which have no
    /// dedicated rebuild step of their own.
    pub fn clear_dirty(&mut self, flags: DirtyFlags) {
        self.dirty.remove(flags);
    }

    /// Requests a full rebuild: selects the acceleration-structure variant from
    /// `accel`, falling back to the simplest non-spatial-split SAH BVH if the
    /// caller reports the preferred variant failed (§4.3 "Full rebuild", §7 fatal
    /// recovery policy).
    #[must_use]
    pub fn full_rebuild_config(&self, accel: &AccelConfig, preferred_failed: bool) -> AccelConfig {
        if preferred_failed {
            AccelConfig::fallback()
        } else {
            *accel
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle_streams() -> VertexStreams {
        VertexStreams {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            normals: vec![Vec3::Z; 3],
            uvs: vec![Vec2::ZERO; 3],
            indices: vec![0, 1, 2],
            ..Default::default()
        }
    }

    #[test]
    fn registering_the_same_mesh_key_twice_reuses_the_stream() {
        let mut builder = SceneBuilder::new();
        let a = builder.register_mesh(1, unit_triangle_streams());
        let b = builder.register_mesh(1, unit_triangle_streams());
        assert_eq!(a, b);
        assert_eq!(builder.streams.len(), 1);
    }

    #[test]
    fn update_dirty_transforms_grows_scene_bbox() {
        let mut builder = SceneBuilder::new();
        let stream_index = builder.register_mesh(1, unit_triangle_streams());
        let material = builder.materials.insert(UberMaterial::default());
        let shape_id = builder.insert_instance(stream_index, Affine3A::IDENTITY, material);
        let req = builder.update_dirty_transforms(|_| stream_index);
        assert_eq!(req, AccelRequest::Refit);
        assert!(!builder.scene_bbox().is_empty());
        assert!(builder.shapes[shape_id].area > 0.0);
    }

    #[test]
    fn no_dirty_transforms_requests_nothing() {
        let mut builder = SceneBuilder::new();
        assert_eq!(
            builder.update_dirty_transforms(|_| 0),
            AccelRequest::None
        );
    }
}
