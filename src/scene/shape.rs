//! Shape records — one per instance, sharing vertex ranges with other instances of
//! the same master mesh (§3 "Shape", §4.3 instancing policy).

use super::ids::{LightId, MaterialId};
use glam::{Affine3A, Mat3};

/// Immutable between rebuilds except for the fields `toWorld`/`toWorldInverseTranspose`/
/// `area`, which the scene builder updates in place whenever the instance's
/// transform is dirty (§4.3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shape {
    pub to_world: Affine3A,
    pub to_world_inverse_transpose: Mat3,
    /// Which entry of the scene's vertex-stream table this instance's geometry
    /// lives in (shared across every instance of the same master mesh, §4.3).
    pub stream_index: u32,
    /// First index into the shared index stream.
    pub start_index: u32,
    /// First vertex into the shared vertex streams (added to every index read from
    /// `start_index`).
    pub start_vertex: u32,
    pub triangle_count: u32,
    pub material_id: MaterialId,
    /// `None` when this shape is not an emitter.
    pub light_id: Option<LightId>,
    /// World-space surface area, recomputed by the scene builder whenever
    /// `to_world` changes.
    pub area: f32,
}

impl Shape {
    /// Recomputes `to_world_inverse_transpose` from `to_world`. Called by the scene
    /// builder whenever a shape's transform is marked dirty.
    pub fn update_normal_matrix(&mut self) {
        self.to_world_inverse_transpose = Mat3::from_mat4(
            glam::Mat4::from(self.to_world).inverse().transpose(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ids::{LightId, MaterialId};
    use slotmap::SlotMap;

    #[test]
    fn triangle_count_invariant_holds_for_constructed_shapes() {
        let mut materials: SlotMap<MaterialId, ()> = SlotMap::with_key();
        let mid = materials.insert(());
        let shape = Shape {
            to_world: Affine3A::IDENTITY,
            to_world_inverse_transpose: Mat3::IDENTITY,
            stream_index: 0,
            start_index: 0,
            start_vertex: 0,
            triangle_count: 2,
            material_id: mid,
            light_id: None::<LightId>,
            area: 1.0,
        };
        assert!(shape.triangle_count >= 1);
    }
}
