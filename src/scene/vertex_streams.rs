//! Parallel per-vertex attribute arrays, shared across all shape instances that
//! reference the same vertex range.
//!
//! Kept as structure-of-arrays (not array-of-structs) so the shading kernel can take
//! uniform `&[Vec3]`/`&[Vec2]` arguments regardless of which attributes a given mesh
//! actually populated, matching §4.2's "strided per-vertex attributes remain
//! parallel arrays to keep the shading kernel arguments uniform".

use glam::{Vec2, Vec3};

/// A contiguous run of vertices and a contiguous run of triangle indices, shared by
/// every shape instanced from the same master mesh.
#[derive(Debug, Clone, Default)]
pub struct VertexStreams {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub tangents: Vec<Vec3>,
    pub binormals: Vec<Vec3>,
    /// Optional per-vertex color; empty when the mesh carries none.
    pub colors: Vec<Vec3>,
    /// Triangle index buffer, three indices per triangle, local to this stream.
    pub indices: Vec<u32>,
}

impl VertexStreams {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[must_use]
    pub fn triangle(&self, tri: usize) -> (Vec3, Vec3, Vec3) {
        let base = tri * 3;
        (
            self.positions[self.indices[base] as usize],
            self.positions[self.indices[base + 1] as usize],
            self.positions[self.indices[base + 2] as usize],
        )
    }

    /// World-space surface area of one local-space triangle under `to_world`. Used
    /// by `Shape::area` recomputation and by triangle-mesh-area light CDF building.
    #[must_use]
    pub fn triangle_area(&self, tri: usize, to_world: glam::Affine3A) -> f32 {
        let (a, b, c) = self.triangle(tri);
        let (wa, wb, wc) = (
            to_world.transform_point3(a),
            to_world.transform_point3(b),
            to_world.transform_point3(c),
        );
        0.5 * (wb - wa).cross(wc - wa).length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_area_of_unit_right_triangle_is_half() {
        let streams = VertexStreams {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        let area = streams.triangle_area(0, glam::Affine3A::IDENTITY);
        assert!((area - 0.5).abs() < 1e-6);
    }
}
