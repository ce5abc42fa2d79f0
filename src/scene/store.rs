//! The Scene Store (C2): device-resident arrays mirrored from host state.
//!
//! Every array here is a [`CpuBuffer`], so a future real device-upload path can
//! watch each array's `version()` independently instead of re-diffing contents —
//! exactly the pattern the teacher's render-resource manager uses for its GPU
//! buffers (`resources/buffer.rs`).

use crate::gpu::buffer::CpuBuffer;
use crate::scene::camera::RenderCamera;
use crate::scene::light::LightTable;
use crate::scene::material::UberMaterial;
use crate::scene::shape::Shape;
use crate::scene::texture::TextureDesc2D;
use crate::scene::vertex_streams::VertexStreams;
use glam::{Vec2, Vec3};

/// Device-resident scene arrays: shapes, vertex streams, the texture atlas,
/// materials, the light table, and the current camera block (§3, §4.2).
pub struct SceneStore {
    pub shapes: CpuBuffer<Vec<Shape>>,
    pub streams: CpuBuffer<Vec<VertexStreams>>,
    pub textures: CpuBuffer<Vec<TextureDesc2D>>,
    /// Shared byte buffer backing every `TextureDesc2D` in `textures`.
    pub texel_data: CpuBuffer<Vec<u8>>,
    pub materials: CpuBuffer<Vec<UberMaterial>>,
    pub lights: CpuBuffer<LightTableGpu>,
    pub camera: CpuBuffer<CameraGpu>,
}

/// Wraps [`LightTable`] so it can implement [`crate::gpu::buffer::GpuData`] without
/// requiring every field to be `Pod` (light kinds are not a fixed-size POD layout).
#[derive(Debug, Clone, Default)]
pub struct LightTableGpu(pub LightTable);

impl crate::gpu::buffer::GpuData for LightTableGpu {
    fn as_bytes(&self) -> &[u8] {
        &[]
    }
    fn byte_size(&self) -> usize {
        self.0.lights.len() * std::mem::size_of::<crate::scene::light::Light>()
    }
}

/// Wraps an optional [`RenderCamera`] (no camera before the first frame).
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraGpu(pub Option<RenderCamera>);

impl crate::gpu::buffer::GpuData for CameraGpu {
    fn as_bytes(&self) -> &[u8] {
        match &self.0 {
            Some(c) => bytemuck::bytes_of(c),
            None => &[],
        }
    }
    fn byte_size(&self) -> usize {
        match self.0 {
            Some(_) => std::mem::size_of::<RenderCamera>(),
            None => 0,
        }
    }
}

impl Default for SceneStore {
    fn default() -> Self {
        Self {
            shapes: CpuBuffer::storage(Vec::new()),
            streams: CpuBuffer::storage(Vec::new()),
            textures: CpuBuffer::storage(Vec::new()),
            texel_data: CpuBuffer::storage(Vec::new()),
            materials: CpuBuffer::storage(Vec::new()),
            lights: CpuBuffer::storage(LightTableGpu::default()),
            camera: CpuBuffer::storage(CameraGpu::default()),
        }
    }
}

impl SceneStore {
    /// Overwrites the camera block, matching §3's lifecycle note that "the camera
    /// block is overwritten each frame".
    pub fn set_camera(&self, camera: RenderCamera) {
        let mut guard = self.camera.write();
        guard.0 = Some(camera);
    }

    #[must_use]
    pub fn vertex_world_position(&self, mesh_stream: usize, vertex_local_index: u32) -> Vec3 {
        self.streams.read()[mesh_stream].positions[vertex_local_index as usize]
    }

    #[must_use]
    pub fn vertex_uv(&self, mesh_stream: usize, vertex_local_index: u32) -> Vec2 {
        self.streams.read()[mesh_stream].uvs[vertex_local_index as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_camera_bumps_version() {
        let store = SceneStore::default();
        assert_eq!(store.camera.version(), 0);
        let cam = crate::scene::camera::Camera::perspective(
            Vec3::ZERO,
            Vec3::Z,
            Vec3::Y,
            60.0,
            1.0,
        );
        store.set_camera(RenderCamera::from(&cam));
        assert_eq!(store.camera.version(), 1);
    }
}
