//! CPU-authoritative, version-tracked mirror of a device buffer.
//!
//! Every Scene Store array is a [`CpuBuffer<Vec<T>>`]: writers take a [`BufferGuard`]
//! through [`CpuBuffer::write`], mutate through `DerefMut`, and on drop the version
//! counter bumps automatically — an eventual upload path diffs versions, never
//! buffer contents.

use bytemuck::Pod;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Anything that can hand back its bytes for an eventual device upload.
pub trait GpuData {
    fn as_bytes(&self) -> &[u8];
    fn byte_size(&self) -> usize;
}

impl<T: Pod> GpuData for Vec<T> {
    fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self)
    }

    fn byte_size(&self) -> usize {
        std::mem::size_of::<T>() * self.len()
    }
}

struct CpuBufferState<T: GpuData> {
    data: T,
    version: u64,
}

/// CPU-side array with a monotonic version counter.
pub struct CpuBuffer<T: GpuData> {
    id: u64,
    usage: wgpu::BufferUsages,
    inner: RwLock<CpuBufferState<T>>,
}

impl<T: GpuData> CpuBuffer<T> {
    pub fn new(data: T, usage: wgpu::BufferUsages) -> Self {
        Self {
            id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
            usage,
            inner: RwLock::new(CpuBufferState { data, version: 0 }),
        }
    }

    #[must_use]
    pub fn storage(data: T) -> Self {
        Self::new(data, wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST)
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn usage(&self) -> wgpu::BufferUsages {
        self.usage
    }

    pub fn version(&self) -> u64 {
        self.inner.read().version
    }

    pub fn read(&self) -> BufferReadGuard<'_, T> {
        BufferReadGuard {
            guard: self.inner.read(),
        }
    }

    pub fn write(&self) -> BufferGuard<'_, T> {
        BufferGuard {
            guard: self.inner.write(),
            changed: true,
        }
    }
}

impl<T: GpuData + Default> Default for CpuBuffer<T> {
    fn default() -> Self {
        Self::storage(T::default())
    }
}

pub struct BufferReadGuard<'a, T: GpuData> {
    guard: RwLockReadGuard<'a, CpuBufferState<T>>,
}

impl<T: GpuData> std::ops::Deref for BufferReadGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.guard.data
    }
}

pub struct BufferGuard<'a, T: GpuData> {
    guard: RwLockWriteGuard<'a, CpuBufferState<T>>,
    changed: bool,
}

impl<T: GpuData> BufferGuard<'_, T> {
    /// Skip the version bump this guard would otherwise cause on drop — for writes
    /// that turn out to be no-ops.
    pub fn skip_sync(&mut self) {
        self.changed = false;
    }
}

impl<T: GpuData> std::ops::Deref for BufferGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.guard.data
    }
}

impl<T: GpuData> std::ops::DerefMut for BufferGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard.data
    }
}

impl<T: GpuData> Drop for BufferGuard<'_, T> {
    fn drop(&mut self) {
        if self.changed {
            self.guard.version = self.guard.version.wrapping_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_bumps_version() {
        let buf = CpuBuffer::storage(vec![1.0f32, 2.0]);
        assert_eq!(buf.version(), 0);
        {
            let mut g = buf.write();
            g.push(3.0);
        }
        assert_eq!(buf.version(), 1);
    }

    #[test]
    fn skip_sync_suppresses_version_bump() {
        let buf = CpuBuffer::storage(vec![1.0f32]);
        {
            let mut g = buf.write();
            g.skip_sync();
        }
        assert_eq!(buf.version(), 0);
    }
}
