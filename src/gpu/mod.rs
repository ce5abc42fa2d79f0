//! GPU-mirroring infrastructure shared by every Scene Store array.
//!
//! The core never talks to a real device — there is no compute dispatch in this
//! crate — but the CPU-authoritative, version-tracked buffer shape is kept faithful
//! to how the teacher's render-resource layer mirrors CPU data to the GPU, so a real
//! upload path can be slotted in later by watching [`CpuBuffer::version`] instead of
//! diffing contents.

pub mod buffer;
