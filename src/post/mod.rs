//! Post-processing stage (C11): bilateral denoise, then Reinhard tonemapping.

pub mod denoise;
pub mod tonemap;
