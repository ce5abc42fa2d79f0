//! Reconstruction stage (C10): splats filtered samples into the frame accumulator.

pub mod accumulate;
pub mod filter;
