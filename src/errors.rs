//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`LumenError`] covers every fatal/latched failure mode from
//! the error-handling taxonomy: acceleration-structure construction/commit failures,
//! device buffer budget overruns, and configuration problems. Recoverable and soft
//! failures (a degenerate per-frame BSDF sample, a missing texture) are *not*
//! represented here — they are logged once and handled in place by clamping or
//! substituting a default, since kernels never surface errors per pixel.
//!
//! All public APIs that can fail fatally return [`Result<T>`], an alias for
//! `std::result::Result<T, LumenError>`.

use thiserror::Error;

/// The main error type for the Lumentrace light-transport core.
///
/// Only fatal/latched conditions are represented here (see module docs). The
/// [`crate::engine::Engine`] frame loop is the only place that turns one of these
/// into the latched `has_errors` bit described in the error-handling design.
#[derive(Error, Debug)]
pub enum LumenError {
    /// The intersection oracle failed to build or refit its acceleration structure
    /// on the preferred variant. The caller should retry once with the default
    /// (non-spatial-split SAH) BVH before surfacing this to the user.
    #[error("intersection oracle build failed: {0}")]
    OracleBuildFailed(String),

    /// The intersection oracle rejected a commit (transform/material upload) against
    /// an already-built acceleration structure.
    #[error("intersection oracle commit failed: {0}")]
    OracleCommitFailed(String),

    /// Device kernel compilation failed. Stubbed in this core — there is no real
    /// shader compiler here, since every "kernel launch" is an ordinary CPU
    /// function call (§5); kept so the error taxonomy's fatal/latched set matches
    /// §7 and an eventual GPU port has a variant to report into.
    #[error("kernel compile failed: {0}")]
    KernelCompileFailed(String),

    /// A device buffer allocation would exceed the memory record's configured
    /// budget.
    #[error(
        "device buffer allocation for '{record}' exceeds budget: requested {requested} bytes, budget {budget} bytes"
    )]
    BufferAllocExceeded {
        /// Name of the owning memory record (e.g. "BDPT", "PT", "Reconstruction").
        record: String,
        /// Requested allocation size in bytes.
        requested: usize,
        /// Configured budget in bytes.
        budget: usize,
    },

    /// A configuration value was structurally invalid (not merely out of range —
    /// out-of-range numeric values are clamped silently, never rejected).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Index out of bounds against a scene arena (shape/material/light table).
    #[error("scene index out of bounds: {context} (index {index})")]
    IndexOutOfBounds {
        /// What was being accessed.
        context: String,
        /// The invalid index.
        index: usize,
    },
}

/// Alias for `Result<T, LumenError>`.
pub type Result<T> = std::result::Result<T, LumenError>;
