#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod bsdf;
pub mod camera_rays;
pub mod config;
pub mod engine;
pub mod errors;
pub mod frame_image;
pub mod gpu;
pub mod integrators;
pub mod lights;
pub mod oracle;
pub mod post;
pub mod reconstruction;
pub mod sampler;
pub mod scene;
pub mod util;

pub use config::{AccelConfig, IntegratorKind, TracerConfig};
pub use engine::Engine;
pub use errors::{LumenError, Result};
pub use frame_image::FrameImage;
pub use oracle::{BruteForceOracle, Hit, IntersectionOracle, NullOracle, Ray};
pub use scene::builder::SceneBuilder;
pub use scene::camera::Camera;
