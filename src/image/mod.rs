//! Image generation module.

mod provider;
pub mod providers;
mod types;

pub use provider::{FragmentStream, ImageGenerator, Retrying};
pub use types::{Fragment, GeneratedImage, GenerationRequest, ImageFormat, ReferenceImage};
