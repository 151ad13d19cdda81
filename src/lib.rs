#![warn(missing_docs)]
//! tryon - try-on style scene variations of a reference portrait.
//!
//! A run takes one portrait and an ordered list of scenarios (label +
//! prompt), asks an image model for one picture per scenario, and saves the
//! first image of each response as `{output_base}_{label}.{ext}`.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use tryon::{
//!     CredentialOptions, GeminiProvider, Preset, ReferenceImage, RunnerConfig, ScenarioRunner,
//!     ScenarioSet,
//! };
//!
//! #[tokio::main]
//! async fn main() -> tryon::Result<()> {
//!     let key = CredentialOptions::default().resolve()?.key;
//!     let provider = GeminiProvider::builder().api_key(key).build()?;
//!
//!     let reference = ReferenceImage::load("portrait.jpg")?;
//!     let scenarios = ScenarioSet::from_preset(Preset::Travel);
//!
//!     let runner = ScenarioRunner::new(provider, RunnerConfig::default());
//!     let report = runner.run(&reference, &scenarios, Path::new("output/look")).await?;
//!     for outcome in report.succeeded() {
//!         println!("{} -> {:?}", outcome.label, outcome.output_path());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `gemini`: Gemini (Google) image models
//! - `cli`: Command-line interface (`tryon` binary)

pub mod credentials;
mod error;
pub mod image;
pub mod runner;
pub mod scenario;

// Re-export error types at crate root
pub use error::{Result, TryOnError};

pub use credentials::{ApiKey, CredentialOptions, KeySource, ResolvedKey};
pub use image::{
    Fragment, FragmentStream, GeneratedImage, GenerationRequest, ImageFormat, ImageGenerator,
    ReferenceImage, Retrying,
};
pub use runner::{
    FailurePolicy, RunEvent, RunObserver, RunReport, RunnerConfig, ScenarioOutcome,
    ScenarioRunner, ScenarioStatus,
};
pub use scenario::{Preset, Scenario, ScenarioSet};

#[cfg(feature = "gemini")]
pub use image::providers::{GeminiModel, GeminiProvider, GeminiProviderBuilder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, TryOnError};
    pub use crate::image::{Fragment, ImageGenerator, ReferenceImage};
    pub use crate::runner::{FailurePolicy, RunnerConfig, ScenarioRunner};
    pub use crate::scenario::{Preset, Scenario, ScenarioSet};

    #[cfg(feature = "gemini")]
    pub use crate::image::providers::GeminiProvider;
}
