//! Scenario runner: one reference portrait, many prompts, one saved image
//! per prompt.

use crate::error::{Result, TryOnError};
use crate::image::{
    Fragment, FragmentStream, GeneratedImage, GenerationRequest, ImageGenerator, ReferenceImage,
};
use crate::scenario::{Scenario, ScenarioSet};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// What to do when a scenario fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure and carry on with the remaining scenarios.
    #[default]
    Continue,
    /// Abort the run on the first failure.
    FailFast,
}

/// Runner settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Failure handling.
    pub policy: FailurePolicy,
    /// Maximum number of scenarios in flight. `1` runs strictly in order.
    pub concurrency: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            policy: FailurePolicy::default(),
            concurrency: 1,
        }
    }
}

impl RunnerConfig {
    /// Sets the failure policy.
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the concurrency limit (values below 1 are treated as 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// Progress notifications emitted during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent<'a> {
    /// A scenario's request is about to be sent.
    Started {
        /// Scenario label.
        label: &'a str,
        /// Zero-based position in the set.
        index: usize,
        /// Number of scenarios in the set.
        total: usize,
    },
    /// The model returned informational text.
    Text {
        /// Scenario label.
        label: &'a str,
        /// The text as received.
        text: &'a str,
    },
    /// A scenario's image was written to disk.
    Saved {
        /// Scenario label.
        label: &'a str,
        /// Where the image was written.
        path: &'a Path,
        /// Bytes written.
        size_bytes: usize,
    },
    /// A scenario produced no image.
    Failed {
        /// Scenario label.
        label: &'a str,
        /// Error message.
        reason: &'a str,
    },
}

/// Receives [`RunEvent`]s.
pub trait RunObserver: Send + Sync {
    /// Called for every event, in the order they happen.
    fn on_event(&self, event: &RunEvent<'_>);
}

impl<F> RunObserver for F
where
    F: Fn(&RunEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &RunEvent<'_>) {
        self(event)
    }
}

/// Final state of one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ScenarioStatus {
    /// The image was written to `path`.
    Saved {
        /// Output file.
        path: PathBuf,
        /// Bytes written.
        size_bytes: usize,
        /// MIME type reported by the service.
        mime_type: String,
    },
    /// No image was produced.
    Failed {
        /// Error message.
        reason: String,
    },
}

/// Result of one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioOutcome {
    /// Scenario label.
    pub label: String,
    /// What happened.
    #[serde(flatten)]
    pub status: ScenarioStatus,
}

impl ScenarioOutcome {
    /// True when an image was saved.
    pub fn success(&self) -> bool {
        matches!(self.status, ScenarioStatus::Saved { .. })
    }

    /// Path of the saved image, if any.
    pub fn output_path(&self) -> Option<&Path> {
        match self.status {
            ScenarioStatus::Saved { ref path, .. } => Some(path),
            ScenarioStatus::Failed { .. } => None,
        }
    }
}

/// Outcomes of a run, in scenario order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// One entry per scenario that finished.
    pub outcomes: Vec<ScenarioOutcome>,
}

impl RunReport {
    /// Scenarios that saved an image.
    pub fn succeeded(&self) -> impl Iterator<Item = &ScenarioOutcome> {
        self.outcomes.iter().filter(|o| o.success())
    }

    /// Scenarios that failed.
    pub fn failed(&self) -> impl Iterator<Item = &ScenarioOutcome> {
        self.outcomes.iter().filter(|o| !o.success())
    }

    /// True when every scenario saved an image.
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(ScenarioOutcome::success)
    }

    /// Looks up the outcome for a label.
    pub fn get(&self, label: &str) -> Option<&ScenarioOutcome> {
        self.outcomes.iter().find(|o| o.label == label)
    }
}

/// Runs every scenario of a [`ScenarioSet`] against one generator.
pub struct ScenarioRunner<G> {
    generator: G,
    config: RunnerConfig,
    observer: Option<Arc<dyn RunObserver>>,
}

impl<G: ImageGenerator> ScenarioRunner<G> {
    /// Creates a runner.
    pub fn new(generator: G, config: RunnerConfig) -> Self {
        Self {
            generator,
            config,
            observer: None,
        }
    }

    /// Attaches a progress observer.
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The generator in use.
    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Generates every scenario and writes results to
    /// `{output_base}_{label}.{ext}`.
    ///
    /// Under [`FailurePolicy::Continue`] this only fails for I/O problems
    /// outside any scenario; scenario failures are listed in the report.
    /// Under [`FailurePolicy::FailFast`] the first failure is returned as
    /// [`TryOnError::ScenarioFailed`].
    pub async fn run(
        &self,
        reference: &ReferenceImage,
        scenarios: &ScenarioSet,
        output_base: &Path,
    ) -> Result<RunReport> {
        let total = scenarios.len();
        let start = Instant::now();

        tracing::debug!(
            generator = self.generator.name(),
            scenarios = total,
            concurrency = self.config.concurrency,
            policy = ?self.config.policy,
            "starting run"
        );

        let mut pending = stream::iter(scenarios.iter().enumerate())
            .map(|(index, scenario)| async move {
                let result = self
                    .run_scenario(index, total, reference, scenario, output_base)
                    .await;
                (scenario, result)
            })
            .buffered(self.config.concurrency.max(1));

        let mut report = RunReport::default();
        while let Some((scenario, result)) = pending.next().await {
            let status = match result {
                Ok((path, image)) => {
                    self.emit(&RunEvent::Saved {
                        label: &scenario.label,
                        path: &path,
                        size_bytes: image.size(),
                    });
                    ScenarioStatus::Saved {
                        path,
                        size_bytes: image.size(),
                        mime_type: image.mime_type,
                    }
                }
                Err(e) => {
                    let reason = e.to_string();
                    tracing::warn!(label = %scenario.label, "scenario failed: {reason}");
                    self.emit(&RunEvent::Failed {
                        label: &scenario.label,
                        reason: &reason,
                    });
                    if self.config.policy == FailurePolicy::FailFast {
                        return Err(TryOnError::ScenarioFailed {
                            label: scenario.label.clone(),
                            source: Box::new(e),
                        });
                    }
                    ScenarioStatus::Failed { reason }
                }
            };
            report.outcomes.push(ScenarioOutcome {
                label: scenario.label.clone(),
                status,
            });
        }

        tracing::debug!(
            succeeded = report.succeeded().count(),
            failed = report.failed().count(),
            duration_ms = start.elapsed().as_millis() as u64,
            "run complete"
        );

        Ok(report)
    }

    async fn run_scenario(
        &self,
        index: usize,
        total: usize,
        reference: &ReferenceImage,
        scenario: &Scenario,
        output_base: &Path,
    ) -> Result<(PathBuf, GeneratedImage)> {
        self.emit(&RunEvent::Started {
            label: &scenario.label,
            index,
            total,
        });

        let request = GenerationRequest::new(reference.clone(), scenario.prompt.clone());
        let fragments = self.generator.generate(&request).await?;
        let image = self.first_image(&scenario.label, fragments).await?;

        let path = scenario.output_path(output_base, image.format);
        image.save(&path)?;
        tracing::debug!(
            label = %scenario.label,
            path = %path.display(),
            bytes = image.size(),
            "saved image"
        );

        Ok((path, image))
    }

    /// Reads fragments until the first image. The stream is dropped on
    /// return, which releases the underlying response.
    async fn first_image(
        &self,
        label: &str,
        mut fragments: FragmentStream,
    ) -> Result<GeneratedImage> {
        while let Some(fragment) = fragments.next().await {
            match fragment? {
                Fragment::Image { data, mime_type } if !data.is_empty() => {
                    return Ok(GeneratedImage::new(data, mime_type));
                }
                Fragment::Image { .. } => {}
                Fragment::Text(text) => self.emit(&RunEvent::Text { label, text: &text }),
                Fragment::Empty => {}
            }
        }

        Err(TryOnError::NoImage(format!(
            "response for scenario '{label}' did not include image data"
        )))
    }

    fn emit(&self, event: &RunEvent<'_>) {
        if let Some(ref observer) = self.observer {
            observer.on_event(event);
        }
    }
}
