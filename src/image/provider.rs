//! Image generator trait and utilities.

use crate::error::Result;
use crate::image::types::{Fragment, GenerationRequest};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::time::Duration;

/// A lazy, finite sequence of response fragments.
///
/// The stream owns whatever connection backs it; dropping it releases that
/// connection whether or not it was read to the end. It cannot be restarted.
pub type FragmentStream = BoxStream<'static, Result<Fragment>>;

/// Trait for services that turn a reference image plus prompt into images.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Starts a generation and returns the response fragments.
    ///
    /// Errors returned here mean the request could not be started at all;
    /// errors surfaced inside the stream happened while reading the response.
    async fn generate(&self, request: &GenerationRequest) -> Result<FragmentStream>;

    /// Returns the name of this generator for display.
    fn name(&self) -> &str;
}

#[async_trait]
impl<G: ImageGenerator + ?Sized> ImageGenerator for std::sync::Arc<G> {
    async fn generate(&self, request: &GenerationRequest) -> Result<FragmentStream> {
        (**self).generate(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<G: ImageGenerator + ?Sized> ImageGenerator for Box<G> {
    async fn generate(&self, request: &GenerationRequest) -> Result<FragmentStream> {
        (**self).generate(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Wraps a generator and retries starting a generation on transient failures.
///
/// Only the call that opens the response is retried. Once fragments start
/// flowing, errors inside the stream are passed through untouched.
#[derive(Debug, Clone)]
pub struct Retrying<G> {
    inner: G,
    max_retries: u32,
}

impl<G: ImageGenerator> Retrying<G> {
    /// Wraps `inner`, allowing up to `max_retries` extra attempts.
    pub fn new(inner: G, max_retries: u32) -> Self {
        Self { inner, max_retries }
    }

    /// Returns the wrapped generator.
    pub fn into_inner(self) -> G {
        self.inner
    }
}

#[async_trait]
impl<G: ImageGenerator> ImageGenerator for Retrying<G> {
    async fn generate(&self, request: &GenerationRequest) -> Result<FragmentStream> {
        let mut attempt = 0;
        loop {
            match self.inner.generate(request).await {
                Ok(stream) => return Ok(stream),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = e.retry_after().unwrap_or(Duration::from_secs(1));
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after transient error: {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
