//! Error types for try-on generation runs.

use std::time::Duration;

/// Errors that can occur while preparing or executing a run.
#[derive(Debug, thiserror::Error)]
pub enum TryOnError {
    /// Missing or unusable configuration (credentials, output location).
    #[error("configuration error: {0}")]
    Config(String),

    /// The reference portrait could not be loaded.
    #[error("reference image error: {0}")]
    ReferenceImage(String),

    /// The scenario list is empty, has a blank label, or repeats a label.
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    /// API key rejected by the service.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status (or the error code carried in the body).
        status: u16,
        /// Sanitized error message.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Delay suggested by the service, if any.
        retry_after: Option<Duration>,
    },

    /// The request did not complete in time.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters (unknown model, bad payload).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The response finished without any inline image data.
    #[error("no image data returned: {0}")]
    NoImage(String),

    /// The service answered with something we could not interpret.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., saving file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A scenario failed while the run was in fail-fast mode.
    #[error("scenario '{label}' failed: {source}")]
    ScenarioFailed {
        /// Label of the failed scenario.
        label: String,
        /// Why it failed.
        #[source]
        source: Box<TryOnError>,
    },
}

impl TryOnError {
    /// Returns true if this error is likely transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Network(_)
        )
    }

    /// Returns the suggested retry delay, if available.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            Self::Timeout(_) => Some(Duration::from_secs(1)),
            Self::Network(_) => Some(Duration::from_secs(2)),
            _ => None,
        }
    }

    /// Returns true for errors that abort a run before any scenario starts.
    pub fn is_fatal_setup(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::ReferenceImage(_) | Self::InvalidScenario(_)
        )
    }
}

/// Result type alias for try-on operations.
pub type Result<T> = std::result::Result<T, TryOnError>;

/// Maximum length of an error body carried into an error message.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Trims an error body and strips anything that looks like an API key.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let cleaned: String = text
        .split_whitespace()
        .map(|word| {
            if word.starts_with("AIza") || word.contains("key=") {
                "[redacted]"
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    if cleaned.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let truncated: String = cleaned.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        format!("{truncated}...")
    } else {
        cleaned
    }
}

/// Reads a `Retry-After` header given in whole seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(TryOnError::RateLimited { retry_after: None }.is_retryable());
        assert!(TryOnError::Timeout(Duration::from_secs(30)).is_retryable());

        assert!(!TryOnError::Auth("bad key".into()).is_retryable());
        assert!(!TryOnError::ContentBlocked("nsfw".into()).is_retryable());
        assert!(!TryOnError::NoImage("text only".into()).is_retryable());
        assert!(!TryOnError::Decode("bad base64".into()).is_retryable());
        assert!(!TryOnError::UnexpectedResponse("<html>".into()).is_retryable());
    }

    #[test]
    fn test_retry_after() {
        let rate_limited = TryOnError::RateLimited {
            retry_after: Some(Duration::from_secs(60)),
        };
        assert_eq!(rate_limited.retry_after(), Some(Duration::from_secs(60)));

        let rate_limited_no_hint = TryOnError::RateLimited { retry_after: None };
        assert_eq!(rate_limited_no_hint.retry_after(), None);

        let timeout = TryOnError::Timeout(Duration::from_secs(30));
        assert_eq!(timeout.retry_after(), Some(Duration::from_secs(1)));

        assert_eq!(TryOnError::Auth("bad".into()).retry_after(), None);
    }

    #[test]
    fn test_fatal_setup_errors() {
        assert!(TryOnError::Config("no key".into()).is_fatal_setup());
        assert!(TryOnError::ReferenceImage("missing".into()).is_fatal_setup());
        assert!(!TryOnError::NoImage("park".into()).is_fatal_setup());
    }

    #[test]
    fn test_error_display() {
        let err = TryOnError::Api {
            status: 404,
            message: "Not found".into(),
        };
        assert_eq!(err.to_string(), "API error: 404 - Not found");

        let err = TryOnError::ScenarioFailed {
            label: "park".into(),
            source: Box::new(TryOnError::NoImage("only text".into())),
        };
        assert_eq!(
            err.to_string(),
            "scenario 'park' failed: no image data returned: only text"
        );
    }

    #[test]
    fn test_sanitize_redacts_keys() {
        let msg = sanitize_error_message("invalid key AIzaSyABC123 for url ?key=secret");
        assert!(!msg.contains("AIzaSyABC123"));
        assert!(!msg.contains("secret"));
        assert!(msg.contains("[redacted]"));
    }

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let long = "x".repeat(2000);
        let msg = sanitize_error_message(&long);
        assert!(msg.ends_with("..."));
        assert_eq!(msg.chars().count(), MAX_ERROR_MESSAGE_LEN + 3);
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert(reqwest::header::RETRY_AFTER, "30".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(30));
    }
}
