//! Gemini (Google) image generation provider.
//!
//! Sends the reference portrait and the prompt as two content parts and asks
//! for both image and text modalities back. By default the response is read
//! incrementally from `streamGenerateContent` (server-sent events); with
//! streaming disabled a single `generateContent` response is used instead.
//! Either way the caller sees the same [`FragmentStream`].

use crate::credentials::ApiKey;
use crate::error::{parse_retry_after, sanitize_error_message, Result, TryOnError};
use crate::image::provider::{FragmentStream, ImageGenerator};
use crate::image::types::{Fragment, GenerationRequest};
use async_trait::async_trait;
use base64::Engine;
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Public Generative Language API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiModel {
    /// Nano Banana - Gemini 2.5 Flash Image.
    #[default]
    NanoBanana,
    /// Preview build of Gemini 2.5 Flash Image.
    NanoBananaPreview,
    /// Nano Banana Pro - Gemini 3 Pro Image.
    NanoBananaPro,
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NanoBanana => "gemini-2.5-flash-image",
            Self::NanoBananaPreview => "gemini-2.5-flash-image-preview",
            Self::NanoBananaPro => "gemini-3-pro-image-preview",
        }
    }
}

impl From<GeminiModel> for String {
    fn from(model: GeminiModel) -> Self {
        model.as_str().to_string()
    }
}

/// Strips the optional `models/` resource prefix from a model name.
fn normalize_model(model: &str) -> String {
    model.trim().trim_start_matches("models/").to_string()
}

/// Builder for GeminiProvider.
#[derive(Debug, Clone)]
pub struct GeminiProviderBuilder {
    api_key: Option<ApiKey>,
    model: String,
    base_url: String,
    streaming: bool,
    timeout: Option<Duration>,
}

impl Default for GeminiProviderBuilder {
    fn default() -> Self {
        Self {
            api_key: None,
            model: GeminiModel::default().into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            streaming: true,
            timeout: None,
        }
    }
}

impl GeminiProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key.
    pub fn api_key(mut self, key: impl Into<ApiKey>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the model, either a [`GeminiModel`] or any model identifier.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = normalize_model(&model.into());
        self
    }

    /// Overrides the API endpoint (used against local mock servers).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Chooses between the streaming and the single-response endpoint.
    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Sets a per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the provider.
    pub fn build(self) -> Result<GeminiProvider> {
        let api_key = self
            .api_key
            .ok_or_else(|| TryOnError::Config("no Gemini API key provided".into()))?;

        if self.model.is_empty() {
            return Err(TryOnError::Config("model name must not be empty".into()));
        }

        let mut client = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            client = client.timeout(timeout);
        }

        Ok(GeminiProvider {
            client: client.build()?,
            api_key,
            model: self.model,
            base_url: self.base_url,
            streaming: self.streaming,
            timeout: self.timeout,
        })
    }
}

/// Gemini image generation provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
    streaming: bool,
    timeout: Option<Duration>,
}

impl GeminiProvider {
    /// Creates a new `GeminiProviderBuilder`.
    pub fn builder() -> GeminiProviderBuilder {
        GeminiProviderBuilder::new()
    }

    /// The model identifier requests are sent to.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        if self.streaming {
            format!(
                "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
                self.base_url, self.model
            )
        } else {
            format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            )
        }
    }

    async fn generate_impl(&self, request: &GenerationRequest) -> Result<FragmentStream> {
        let body = GeminiRequest::from_generation_request(request);

        tracing::debug!(
            model = %self.model,
            streaming = self.streaming,
            reference_bytes = request.reference.size(),
            "sending Gemini generation request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text, &headers));
        }

        let timeout = self.timeout;
        if self.streaming {
            let bytes = response
                .bytes_stream()
                .map(move |chunk| chunk.map_err(|e| transport_error(e, timeout)));
            let fragments = sse_payloads(bytes).flat_map(|payload| {
                let items = match payload {
                    Ok(payload) => match decode_response(payload.as_bytes()) {
                        Ok(chunk) => chunk.into_fragments(),
                        Err(e) => vec![Err(e)],
                    },
                    Err(e) => vec![Err(e)],
                };
                stream::iter(items)
            });
            Ok(fragments.boxed())
        } else {
            let body = response
                .bytes()
                .await
                .map_err(|e| transport_error(e, timeout))?;
            Ok(stream::iter(decode_response(&body)?.into_fragments()).boxed())
        }
    }

    fn parse_error(
        &self,
        status: u16,
        text: &str,
        headers: &reqwest::header::HeaderMap,
    ) -> TryOnError {
        let text = sanitize_error_message(text);
        if status == 404 {
            return TryOnError::InvalidRequest(format!(
                "model '{}' not found. Verify the model name is correct.",
                self.model
            ));
        }
        if status == 429 {
            let retry_after = parse_retry_after(headers).map(Duration::from_secs);
            return TryOnError::RateLimited { retry_after };
        }
        if status == 401 || status == 403 {
            return TryOnError::Auth(text);
        }
        let lower = text.to_lowercase();
        if lower.contains("safety") || lower.contains("blocked") || lower.contains("prohibited") {
            return TryOnError::ContentBlocked(text);
        }
        if status == 400 {
            return TryOnError::InvalidRequest(text);
        }
        TryOnError::Api {
            status,
            message: text,
        }
    }

    /// Checks that the model exists and the key is accepted.
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/v1beta/models/{}", self.base_url, self.model);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", self.api_key.expose())
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        match response.status().as_u16() {
            401 | 403 => Err(TryOnError::Auth("Invalid API key".into())),
            404 => Err(TryOnError::InvalidRequest(format!(
                "model '{}' not found. Verify the model name is correct.",
                self.model
            ))),
            s if !(200..300).contains(&s) => Err(TryOnError::Api {
                status: s,
                message: "Health check failed".into(),
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ImageGenerator for GeminiProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<FragmentStream> {
        self.generate_impl(request).await
    }

    fn name(&self) -> &str {
        "Gemini (Google)"
    }
}

/// Maps a transport failure, reporting client timeouts as [`TryOnError::Timeout`].
fn transport_error(e: reqwest::Error, timeout: Option<Duration>) -> TryOnError {
    if e.is_timeout() {
        TryOnError::Timeout(timeout.unwrap_or_default())
    } else {
        TryOnError::Network(e)
    }
}

/// Parses one response body (or one streamed event payload).
fn decode_response(payload: &[u8]) -> Result<GeminiResponse> {
    serde_json::from_slice(payload).map_err(|e| {
        let preview = sanitize_error_message(&String::from_utf8_lossy(payload));
        TryOnError::UnexpectedResponse(format!("{e}: {preview}"))
    })
}

/// Incremental decoder for a `text/event-stream` body.
///
/// Yields the joined `data:` payload of every complete event. Other fields
/// and comment lines are ignored.
#[derive(Debug, Default)]
struct SseDecoder {
    buf: Vec<u8>,
    data: String,
}

impl SseDecoder {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            self.feed_line(line.trim_end_matches(['\n', '\r']), &mut events);
        }
        events
    }

    fn finish(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        if !self.buf.is_empty() {
            let rest = std::mem::take(&mut self.buf);
            let line = String::from_utf8_lossy(&rest);
            self.feed_line(line.trim_end_matches(['\n', '\r']), &mut events);
        }
        self.feed_line("", &mut events);
        events
    }

    fn feed_line(&mut self, line: &str, events: &mut Vec<String>) {
        if line.is_empty() {
            if !self.data.is_empty() {
                events.push(std::mem::take(&mut self.data));
            }
            return;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
}

/// Turns a byte stream into a stream of SSE event payloads.
fn sse_payloads<S, B, E>(bytes: S) -> impl Stream<Item = Result<String>> + Send + 'static
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<TryOnError> + Send + 'static,
{
    let state = (Box::pin(bytes), SseDecoder::default(), VecDeque::new(), false);
    stream::unfold(
        state,
        |(mut bytes, mut decoder, mut pending, mut done)| async move {
            loop {
                if let Some(payload) = pending.pop_front() {
                    return Some((Ok(payload), (bytes, decoder, pending, done)));
                }
                if done {
                    return None;
                }
                match bytes.next().await {
                    Some(Ok(chunk)) => pending.extend(decoder.push(chunk.as_ref())),
                    Some(Err(e)) => {
                        done = true;
                        return Some((Err(e.into()), (bytes, decoder, pending, done)));
                    }
                    None => {
                        done = true;
                        pending.extend(decoder.finish());
                    }
                }
            }
        },
    )
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<&'static str>,
}

impl GeminiRequest {
    fn from_generation_request(req: &GenerationRequest) -> Self {
        let parts = vec![
            GeminiRequestPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: req.reference.mime_type().to_string(),
                    data: base64::engine::general_purpose::STANDARD.encode(req.reference.data()),
                },
            },
            GeminiRequestPart::Text {
                text: req.prompt.clone(),
            },
        ];

        Self {
            contents: vec![GeminiContent {
                role: "user",
                parts,
            }],
            generation_config: GeminiConfig {
                response_modalities: vec!["IMAGE", "TEXT"],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    error: Option<GeminiApiError>,
}

/// Error object the service may send in place of a response, including
/// inside an already-open event stream.
#[derive(Debug, Deserialize)]
struct GeminiApiError {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl GeminiApiError {
    fn into_error(self) -> TryOnError {
        let message = sanitize_error_message(
            self.message
                .as_deref()
                .or(self.status.as_deref())
                .unwrap_or("error reported by the service"),
        );
        match self.code {
            Some(429) => TryOnError::RateLimited { retry_after: None },
            Some(401) | Some(403) => TryOnError::Auth(message),
            code => TryOnError::Api {
                status: code.unwrap_or(500),
                message,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    inline_data: Option<InlineData>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

impl GeminiPartResponse {
    fn into_fragment(self) -> Result<Fragment> {
        let image = match self.inline_data {
            Some(inline) if !inline.data.is_empty() => {
                let data = base64::engine::general_purpose::STANDARD
                    .decode(inline.data.as_bytes())
                    .map_err(|e| TryOnError::Decode(e.to_string()))?;
                let mime_type = inline.mime_type.unwrap_or_else(|| "image/png".to_string());
                Some((data, mime_type))
            }
            _ => None,
        };
        Ok(Fragment::classify(image, self.text))
    }
}

impl GeminiResponse {
    /// Classifies every part of the first candidate. Blocks and failed
    /// finish reasons are appended as errors after the parts.
    fn into_fragments(self) -> Vec<Result<Fragment>> {
        if let Some(error) = self.error {
            return vec![Err(error.into_error())];
        }

        if let Some(ref feedback) = self.prompt_feedback {
            if let Some(ref reason) = feedback.block_reason {
                let msg = feedback
                    .block_reason_message
                    .clone()
                    .unwrap_or_else(|| format!("Prompt blocked: {}", reason));
                return vec![Err(TryOnError::ContentBlocked(msg))];
            }
        }

        let Some(candidate) = self.candidates.into_iter().next() else {
            return vec![Ok(Fragment::Empty)];
        };

        let mut fragments: Vec<Result<Fragment>> = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .map(GeminiPartResponse::into_fragment)
            .collect();

        if let Some(ref finish_reason) = candidate.finish_reason {
            match finish_reason.as_str() {
                "SAFETY"
                | "IMAGE_SAFETY"
                | "IMAGE_PROHIBITED_CONTENT"
                | "IMAGE_RECITATION"
                | "RECITATION"
                | "PROHIBITED_CONTENT"
                | "BLOCKLIST" => {
                    fragments.push(Err(TryOnError::ContentBlocked(format!(
                        "Content blocked by Gemini safety filter: {}",
                        finish_reason
                    ))));
                }
                "IMAGE_OTHER" | "NO_IMAGE" => {
                    fragments.push(Err(TryOnError::NoImage(format!(
                        "generation finished with {}. Try a different prompt.",
                        finish_reason
                    ))));
                }
                _ => {} // STOP, MAX_TOKENS, etc. are normal
            }
        }

        fragments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::types::ReferenceImage;

    fn request() -> GenerationRequest {
        let png = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        GenerationRequest::new(ReferenceImage::from_bytes(png).unwrap(), "In a park")
    }

    #[test]
    fn test_gemini_model_as_str() {
        assert_eq!(GeminiModel::NanoBanana.as_str(), "gemini-2.5-flash-image");
        assert_eq!(
            GeminiModel::NanoBananaPro.as_str(),
            "gemini-3-pro-image-preview"
        );
        assert_eq!(GeminiModel::default(), GeminiModel::NanoBanana);
    }

    #[test]
    fn test_builder_requires_key() {
        let err = GeminiProviderBuilder::new().build().err().unwrap();
        assert!(matches!(err, TryOnError::Config(_)));
    }

    #[test]
    fn test_builder_normalizes_model_and_endpoint() {
        let provider = GeminiProvider::builder()
            .api_key("test-key")
            .model("models/gemini-2.0-nano-banana")
            .base_url("http://localhost:9999/")
            .build()
            .unwrap();
        assert_eq!(provider.model(), "gemini-2.0-nano-banana");
        assert_eq!(
            provider.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-2.0-nano-banana:streamGenerateContent?alt=sse"
        );

        let single = GeminiProvider::builder()
            .api_key("test-key")
            .streaming(false)
            .build()
            .unwrap();
        assert!(single.endpoint().ends_with("gemini-2.5-flash-image:generateContent"));
    }

    #[test]
    fn test_request_has_image_then_prompt() {
        let gemini_req = GeminiRequest::from_generation_request(&request());
        let json = serde_json::to_value(&gemini_req).unwrap();

        let parts = &json["contents"][0]["parts"];
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert!(parts[0]["inlineData"]["data"].as_str().unwrap().starts_with("iVBORw0KGgo"));
        assert_eq!(parts[1]["text"], "In a park");
        assert_eq!(
            json["generationConfig"]["responseModalities"],
            serde_json::json!(["IMAGE", "TEXT"])
        );
    }

    #[test]
    fn test_response_into_fragments() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Here is your image"},
                        {"inlineData": {"mimeType": "image/jpeg", "data": "AQID"}},
                        {}
                    ]
                },
                "finishReason": "STOP"
            }]
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let fragments: Vec<Fragment> = resp
            .into_fragments()
            .into_iter()
            .map(|f| f.unwrap())
            .collect();

        assert_eq!(
            fragments,
            vec![
                Fragment::Text("Here is your image".into()),
                Fragment::Image {
                    data: vec![1, 2, 3],
                    mime_type: "image/jpeg".into()
                },
                Fragment::Empty,
            ]
        );
    }

    #[test]
    fn test_prompt_feedback_block_is_error() {
        let json = r#"{
            "candidates": [],
            "promptFeedback": {
                "blockReason": "SAFETY",
                "blockReasonMessage": "Prompt was blocked due to safety"
            }
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let fragments = resp.into_fragments();
        assert_eq!(fragments.len(), 1);
        assert!(matches!(
            &fragments[0],
            Err(TryOnError::ContentBlocked(msg)) if msg == "Prompt was blocked due to safety"
        ));
    }

    #[test]
    fn test_safety_finish_reason_is_error() {
        let json = r#"{"candidates": [{"finishReason": "IMAGE_SAFETY"}]}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let fragments = resp.into_fragments();
        assert!(matches!(
            fragments.as_slice(),
            [Err(TryOnError::ContentBlocked(_))]
        ));
    }

    #[test]
    fn test_error_payload_is_error() {
        let payload = br#"{"error": {"code": 503, "message": "The model is overloaded"}}"#;
        let resp = decode_response(payload).unwrap();
        assert!(matches!(
            resp.into_fragments().as_slice(),
            [Err(TryOnError::Api { status: 503, message })] if message == "The model is overloaded"
        ));

        let payload = br#"{"error": {"code": 429, "status": "RESOURCE_EXHAUSTED"}}"#;
        let resp = decode_response(payload).unwrap();
        assert!(matches!(
            resp.into_fragments().as_slice(),
            [Err(TryOnError::RateLimited { retry_after: None })]
        ));
    }

    #[test]
    fn test_malformed_payload_is_unexpected_response() {
        assert!(matches!(
            decode_response(b"<html>bad gateway</html>"),
            Err(TryOnError::UnexpectedResponse(msg)) if msg.contains("bad gateway")
        ));
    }

    #[test]
    fn test_bad_base64_is_decode_error() {
        let json = r#"{"candidates": [{"content": {"parts": [
            {"inlineData": {"mimeType": "image/png", "data": "!!!"}}
        ]}}]}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            resp.into_fragments().as_slice(),
            [Err(TryOnError::Decode(_))]
        ));
    }

    #[test]
    fn test_sse_decoder_handles_split_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"a\"").is_empty());
        assert!(decoder.push(b":1}\r\n").is_empty());
        assert_eq!(decoder.push(b"\r\ndata: {}\n\n"), vec!["{\"a\":1}", "{}"]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_sse_decoder_flushes_trailing_event() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b": keep-alive\n\ndata: {\"x\":2}").is_empty());
        assert_eq!(decoder.finish(), vec!["{\"x\":2}"]);
    }

    #[tokio::test]
    async fn test_sse_payloads_stream() {
        let chunks: Vec<std::result::Result<&'static [u8], TryOnError>> = vec![
            Ok(b"data: one\n\ndata: t"),
            Ok(b"wo\n\n"),
            Ok(b"data: three"),
        ];
        let payloads: Vec<String> = sse_payloads(stream::iter(chunks))
            .map(|p| p.unwrap())
            .collect()
            .await;
        assert_eq!(payloads, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_parse_error_mapping() {
        let provider = GeminiProvider::builder().api_key("k").build().unwrap();
        let headers = reqwest::header::HeaderMap::new();

        assert!(matches!(
            provider.parse_error(403, "forbidden", &headers),
            TryOnError::Auth(_)
        ));
        assert!(matches!(
            provider.parse_error(404, "", &headers),
            TryOnError::InvalidRequest(_)
        ));
        assert!(matches!(
            provider.parse_error(429, "", &headers),
            TryOnError::RateLimited { retry_after: None }
        ));
        assert!(matches!(
            provider.parse_error(400, "request blocked by safety system", &headers),
            TryOnError::ContentBlocked(_)
        ));
        assert!(matches!(
            provider.parse_error(500, "boom", &headers),
            TryOnError::Api { status: 500, .. }
        ));
    }
}
