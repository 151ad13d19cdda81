//! Core types for try-on image generation.

use crate::error::{Result, TryOnError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Maps a MIME type such as `image/jpeg` to a format.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// The portrait every scenario is generated from.
///
/// Loaded once and shared read-only across scenarios; cloning only bumps a
/// reference count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    data: Arc<[u8]>,
    mime_type: String,
}

impl ReferenceImage {
    /// Wraps raw bytes with an explicit MIME type.
    pub fn new(data: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Result<Self> {
        let data = data.into();
        if data.is_empty() {
            return Err(TryOnError::ReferenceImage("reference image is empty".into()));
        }
        Ok(Self {
            data: data.into(),
            mime_type: mime_type.into(),
        })
    }

    /// Wraps raw bytes, guessing the MIME type from magic bytes.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Result<Self> {
        let data = data.into();
        let mime_type = ImageFormat::from_magic_bytes(&data)
            .unwrap_or_default()
            .mime_type();
        Self::new(data, mime_type)
    }

    /// Reads the portrait from disk.
    ///
    /// The MIME type is taken from the file extension, then from the magic
    /// bytes, and falls back to `image/png`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(TryOnError::ReferenceImage(format!(
                "reference image not found: {}",
                path.display()
            )));
        }

        let data = std::fs::read(path).map_err(|e| {
            TryOnError::ReferenceImage(format!("failed to read {}: {e}", path.display()))
        })?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ImageFormat::from_extension)
            .or_else(|| ImageFormat::from_magic_bytes(&data))
            .unwrap_or_default();

        Self::new(data, format.mime_type()).map_err(|_| {
            TryOnError::ReferenceImage(format!("reference image is empty: {}", path.display()))
        })
    }

    /// Raw image bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// MIME type sent alongside the bytes.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Size of the image in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// A single generation call: one reference image plus one prompt.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Portrait forwarded as the first content part.
    pub reference: ReferenceImage,
    /// Prompt text forwarded verbatim.
    pub prompt: String,
}

impl GenerationRequest {
    /// Creates a new request.
    pub fn new(reference: ReferenceImage, prompt: impl Into<String>) -> Self {
        Self {
            reference,
            prompt: prompt.into(),
        }
    }
}

/// One piece of a generation response, classified when it is received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Inline binary image data.
    Image {
        /// Decoded image bytes. Empty payloads are skipped by the runner.
        data: Vec<u8>,
        /// MIME type reported by the service.
        mime_type: String,
    },
    /// Informational text from the model.
    Text(String),
    /// A part carrying neither image data nor text.
    Empty,
}

impl Fragment {
    /// Classifies a response part. Image data wins over text; empty payloads
    /// count as absent.
    pub fn classify(image: Option<(Vec<u8>, String)>, text: Option<String>) -> Self {
        match (image, text) {
            (Some((data, mime_type)), _) if !data.is_empty() => Self::Image { data, mime_type },
            (_, Some(text)) if !text.trim().is_empty() => Self::Text(text),
            _ => Self::Empty,
        }
    }

    /// Shorthand for an image fragment.
    pub fn image(data: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self::classify(Some((data.into(), mime_type.into())), None)
    }

    /// Shorthand for a text fragment.
    pub fn text(text: impl Into<String>) -> Self {
        Self::classify(None, Some(text.into()))
    }
}

/// The image kept for a scenario.
#[derive(Debug, Clone)]
#[must_use = "generated image should be saved or processed"]
pub struct GeneratedImage {
    /// Raw image bytes.
    pub data: Vec<u8>,
    /// MIME type as reported by the service.
    pub mime_type: String,
    /// Format derived from the MIME type (PNG when unknown).
    pub format: ImageFormat,
}

impl GeneratedImage {
    /// Creates a generated image, deriving the format from the MIME type.
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        let format = ImageFormat::from_mime_type(&mime_type).unwrap_or_default();
        Self {
            data,
            mime_type,
            format,
        }
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Saves the image to the specified path, creating parent directories
    /// and overwriting any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.data)?;
        Ok(())
    }
}
