//! Analysis domain models.
//!
//! Everything here is request-scoped: built when a screenshot is submitted,
//! dropped once the result (or error) has been shown.

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::error::ClassifiedError;
use crate::render::{self, Block};

/// Image types accepted for analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMime {
    Png,
    Jpeg,
    Gif,
}

impl ImageMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
        }
    }

    /// Parse a MIME type string. Parameters (`; charset=...`) are ignored.
    pub fn from_mime(s: &str) -> Option<Self> {
        let essence = s.split(';').next().unwrap_or(s).trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Detect the type from the file's magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else {
            None
        }
    }

    /// Guess the type from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImageMime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an image was rejected before any request was sent.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("image is empty")]
    Empty,

    #[error("unsupported image type '{0}' (expected PNG, JPEG or GIF)")]
    UnsupportedMime(String),

    #[error("malformed data URL: {0}")]
    InvalidDataUrl(String),

    #[error("base64 payload could not be decoded: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl From<ImageError> for ClassifiedError {
    fn from(err: ImageError) -> Self {
        ClassifiedError::invalid_image(err)
    }
}

/// Validated screenshot bytes. Non-empty and of an accepted type.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    bytes: Vec<u8>,
    mime: ImageMime,
}

impl ImageData {
    pub fn new(bytes: Vec<u8>, mime_type: &str) -> Result<Self, ImageError> {
        let mime = ImageMime::from_mime(mime_type)
            .ok_or_else(|| ImageError::UnsupportedMime(mime_type.to_string()))?;
        Self::with_mime(bytes, mime)
    }

    pub fn with_mime(bytes: Vec<u8>, mime: ImageMime) -> Result<Self, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        Ok(Self { bytes, mime })
    }

    /// Decode a `data:<mime>;base64,<payload>` URL, the form a browser
    /// file reader hands over.
    pub fn from_data_url(url: &str) -> Result<Self, ImageError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| ImageError::InvalidDataUrl("missing 'data:' scheme".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| ImageError::InvalidDataUrl("missing ',' separator".to_string()))?;
        if payload.trim().is_empty() {
            return Err(ImageError::InvalidDataUrl("no payload after ','".to_string()));
        }

        let mime_type = header.strip_suffix(";base64").ok_or_else(|| {
            ImageError::InvalidDataUrl("only base64-encoded data URLs are supported".to_string())
        })?;
        let bytes = base64::engine::general_purpose::STANDARD.decode(payload.trim())?;
        Self::new(bytes, mime_type)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> ImageMime {
        self.mime
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

impl std::fmt::Debug for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageData")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Which response shape a submission asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Short reply suggestions, returned as strict JSON.
    Suggestions,
    /// Long-form growth report, returned as Markdown.
    Report,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Suggestions => "suggestions",
            Self::Report => "report",
        }
    }
}

impl std::fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One submitted screenshot.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image: ImageData,
    pub mode: AnalysisMode,
}

/// A single reply suggestion. `text` is meant to fit in 280 characters;
/// the model is told so, nothing here enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplySuggestion {
    pub style: String,
    pub text: String,
}

impl ReplySuggestion {
    pub fn reply_style(&self) -> ReplyStyle {
        ReplyStyle::from_tag(&self.style)
    }
}

/// Known suggestion tones. Anything else gets the default treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyStyle {
    Insightful,
    Humorous,
    Question,
    Supportive,
    Professional,
    Sarcastic,
    Other,
}

impl ReplyStyle {
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "insightful" => Self::Insightful,
            "humorous" => Self::Humorous,
            "question" => Self::Question,
            "supportive" => Self::Supportive,
            "professional" => Self::Professional,
            "sarcastic" => Self::Sarcastic,
            _ => Self::Other,
        }
    }
}

/// Ordered reply suggestions from one response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionSet {
    pub suggestions: Vec<ReplySuggestion>,
}

impl SuggestionSet {
    /// Validate and parse the model's suggestions response.
    ///
    /// The trimmed text must look like a JSON object before parsing is
    /// attempted. A parsed object without a `suggestions` array (or with
    /// items lacking string `style`/`text`) is a format error, distinct
    /// from a parse error.
    pub fn parse(text: &str) -> Result<Self, ClassifiedError> {
        let trimmed = text.trim();
        if !trimmed.starts_with('{') || !trimmed.ends_with('}') {
            tracing::debug!(len = text.len(), "Suggestions response failed JSON pre-check");
            return Err(ClassifiedError::invalid_json());
        }

        let value: serde_json::Value = serde_json::from_str(trimmed).map_err(|e| {
            tracing::debug!(error = %e, "Suggestions response is not valid JSON");
            ClassifiedError::invalid_json()
        })?;

        let items = value
            .get("suggestions")
            .filter(|v| v.is_array())
            .cloned()
            .ok_or_else(ClassifiedError::unexpected_format)?;

        let suggestions: Vec<ReplySuggestion> =
            serde_json::from_value(items).map_err(|_| ClassifiedError::unexpected_format())?;

        Ok(Self { suggestions })
    }

    pub fn len(&self) -> usize {
        self.suggestions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty()
    }
}

/// Markdown report text, kept as-is and rendered on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report(String);

impl Report {
    pub fn new(markdown: impl Into<String>) -> Self {
        Self(markdown.into())
    }

    pub fn markdown(&self) -> &str {
        &self.0
    }

    pub fn render(&self) -> Vec<Block> {
        render::render(&self.0)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Analysis {
    Suggestions(SuggestionSet),
    Report { markdown: Report },
}

impl Analysis {
    pub fn mode(&self) -> AnalysisMode {
        match self {
            Self::Suggestions(_) => AnalysisMode::Suggestions,
            Self::Report { .. } => AnalysisMode::Report,
        }
    }
}
