//! User-facing error taxonomy and the failure classifier.
//!
//! Every failure that leaves the service layer is a [`ClassifiedError`].
//! The UI only ever looks at its category and message.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::error::Error as StdError;
use thiserror::Error;

/// Category of a failure, each with a fixed user-facing label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    AuthInvalid,
    QuotaOrRateLimited,
    ServiceUnavailable,
    ContentModerated,
    Unexpected,
    Unknown,
}

impl ErrorCategory {
    /// Label shown as the error panel title. Also the prefix of the
    /// displayed error, which is how a rendered error is recognized again.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AuthInvalid => "API Key Invalid",
            Self::QuotaOrRateLimited => "Quota or Rate Limit Exceeded",
            Self::ServiceUnavailable => "Service Unavailable",
            Self::ContentModerated => "Content Moderation",
            Self::Unexpected => "Unexpected Error",
            Self::Unknown => "Unknown Error",
        }
    }

    pub fn all() -> &'static [ErrorCategory] {
        &[
            Self::AuthInvalid,
            Self::QuotaOrRateLimited,
            Self::ServiceUnavailable,
            Self::ContentModerated,
            Self::Unexpected,
            Self::Unknown,
        ]
    }

    /// Match a leading `"<label>:"` (case-insensitive) and return the
    /// category with the trimmed remainder.
    fn strip_label(message: &str) -> Option<(Self, &str)> {
        Self::all().iter().find_map(|category| {
            let label = category.label();
            let head = message.get(..label.len())?;
            let rest = message.get(label.len()..)?;
            if head.eq_ignore_ascii_case(label) {
                rest.strip_prefix(':').map(|r| (*category, r.trim()))
            } else {
                None
            }
        })
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A failure after classification. Immutable once built.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{}: {}", .category.label(), .message)]
pub struct ClassifiedError {
    category: ErrorCategory,
    message: String,
}

impl ClassifiedError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Error panel title.
    pub fn title(&self) -> &'static str {
        self.category.label()
    }

    /// Error panel body.
    pub fn description(&self) -> &str {
        &self.message
    }

    /// The model answered but carried no usable text.
    pub fn malformed_response() -> Self {
        Self::new(
            ErrorCategory::Unexpected,
            "AI malformed response: the response from the AI was empty or malformed.",
        )
    }

    /// The suggestions response failed the JSON pre-check or did not parse.
    pub fn invalid_json() -> Self {
        Self::new(
            ErrorCategory::Unexpected,
            "AI malformed response: the AI did not return a valid JSON object (not valid JSON).",
        )
    }

    /// The suggestions response parsed but lacks the `suggestions` array.
    pub fn unexpected_format() -> Self {
        Self::new(
            ErrorCategory::Unexpected,
            "AI response was not in the expected format. Please check the AI's output.",
        )
    }

    /// Local image validation failed before any request was made.
    pub fn invalid_image(reason: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorCategory::Unexpected,
            format!("Invalid image data: {}", reason),
        )
    }

    /// Transient failures persisted through every retry.
    pub fn retries_exhausted() -> Self {
        Self::new(
            ErrorCategory::ServiceUnavailable,
            "The AI service failed to respond after multiple retries.",
        )
    }

    pub fn unknown() -> Self {
        Self::new(
            ErrorCategory::Unknown,
            "An unknown error occurred during the AI request.",
        )
    }
}

/// A failure before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFailure {
    /// Already classified; classification is a no-op.
    Classified(ClassifiedError),
    /// A structured error, reduced to its message.
    Message(String),
    /// Something that is not an error at all (e.g. a panic payload that is
    /// neither `&str` nor `String`).
    Opaque,
}

impl RawFailure {
    /// Build from any error, including its `source()` chain in the message.
    pub fn from_error<E: StdError + ?Sized>(err: &E) -> Self {
        Self::Message(error_chain(err))
    }

    /// Build from a `std::panic` / task-join payload.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        match payload.downcast::<String>() {
            Ok(message) => Self::Message(*message),
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => Self::Message((*message).to_string()),
                Err(_) => Self::Opaque,
            },
        }
    }

    /// Text inspected by the classifier, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Classified(err) => Some(err.message()),
            Self::Message(message) => Some(message),
            Self::Opaque => None,
        }
    }
}

impl From<ClassifiedError> for RawFailure {
    fn from(err: ClassifiedError) -> Self {
        Self::Classified(err)
    }
}

impl From<String> for RawFailure {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<&str> for RawFailure {
    fn from(message: &str) -> Self {
        Self::Message(message.to_string())
    }
}

/// Join an error and its sources as `outer: inner: ...`.
pub fn error_chain<E: StdError + ?Sized>(err: &E) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = inner.source();
    }
    message
}

const AUTH_MARKERS: &[&str] = &["api key not valid", "permission denied"];
const QUOTA_MARKERS: &[&str] = &["quota", "rate limit", "429"];
const UNAVAILABLE_MARKERS: &[&str] = &[
    "503",
    "unavailable",
    "overloaded",
    "service is currently unavailable",
];
const SAFETY_MARKERS: &[&str] = &["safety", "candidate was blocked due to safety"];

/// Map a raw failure to a user-facing category.
///
/// Rules are checked in a fixed order and the first match wins:
/// already classified, auth, quota/rate limit, unavailable, safety,
/// then `Unexpected` for any other message and `Unknown` for opaque values.
pub fn classify(failure: impl Into<RawFailure>) -> ClassifiedError {
    let message = match failure.into() {
        RawFailure::Classified(err) => return err,
        RawFailure::Opaque => return ClassifiedError::unknown(),
        RawFailure::Message(message) => message,
    };

    if let Some((category, rest)) = ErrorCategory::strip_label(&message) {
        return ClassifiedError::new(category, rest);
    }

    let lower = message.to_lowercase();
    let has_any = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

    if has_any(AUTH_MARKERS) {
        ClassifiedError::new(
            ErrorCategory::AuthInvalid,
            "Your API key is not valid. Please ensure it is correct and has the necessary permissions.",
        )
    } else if has_any(QUOTA_MARKERS) {
        ClassifiedError::new(
            ErrorCategory::QuotaOrRateLimited,
            "You have exceeded your API quota or sent too many requests. Please wait a moment and check your Google AI billing.",
        )
    } else if has_any(UNAVAILABLE_MARKERS) {
        ClassifiedError::new(
            ErrorCategory::ServiceUnavailable,
            "The AI service is temporarily down. Please try again later.",
        )
    } else if has_any(SAFETY_MARKERS) {
        ClassifiedError::new(
            ErrorCategory::ContentModerated,
            "The request or response was blocked due to safety settings.",
        )
    } else {
        ClassifiedError::new(
            ErrorCategory::Unexpected,
            format!("An unexpected error occurred: {}", message),
        )
    }
}
