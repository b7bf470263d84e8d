//! Screenshot analysis domain.
//!
//! Requests (image + mode) and the two result shapes: reply suggestions
//! parsed from JSON, and Markdown reports.

pub mod model;

pub use model::{
    Analysis, AnalysisMode, AnalysisRequest, ImageData, ImageError, ImageMime, ReplyStyle,
    ReplySuggestion, Report, SuggestionSet,
};
