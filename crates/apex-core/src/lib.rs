//! APEX Core Library
//!
//! Domain models, the Markdown subset renderer and the error classifier
//! shared by the Gemini service layer and the CLI.

pub mod analysis;
pub mod error;
pub mod render;

pub use analysis::model::{
    Analysis, AnalysisMode, AnalysisRequest, ImageData, ImageError, ImageMime, ReplyStyle,
    ReplySuggestion, Report, SuggestionSet,
};
pub use error::{classify, ClassifiedError, ErrorCategory, RawFailure};
pub use render::{render, Block};
