//! APEX Gemini integration
//!
//! REST client for `generateContent`, the retrying executor and the
//! analysis service that builds requests for each mode.

pub mod client;
pub mod config;
pub mod prompts;
pub mod retry;
pub mod service;

pub use client::{GeminiClient, GenerateRequest, GenerateResponse, GenerativeModel, ModelError};
pub use config::{ConfigError, GeminiConfig};
pub use retry::{is_transient, RetryPolicy, RetryingExecutor};
pub use service::{build_request, AnalysisService};
