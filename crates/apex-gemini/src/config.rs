//! Gemini connection settings.
//!
//! The API key comes from the process environment at startup. A missing
//! key is a startup failure, never a per-request one.

use std::time::Duration;
use thiserror::Error;

/// Default Gemini REST base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default multimodal model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default transport timeout for one attempt.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Environment variables holding the API key, in lookup order.
pub const API_KEY_VARS: &[&str] = &["API_KEY", "GEMINI_API_KEY"];

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("API_KEY environment variable not set.\nSet it with: export API_KEY=your-key")]
    MissingApiKey,

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Connection settings for [`crate::GeminiClient`].
#[derive(Clone)]
pub struct GeminiConfig {
    api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    /// Create a config with defaults. The key must be non-blank.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self {
            api_key: api_key.trim().to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Read `API_KEY` (or `GEMINI_API_KEY`), `APEX_MODEL` and
    /// `APEX_GEMINI_URL` from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = API_KEY_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let mut config = Self::new(api_key)?;
        if let Some(model) = lookup("APEX_MODEL").filter(|m| !m.trim().is_empty()) {
            config = config.with_model(model);
        }
        if let Some(url) = lookup("APEX_GEMINI_URL").filter(|u| !u.trim().is_empty()) {
            config = config.with_base_url(url);
        }
        Ok(config)
    }

    /// Use a different model. A leading `models/` is dropped.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.model = model
            .trim()
            .strip_prefix("models/")
            .unwrap_or(model.trim())
            .to_string();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// `generateContent` endpoint for the configured model.
    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_missing_key_is_an_error() {
        assert!(matches!(
            GeminiConfig::from_lookup(env(&[])),
            Err(ConfigError::MissingApiKey)
        ));
        assert!(matches!(
            GeminiConfig::from_lookup(env(&[("API_KEY", "   ")])),
            Err(ConfigError::MissingApiKey)
        ));
        assert!(matches!(GeminiConfig::new(""), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn test_key_fallback_var() {
        let config = GeminiConfig::from_lookup(env(&[("GEMINI_API_KEY", "k2")])).unwrap();
        assert_eq!(config.api_key(), "k2");

        let config =
            GeminiConfig::from_lookup(env(&[("API_KEY", "k1"), ("GEMINI_API_KEY", "k2")])).unwrap();
        assert_eq!(config.api_key(), "k1");
    }

    #[test]
    fn test_env_overrides() {
        let config = GeminiConfig::from_lookup(env(&[
            ("API_KEY", "k"),
            ("APEX_MODEL", "models/gemini-2.5-pro"),
            ("APEX_GEMINI_URL", "http://localhost:8080/v1beta/"),
        ]))
        .unwrap();
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(
            config.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-2.5-pro:generateContent"
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = GeminiConfig::new("secret-key").unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("<redacted>"));
    }
}
