//! Retrying request executor.
//!
//! Transient failures (the service answering 503 / unavailable /
//! overloaded) are retried with exponential backoff plus jitter. Anything
//! else is classified and returned on the first attempt.

use apex_core::{classify, ClassifiedError, RawFailure};
use rand::Rng;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::client::{GenerateRequest, GenerativeModel};

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 1000;

/// Default upper bound of the random jitter added to each delay.
pub const DEFAULT_MAX_JITTER_MS: u64 = 1000;

const TRANSIENT_MARKERS: &[&str] = &["503", "unavailable", "overloaded"];

/// Whether a failure message marks a transient, retryable condition.
pub fn is_transient(message: &str) -> bool {
    let lower = message.to_lowercase();
    TRANSIENT_MARKERS.iter().any(|m| lower.contains(m))
}

/// Backoff settings for one executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
            max_jitter: Duration::from_millis(DEFAULT_MAX_JITTER_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
            ..Self::default()
        }
    }

    pub fn with_max_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    /// Total attempts including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Deterministic part of the delay: `initial_backoff * 2^attempt`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Delay before retrying after failed `attempt` (0-based), with jitter.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        let jitter_ms = self.max_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return base;
        }
        let jitter = rand::thread_rng().gen_range(0..=jitter_ms);
        base.saturating_add(Duration::from_millis(jitter))
    }
}

/// Issues one generation request through a [`GenerativeModel`], retrying
/// transient failures. Calls are independent; nothing is shared between
/// them.
pub struct RetryingExecutor<M> {
    model: M,
    policy: RetryPolicy,
}

impl<M: GenerativeModel> RetryingExecutor<M> {
    pub fn new(model: M, policy: RetryPolicy) -> Self {
        Self { model, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Run the request and return the response text.
    ///
    /// A response without usable text is a malformed-response failure and
    /// is not retried. A transient failure on the last attempt surfaces as
    /// `ServiceUnavailable` "failed after multiple retries".
    pub async fn execute(&self, request: &GenerateRequest) -> Result<String, ClassifiedError> {
        let mut attempt: u32 = 0;

        loop {
            match self.model.generate(request).await {
                Ok(response) => {
                    debug!(attempt = attempt + 1, "Generation succeeded");
                    return response.into_text().ok_or_else(|| {
                        warn!(attempt = attempt + 1, "Malformed AI response: no usable text");
                        ClassifiedError::malformed_response()
                    });
                }
                Err(err) => {
                    let raw = RawFailure::from_error(&err);
                    let transient = raw.message().is_some_and(is_transient);

                    if !transient {
                        let classified = classify(raw);
                        error!(
                            attempt = attempt + 1,
                            error = %err,
                            category = %classified.category(),
                            "Generation failed"
                        );
                        return Err(classified);
                    }

                    if attempt >= self.policy.max_retries {
                        error!(
                            attempts = attempt + 1,
                            error = %err,
                            "Service unavailable after all retries"
                        );
                        return Err(ClassifiedError::retries_exhausted());
                    }

                    let delay = self.policy.backoff_delay(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Service unavailable, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
